//! Runtime configuration for the controller, the editor and the foreground loop.
//!
//! Separate from the TOML schema in `vent_config`; see `conversions` for the
//! mapping.

use std::time::Duration;

use crate::pressure::{PressureScale, TriggerSource};
use crate::util::DEFAULT_TICK_PERIOD;

/// Patient-trigger detection during exhale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpontaneousCfg {
    /// Trigger when pressure is at or below this many cmH2O.
    pub threshold_cm_h2o: f32,
    pub source: TriggerSource,
    /// Samples in the running average used by `TriggerSource::Smoothed` and the display.
    pub smoothing_window: usize,
}

impl Default for SpontaneousCfg {
    fn default() -> Self {
        Self {
            threshold_cm_h2o: 5.0,
            source: TriggerSource::Raw,
            smoothing_window: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerCfg {
    pub tick_period: Duration,
    pub spontaneous: SpontaneousCfg,
    pub pressure: PressureScale,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_TICK_PERIOD,
            spontaneous: SpontaneousCfg::default(),
            pressure: PressureScale::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorCfg {
    /// How long Confirm must be held to open the editor.
    pub entry_hold: Duration,
    /// Offer IPPV/Spontaneous selection before the numeric parameters.
    pub edit_mode: bool,
}

impl Default for EditorCfg {
    fn default() -> Self {
        Self {
            entry_hold: Duration::from_millis(1000),
            edit_mode: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForegroundCfg {
    pub poll_interval: Duration,
    /// Refresh the idle pressure display every N iterations.
    pub display_refresh: u32,
    /// Converts the smoothed reading for display.
    pub pressure: PressureScale,
}

impl Default for ForegroundCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2),
            display_refresh: 250,
            pressure: PressureScale::default(),
        }
    }
}
