//! `From`/`TryFrom` implementations bridging `vent_config` types to `vent_core` types.

use std::time::Duration;

use crate::button::ButtonPolarity;
use crate::config::{ControllerCfg, EditorCfg, ForegroundCfg, SpontaneousCfg};
use crate::error::Result;
use crate::parameters::{ParameterKind, ParameterSpec, ParameterTable, VentilationMode};
use crate::pressure::{PressureScale, TriggerSource};
use crate::waveform::{DriveWaveform, WaveformProfile};

// ── Parameters ───────────────────────────────────────────────────────────────

impl From<&vent_config::ParamBounds> for ParameterSpec {
    fn from(b: &vent_config::ParamBounds) -> Self {
        Self::new(b.min, b.max, b.default, b.step)
    }
}

impl From<&vent_config::ParametersCfg> for ParameterTable {
    fn from(c: &vent_config::ParametersCfg) -> Self {
        Self::default()
            .with(
                ParameterKind::InspiratoryPressure,
                (&c.inspiratory_pressure).into(),
            )
            .with(ParameterKind::RespiratoryRate, (&c.respiratory_rate).into())
            .with(ParameterKind::TidalVolume, (&c.tidal_volume).into())
            .with(ParameterKind::InspiratoryExpiratoryRatio, (&c.ie_ratio).into())
    }
}

impl From<&vent_config::SpontaneousCfg> for VentilationMode {
    fn from(c: &vent_config::SpontaneousCfg) -> Self {
        if c.enabled {
            Self::Spontaneous
        } else {
            Self::Ippv
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

impl From<vent_config::TriggerSource> for TriggerSource {
    fn from(s: vent_config::TriggerSource) -> Self {
        match s {
            vent_config::TriggerSource::Raw => Self::Raw,
            vent_config::TriggerSource::Smoothed => Self::Smoothed,
        }
    }
}

impl From<&vent_config::SpontaneousCfg> for SpontaneousCfg {
    fn from(c: &vent_config::SpontaneousCfg) -> Self {
        Self {
            threshold_cm_h2o: c.threshold_cm_h2o,
            source: c.trigger_source.into(),
            smoothing_window: c.smoothing_window,
        }
    }
}

impl From<&vent_config::PressureCfg> for PressureScale {
    fn from(c: &vent_config::PressureCfg) -> Self {
        Self {
            multiplier: c.multiplier,
            constant: c.constant,
        }
    }
}

impl From<&vent_config::Config> for ControllerCfg {
    fn from(c: &vent_config::Config) -> Self {
        Self {
            tick_period: Duration::from_micros(c.timing.tick_period_us),
            spontaneous: (&c.spontaneous).into(),
            pressure: (&c.pressure).into(),
        }
    }
}

// ── Waveform ─────────────────────────────────────────────────────────────────

impl From<vent_config::WaveformProfile> for WaveformProfile {
    fn from(p: vent_config::WaveformProfile) -> Self {
        match p {
            vent_config::WaveformProfile::Pwm => Self::Pwm,
            vent_config::WaveformProfile::Servo => Self::Servo,
        }
    }
}

impl TryFrom<&vent_config::ActuatorCfg> for DriveWaveform {
    type Error = eyre::Report;

    /// Custom CSV table when configured, else the built-in profile.
    fn try_from(c: &vent_config::ActuatorCfg) -> Result<Self> {
        let Some(path) = &c.waveform_csv else {
            return Ok(Self::builtin(c.profile.into()));
        };
        let samples = vent_config::load_waveform_csv(path)?;
        let full_scale = c
            .full_scale
            .unwrap_or_else(|| samples.iter().copied().map(u32::from).max().unwrap_or(0));
        tracing::info!(
            path = %path.display(),
            samples = samples.len(),
            full_scale,
            "loaded custom waveform"
        );
        Self::from_samples(&samples, full_scale)
    }
}

// ── Foreground ───────────────────────────────────────────────────────────────

impl From<&vent_config::EditorCfg> for EditorCfg {
    fn from(c: &vent_config::EditorCfg) -> Self {
        Self {
            entry_hold: Duration::from_millis(c.entry_hold_ms),
            edit_mode: c.edit_mode,
        }
    }
}

impl From<&vent_config::Config> for ForegroundCfg {
    fn from(c: &vent_config::Config) -> Self {
        Self {
            poll_interval: Duration::from_millis(c.editor.poll_interval_ms),
            display_refresh: c.editor.display_refresh,
            pressure: (&c.pressure).into(),
        }
    }
}

impl From<&vent_config::ButtonsCfg> for ButtonPolarity {
    fn from(c: &vent_config::ButtonsCfg) -> Self {
        if c.active_low {
            Self::ActiveLow
        } else {
            Self::ActiveHigh
        }
    }
}
