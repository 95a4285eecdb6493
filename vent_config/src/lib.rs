#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and drive-waveform CSV parsing for the ventilator.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a valid config.
//! - The waveform CSV loader enforces its header and reports bad rows by
//!   line number.
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Waveform CSV schema: a single `drive` column, one sample per row.
///
/// Example:
/// drive
/// 0
/// 120
/// 1023
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct WaveformRow {
    pub drive: u16,
}

/// BCM pin numbers. Only read by hardware builds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub rotary_clk: u8,
    pub rotary_dt: u8,
    pub select: u8,
    pub confirm: u8,
    pub cancel: u8,
    pub inhale_led: u8,
    pub exhale_led: u8,
    /// MCP3008 input channel of the pressure transducer (0..=7).
    pub pressure_adc_channel: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            rotary_clk: 17,
            rotary_dt: 27,
            select: 22,
            confirm: 5,
            cancel: 6,
            inhale_led: 20,
            exhale_led: 21,
            pressure_adc_channel: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    /// Controller tick period in microseconds.
    pub tick_period_us: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            tick_period_us: 10_000,
        }
    }
}

/// Bounds for one tunable parameter. Missing fields fall back to the
/// built-in value for that parameter.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ParamBounds {
    pub min: u32,
    pub max: u32,
    pub default: u32,
    pub step: u32,
}

#[derive(Debug, Deserialize, Default)]
struct PartialBounds {
    min: Option<u32>,
    max: Option<u32>,
    default: Option<u32>,
    step: Option<u32>,
}

impl PartialBounds {
    fn over(self, base: ParamBounds) -> ParamBounds {
        ParamBounds {
            min: self.min.unwrap_or(base.min),
            max: self.max.unwrap_or(base.max),
            default: self.default.unwrap_or(base.default),
            step: self.step.unwrap_or(base.step),
        }
    }
}

#[derive(Debug)]
pub struct ParametersCfg {
    pub inspiratory_pressure: ParamBounds,
    pub respiratory_rate: ParamBounds,
    pub tidal_volume: ParamBounds,
    /// I:E ratio scaled by 100.
    pub ie_ratio: ParamBounds,
}

impl Default for ParametersCfg {
    fn default() -> Self {
        Self {
            inspiratory_pressure: ParamBounds {
                min: 5,
                max: 20,
                default: 15,
                step: 1,
            },
            respiratory_rate: ParamBounds {
                min: 10,
                max: 30,
                default: 20,
                step: 1,
            },
            tidal_volume: ParamBounds {
                min: 200,
                max: 700,
                default: 250,
                step: 10,
            },
            ie_ratio: ParamBounds {
                min: 20,
                max: 300,
                default: 100,
                step: 20,
            },
        }
    }
}

impl<'de> Deserialize<'de> for ParametersCfg {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize, Default)]
        #[serde(default, deny_unknown_fields)]
        struct Raw {
            inspiratory_pressure: PartialBounds,
            respiratory_rate: PartialBounds,
            tidal_volume: PartialBounds,
            ie_ratio: PartialBounds,
        }
        let raw = Raw::deserialize(deserializer)?;
        let base = Self::default();
        Ok(Self {
            inspiratory_pressure: raw.inspiratory_pressure.over(base.inspiratory_pressure),
            respiratory_rate: raw.respiratory_rate.over(base.respiratory_rate),
            tidal_volume: raw.tidal_volume.over(base.tidal_volume),
            ie_ratio: raw.ie_ratio.over(base.ie_ratio),
        })
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    /// Instantaneous reading, fastest response.
    #[default]
    Raw,
    /// Running average, the same value the display shows.
    Smoothed,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpontaneousCfg {
    /// Start in spontaneous mode.
    pub enabled: bool,
    pub threshold_cm_h2o: f32,
    pub trigger_source: TriggerSource,
    /// Samples in the pressure running average.
    pub smoothing_window: usize,
}

impl Default for SpontaneousCfg {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_cm_h2o: 5.0,
            trigger_source: TriggerSource::Raw,
            smoothing_window: 50,
        }
    }
}

/// Linear conversion `cmH2O = raw * multiplier + constant`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PressureCfg {
    pub multiplier: f32,
    pub constant: f32,
}

impl Default for PressureCfg {
    fn default() -> Self {
        Self {
            multiplier: 0.1331,
            constant: -5.7,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WaveformProfile {
    #[default]
    Pwm,
    Servo,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ActuatorCfg {
    pub profile: WaveformProfile,
    /// Optional custom waveform; replaces the profile's table.
    pub waveform_csv: Option<PathBuf>,
    /// Full-scale value for a custom waveform. Defaults to its largest sample.
    pub full_scale: Option<u32>,
    pub pwm_frequency_hz: f64,
}

impl Default for ActuatorCfg {
    fn default() -> Self {
        Self {
            profile: WaveformProfile::Pwm,
            waveform_csv: None,
            full_scale: None,
            pwm_frequency_hz: 1000.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EditorCfg {
    /// Hold time on Confirm that opens the settings editor.
    pub entry_hold_ms: u64,
    /// Offer IPPV/Spontaneous selection before the numeric parameters.
    pub edit_mode: bool,
    /// Foreground loop pacing.
    pub poll_interval_ms: u64,
    /// Refresh the idle pressure display every N foreground iterations.
    pub display_refresh: u32,
}

impl Default for EditorCfg {
    fn default() -> Self {
        Self {
            entry_hold_ms: 1000,
            edit_mode: false,
            poll_interval_ms: 2,
            display_refresh: 250,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ButtonsCfg {
    /// Treat low level as pressed when true
    pub active_low: bool,
}

impl Default for ButtonsCfg {
    fn default() -> Self {
        Self { active_low: true }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub timing: TimingCfg,
    pub parameters: ParametersCfg,
    pub spontaneous: SpontaneousCfg,
    pub pressure: PressureCfg,
    pub actuator: ActuatorCfg,
    pub editor: EditorCfg,
    pub buttons: ButtonsCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_waveform_csv(path: &Path) -> eyre::Result<Vec<u16>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open waveform CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<&str> = headers.iter().collect();
    if actual != ["drive"] {
        eyre::bail!(
            "waveform CSV must have the single header 'drive', got: {}",
            actual.join(",")
        );
    }

    let mut samples = Vec::new();
    for (idx, rec) in rdr.deserialize::<WaveformRow>().enumerate() {
        match rec {
            Ok(row) => samples.push(row.drive),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if samples.len() < 2 {
        eyre::bail!(
            "waveform requires at least two samples, got {}",
            samples.len()
        );
    }
    Ok(samples)
}

fn validate_bounds(name: &str, b: &ParamBounds, min_floor: u32) -> eyre::Result<()> {
    if b.step == 0 {
        eyre::bail!("parameters.{name}.step must be > 0");
    }
    if b.min > b.max {
        eyre::bail!("parameters.{name}.min must be <= max");
    }
    if !(b.min..=b.max).contains(&b.default) {
        eyre::bail!("parameters.{name}.default must be within [min, max]");
    }
    if b.min < min_floor {
        eyre::bail!("parameters.{name}.min must be >= {min_floor}");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if !(1_000..=1_000_000).contains(&self.timing.tick_period_us) {
            eyre::bail!("timing.tick_period_us must be in [1000, 1000000]");
        }

        // Parameters; rate and ratio are divisors in the cycle timing
        let p = &self.parameters;
        validate_bounds("inspiratory_pressure", &p.inspiratory_pressure, 0)?;
        validate_bounds("respiratory_rate", &p.respiratory_rate, 1)?;
        validate_bounds("tidal_volume", &p.tidal_volume, 0)?;
        validate_bounds("ie_ratio", &p.ie_ratio, 1)?;
        if p.tidal_volume.max == 0 {
            eyre::bail!("parameters.tidal_volume.max must be > 0");
        }

        // Spontaneous trigger
        let s = &self.spontaneous;
        if !s.threshold_cm_h2o.is_finite() || s.threshold_cm_h2o <= 0.0 {
            eyre::bail!("spontaneous.threshold_cm_h2o must be a positive number");
        }
        if s.smoothing_window == 0 {
            eyre::bail!("spontaneous.smoothing_window must be >= 1");
        }
        if s.smoothing_window > 10_000 {
            eyre::bail!("spontaneous.smoothing_window is unreasonably large (>10000)");
        }

        // Pressure conversion
        if !self.pressure.multiplier.is_finite() || self.pressure.multiplier == 0.0 {
            eyre::bail!("pressure.multiplier must be finite and non-zero");
        }
        if !self.pressure.constant.is_finite() {
            eyre::bail!("pressure.constant must be finite");
        }

        // Actuator
        if let Some(path) = &self.actuator.waveform_csv
            && !path.exists()
        {
            eyre::bail!("actuator.waveform_csv does not exist: {}", path.display());
        }
        if self.actuator.full_scale == Some(0) {
            eyre::bail!("actuator.full_scale must be > 0");
        }
        if !(self.actuator.pwm_frequency_hz > 0.0 && self.actuator.pwm_frequency_hz <= 100_000.0) {
            eyre::bail!("actuator.pwm_frequency_hz must be in (0, 100000]");
        }

        // Editor
        if self.editor.entry_hold_ms > 60_000 {
            eyre::bail!("editor.entry_hold_ms is unreasonably large (>60s)");
        }
        if self.editor.poll_interval_ms == 0 || self.editor.poll_interval_ms > 1_000 {
            eyre::bail!("editor.poll_interval_ms must be in [1, 1000]");
        }
        if self.editor.display_refresh == 0 {
            eyre::bail!("editor.display_refresh must be >= 1");
        }

        // Pins
        if self.pins.pressure_adc_channel > 7 {
            eyre::bail!("pins.pressure_adc_channel must be in [0, 7]");
        }

        Ok(())
    }
}
