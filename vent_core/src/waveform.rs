//! Inhale drive waveform: shape table lookup and tidal-volume scaling.

use std::sync::Arc;

use crate::error::{BuildError, Result};
use crate::fixed_point::mul_div_u32;

/// Analogue-output profile: 0..=1023 PWM duty, slow start, fast middle, slow finish.
const PWM_SHAPE: [u16; 101] = [
    0, 5, 10, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 65, 70, 75, 80, 85, 90, 95, 100, 105, 110,
    115, 120, 125, 130, 135, 140, 145, 150, 155, 160, 165, 170, 175, 180, 185, 190, 195, 200, 217,
    235, 252, 270, 287, 305, 322, 340, 357, 375, 392, 410, 427, 445, 462, 480, 497, 515, 532, 550,
    567, 585, 602, 620, 637, 655, 672, 690, 707, 725, 742, 760, 777, 795, 812, 830, 847, 865, 882,
    900, 906, 912, 918, 924, 930, 936, 943, 949, 955, 961, 967, 973, 979, 986, 992, 998, 1004,
    1010, 1016, 1023,
];
const PWM_FULL_SCALE: u32 = 1023;

/// Hobby-servo profile: pulse width in microseconds.
const SERVO_SHAPE: [u16; 101] = [
    750, 761, 772, 783, 795, 806, 817, 828, 840, 851, 862, 873, 885, 896, 907, 918, 930, 941, 952,
    963, 975, 986, 997, 1008, 1020, 1031, 1042, 1053, 1065, 1076, 1087, 1098, 1110, 1121, 1132,
    1143, 1155, 1166, 1177, 1188, 1200, 1220, 1240, 1260, 1280, 1300, 1320, 1340, 1360, 1380, 1400,
    1420, 1440, 1460, 1480, 1500, 1520, 1540, 1560, 1580, 1600, 1620, 1640, 1660, 1680, 1700, 1720,
    1740, 1760, 1780, 1800, 1820, 1840, 1860, 1880, 1900, 1920, 1940, 1960, 1980, 2000, 2012, 2025,
    2037, 2050, 2062, 2075, 2087, 2100, 2112, 2125, 2137, 2150, 2162, 2175, 2187, 2200, 2212, 2225,
    2237, 2250,
];
const SERVO_FULL_SCALE: u32 = 2400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveformProfile {
    #[default]
    Pwm,
    Servo,
}

/// Immutable inhale trajectory. Cheap to clone; the samples are shared.
#[derive(Debug, Clone)]
pub struct DriveWaveform {
    samples: Arc<[u16]>,
    park: u16,
    full_scale: u32,
}

impl DriveWaveform {
    pub fn builtin(profile: WaveformProfile) -> Self {
        match profile {
            WaveformProfile::Pwm => Self::from_parts(&PWM_SHAPE, PWM_FULL_SCALE),
            WaveformProfile::Servo => Self::from_parts(&SERVO_SHAPE, SERVO_FULL_SCALE),
        }
    }

    /// Build from a custom shape. `full_scale` must cover every sample.
    pub fn from_samples(samples: &[u16], full_scale: u32) -> Result<Self> {
        if samples.len() < 2 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "waveform needs at least two samples",
            )));
        }
        if samples.iter().any(|&s| u32::from(s) > full_scale) {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "waveform sample exceeds full scale",
            )));
        }
        Ok(Self::from_parts(samples, full_scale))
    }

    fn from_parts(samples: &[u16], full_scale: u32) -> Self {
        let park = samples.iter().copied().min().unwrap_or(0);
        Self {
            samples: Arc::from(samples),
            park,
            full_scale,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    pub fn full_scale(&self) -> u32 {
        self.full_scale
    }

    /// Table position for `tick` within an inhale of `ticks_per_inhale` ticks.
    /// Never exceeds `len() - 1`, however far `tick` runs past the phase.
    #[inline]
    pub fn index_for(&self, tick: u32, ticks_per_inhale: u32) -> usize {
        let last = self.samples.len().saturating_sub(1);
        let len = self.samples.len() as u64;
        let idx = len * u64::from(tick) / u64::from(ticks_per_inhale.max(1));
        usize::try_from(idx).map_or(last, |i| i.min(last))
    }

    /// Scaled drive at `tick` of the inhale phase.
    #[inline]
    pub fn inhale_drive(&self, tick: u32, ticks_per_inhale: u32, tidal: u32, tidal_max: u32) -> u32 {
        let raw = self.samples[self.index_for(tick, ticks_per_inhale)];
        mul_div_u32(u32::from(raw), tidal, tidal_max)
    }

    /// Scaled parked position held through exhale.
    #[inline]
    pub fn exhale_drive(&self, tidal: u32, tidal_max: u32) -> u32 {
        mul_div_u32(u32::from(self.park), tidal, tidal_max)
    }
}
