//! Cycle timing: (respiratory rate, I:E ratio) to per-phase tick counts.
//!
//! The I:E ratio is carried scaled by 100 through the whole computation, so
//! non-integer ratios such as 0.20 or 1.40 split the breath exactly:
//!
//! ```text
//! ticks_per_breath = ticks_per_minute / rate
//! ticks_per_inhale = ticks_per_breath * 100 / (100 + ie)
//! ticks_per_exhale = ticks_per_breath * ie  / (100 + ie)
//! ```
//!
//! Both phases are floored at one tick.

use crate::error::{BuildError, Result};
use crate::fixed_point::mul_div_u32;
use crate::parameters::{ParameterKind, ParameterSet, ParameterTable};

const IE_SCALE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    pub ticks_per_inhale: u32,
    pub ticks_per_exhale: u32,
}

impl CycleTiming {
    /// Compute timing for one breath.
    ///
    /// `rate` must be at least 1; the parameter bounds guarantee this. A zero
    /// rate is treated as 1 rather than dividing by zero.
    pub fn compute(rate: u32, ie_ratio_x100: u32, ticks_per_minute: u32) -> Self {
        let (inhale, exhale) = split(rate, ie_ratio_x100, ticks_per_minute);
        Self {
            ticks_per_inhale: inhale.max(1),
            ticks_per_exhale: exhale.max(1),
        }
    }

    pub fn for_set(set: &ParameterSet, ticks_per_minute: u32) -> Self {
        Self::compute(set.respiratory_rate(), set.ie_ratio_x100(), ticks_per_minute)
    }

    #[inline]
    pub fn ticks_per_breath(&self) -> u32 {
        self.ticks_per_inhale.saturating_add(self.ticks_per_exhale)
    }
}

fn split(rate: u32, ie: u32, ticks_per_minute: u32) -> (u32, u32) {
    let per_breath = ticks_per_minute / rate.max(1);
    let denom = IE_SCALE.saturating_add(ie);
    (
        mul_div_u32(per_breath, IE_SCALE, denom),
        mul_div_u32(per_breath, ie, denom),
    )
}

/// Reject a bounds table whose extreme corner would need the one-tick floor.
///
/// The shortest inhale is at (max rate, max ratio), the shortest exhale at
/// (max rate, min ratio).
pub fn check_range(table: &ParameterTable, ticks_per_minute: u32) -> Result<()> {
    let rate_max = table.get(ParameterKind::RespiratoryRate).max;
    let ie = table.get(ParameterKind::InspiratoryExpiratoryRatio);
    let (shortest_inhale, _) = split(rate_max, ie.max, ticks_per_minute);
    let (_, shortest_exhale) = split(rate_max, ie.min, ticks_per_minute);
    if shortest_inhale == 0 || shortest_exhale == 0 {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tick period too coarse for the respiratory rate and I:E ranges",
        )));
    }
    Ok(())
}
