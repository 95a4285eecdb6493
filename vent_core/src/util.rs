//! Period and tick-count helpers.

use std::time::Duration;

/// Number of microseconds in one minute.
pub const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Tick period of the reference controller.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(10);

/// Number of whole ticks of `period` in one minute.
/// - A zero period is treated as 1 µs.
/// - Saturates at `u32::MAX`.
#[inline]
pub fn ticks_per_minute(period: Duration) -> u32 {
    let us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX).max(1);
    u32::try_from(MICROS_PER_MINUTE / us).unwrap_or(u32::MAX)
}

/// Duration of `ticks` periods, saturating.
#[inline]
pub fn ticks_to_duration(ticks: u32, period: Duration) -> Duration {
    period.saturating_mul(ticks)
}
