//! Integer helpers for the tick path.
//!
//! The controller works in raw actuator units and whole ticks; these keep the
//! intermediate products in 64 bits so nothing wraps.

/// `value * num / den`, floored, saturating at `u32::MAX`. A zero `den` yields 0.
#[inline]
pub fn mul_div_u32(value: u32, num: u32, den: u32) -> u32 {
    if den == 0 {
        return 0;
    }
    let q = u64::from(value) * u64::from(num) / u64::from(den);
    u32::try_from(q).unwrap_or(u32::MAX)
}

/// Clamp a signed candidate into `[lo, hi]` and narrow to `u32`.
#[inline]
pub fn clamp_i64_to_u32(candidate: i64, lo: u32, hi: u32) -> u32 {
    let c = candidate.clamp(i64::from(lo), i64::from(hi));
    // in range by construction
    u32::try_from(c).unwrap_or(lo)
}

/// Rounded mean of `n` samples whose sum is `sum`. Returns 0 for `n == 0`.
#[inline]
pub fn mean_round_u32(sum: u64, n: usize) -> u32 {
    if n == 0 {
        return 0;
    }
    let n = n as u64;
    u32::try_from((sum + n / 2) / n).unwrap_or(u32::MAX)
}
