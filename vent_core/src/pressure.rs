//! Pressure conversion and smoothing.

use crate::fixed_point::mean_round_u32;

/// Linear raw-to-physical conversion: `cmH2O = raw * multiplier + constant`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureScale {
    pub multiplier: f32,
    pub constant: f32,
}

impl Default for PressureScale {
    fn default() -> Self {
        Self {
            multiplier: 0.1331,
            constant: -5.7,
        }
    }
}

impl PressureScale {
    #[inline]
    pub fn to_cm_h2o(&self, raw: u32) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let raw = raw as f32;
        raw.mul_add(self.multiplier, self.constant)
    }

    /// Same as `to_cm_h2o` but never negative, for display.
    #[inline]
    pub fn display_cm_h2o(&self, raw: u32) -> f32 {
        self.to_cm_h2o(raw).max(0.0)
    }
}

/// Which reading the spontaneous trigger compares against its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerSource {
    #[default]
    Raw,
    Smoothed,
}

/// Fixed-window running average. Storage is allocated once; `push` is O(1).
#[derive(Debug, Clone)]
pub struct RunningAverage {
    buf: Box<[u32]>,
    head: usize,
    filled: usize,
    sum: u64,
}

impl RunningAverage {
    /// A zero window is treated as 1.
    pub fn new(window: usize) -> Self {
        Self {
            buf: vec![0; window.max(1)].into_boxed_slice(),
            head: 0,
            filled: 0,
            sum: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, sample: u32) {
        if self.filled == self.buf.len() {
            self.sum -= u64::from(self.buf[self.head]);
        } else {
            self.filled += 1;
        }
        self.buf[self.head] = sample;
        self.sum += u64::from(sample);
        self.head = (self.head + 1) % self.buf.len();
    }

    /// Mean of the samples seen so far (up to the window), rounded.
    #[inline]
    pub fn mean(&self) -> u32 {
        mean_round_u32(self.sum, self.filled)
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_scale_threshold_point() {
        let s = PressureScale::default();
        // 80 raw is about 4.95 cmH2O, just under the default trigger
        assert!(s.to_cm_h2o(80) < 5.0);
        assert!(s.to_cm_h2o(81) > 5.0);
        assert!(s.to_cm_h2o(0) < 0.0);
        assert!(s.display_cm_h2o(0).abs() < f32::EPSILON);
    }

    #[test]
    fn average_warms_up_then_slides() {
        let mut avg = RunningAverage::new(3);
        assert!(avg.is_empty());
        avg.push(3);
        assert_eq!(avg.mean(), 3);
        avg.push(6);
        avg.push(9);
        assert_eq!(avg.mean(), 6);
        avg.push(30);
        // window now holds 6, 9, 30
        assert_eq!(avg.mean(), 15);
    }

    #[test]
    fn zero_window_behaves_as_one() {
        let mut avg = RunningAverage::new(0);
        avg.push(4);
        avg.push(8);
        assert_eq!(avg.window(), 1);
        assert_eq!(avg.mean(), 8);
    }
}
