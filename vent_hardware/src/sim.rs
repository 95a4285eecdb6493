//! Simulated collaborators for headless runs and tests.
//!
//! Each type is a cheap handle over shared atomics, so a clone kept by the
//! caller observes or steers the instance moved into the controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use vent_traits::{
    ActuatorDriver, BreathPhase, DisplayDriver, InputPin, InputSource, Level, PhaseIndicator,
    PressureSensor,
};

/// Records the last output it was asked to produce.
#[derive(Debug, Clone, Default)]
pub struct SimActuator {
    last: Arc<AtomicU32>,
    full_scale: Arc<AtomicU32>,
    writes: Arc<AtomicU64>,
}

impl SimActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> u32 {
        self.last.load(Ordering::Relaxed)
    }

    /// Last output as a fraction of full scale, in `[0, 1]`.
    pub fn last_fraction(&self) -> f64 {
        let fs = self.full_scale.load(Ordering::Relaxed);
        if fs == 0 {
            return 0.0;
        }
        f64::from(self.last()) / f64::from(fs)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl ActuatorDriver for SimActuator {
    fn set_output(&mut self, magnitude: u32, full_scale: u32) {
        self.last.store(magnitude, Ordering::Relaxed);
        self.full_scale.store(full_scale, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Periodic inspiratory effort: every `period` reads, the last `width` of
/// them return `raw` instead of the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientEffort {
    pub period: u32,
    pub width: u32,
    pub raw: u32,
}

/// Pressure source with a settable baseline, an optional repeating script
/// and an optional patient-effort dip.
#[derive(Debug, Clone)]
pub struct SimPressure {
    baseline: Arc<AtomicU32>,
    script: Option<Arc<[u32]>>,
    effort: Option<PatientEffort>,
    reads: u64,
}

impl SimPressure {
    pub fn new(baseline: u32) -> Self {
        Self {
            baseline: Arc::new(AtomicU32::new(baseline)),
            script: None,
            effort: None,
            reads: 0,
        }
    }

    /// Replay `samples` in a loop. An empty script falls back to the baseline.
    pub fn scripted(samples: impl Into<Arc<[u32]>>) -> Self {
        let samples = samples.into();
        Self {
            script: (!samples.is_empty()).then_some(samples),
            ..Self::new(0)
        }
    }

    #[must_use]
    pub fn with_effort(mut self, effort: PatientEffort) -> Self {
        self.effort = (effort.period > 0).then_some(effort);
        self
    }

    /// Change the baseline seen by every clone.
    pub fn set(&self, raw: u32) {
        self.baseline.store(raw, Ordering::Relaxed);
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl PressureSensor for SimPressure {
    fn read_instantaneous(&mut self) -> u32 {
        let n = self.reads;
        self.reads = self.reads.wrapping_add(1);

        if let Some(e) = self.effort {
            let pos = n % u64::from(e.period);
            if pos >= u64::from(e.period.saturating_sub(e.width)) {
                return e.raw;
            }
        }
        match &self.script {
            Some(s) => {
                let idx = usize::try_from(n % s.len() as u64).unwrap_or(0);
                s[idx]
            }
            None => self.baseline.load(Ordering::Relaxed),
        }
    }
}

/// Logs phase changes and counts them.
#[derive(Debug, Clone, Default)]
pub struct SimIndicator {
    current: Option<BreathPhase>,
    changes: Arc<AtomicU64>,
}

impl SimIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }
}

impl PhaseIndicator for SimIndicator {
    fn set_indicator(&mut self, phase: BreathPhase) {
        if self.current != Some(phase) {
            self.current = Some(phase);
            self.changes.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(phase = phase.as_str(), "indicator");
        }
    }
}

/// Text display that logs each screen once it is complete.
///
/// A screen starts at `clear()`; labels and values accumulate into one line
/// which is logged on the next `clear()` or when `flush` is called.
#[derive(Debug, Default)]
pub struct LogDisplay {
    line: String,
    last_logged: String,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently on screen.
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Log the current screen if it differs from the last one logged.
    pub fn flush(&mut self) {
        if !self.line.is_empty() && self.line != self.last_logged {
            tracing::info!(screen = %self.line, "display");
            self.last_logged.clone_from(&self.line);
        }
    }

    fn push(&mut self, text: &str) {
        if !self.line.is_empty() {
            self.line.push(' ');
        }
        self.line.push_str(text);
    }
}

impl DisplayDriver for LogDisplay {
    fn show_label(&mut self, text: &str) {
        self.push(text);
    }

    fn show_value(&mut self, value: u32, unit: &str) {
        self.push(&format!("{value} {unit}"));
    }

    fn clear(&mut self) {
        self.flush();
        self.line.clear();
    }
}

/// Settable pin levels. Every line idles high.
#[derive(Debug, Clone)]
pub struct SimInputs {
    high: Arc<[AtomicBool; 5]>,
}

impl Default for SimInputs {
    fn default() -> Self {
        Self {
            high: Arc::new(std::array::from_fn(|_| AtomicBool::new(true))),
        }
    }
}

const fn slot(pin: InputPin) -> usize {
    match pin {
        InputPin::RotaryClock => 0,
        InputPin::RotaryData => 1,
        InputPin::Select => 2,
        InputPin::Confirm => 3,
        InputPin::Cancel => 4,
    }
}

impl SimInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pin: InputPin, level: Level) {
        self.high[slot(pin)].store(level.is_high(), Ordering::Relaxed);
    }
}

impl InputSource for SimInputs {
    fn level(&self, pin: InputPin) -> Level {
        Level::from_bool(self.high[slot(pin)].load(Ordering::Relaxed))
    }
}

/// Operator gestures played onto `SimInputs` in real time, assuming
/// active-low buttons. Each level is held for `pace`, which must span several
/// foreground polls.
#[derive(Debug)]
pub struct SimOperator {
    inputs: SimInputs,
    pace: Duration,
    clock_high: bool,
}

impl SimOperator {
    pub fn new(inputs: SimInputs, pace: Duration) -> Self {
        Self {
            inputs,
            pace,
            clock_high: true,
        }
    }

    pub fn pause(&self, paces: u32) {
        std::thread::sleep(self.pace.saturating_mul(paces));
    }

    /// Press `pin` for `held`, then release.
    pub fn hold(&self, pin: InputPin, held: Duration) {
        self.inputs.set(pin, Level::Low);
        std::thread::sleep(held);
        self.inputs.set(pin, Level::High);
        self.pause(1);
    }

    pub fn click(&self, pin: InputPin) {
        self.hold(pin, self.pace);
    }

    /// Turn the encoder by `detents`; positive is clockwise.
    pub fn turn(&mut self, detents: i32) {
        for _ in 0..detents.unsigned_abs() {
            self.clock_high = !self.clock_high;
            let data_high = if detents > 0 {
                !self.clock_high
            } else {
                self.clock_high
            };
            self.inputs
                .set(InputPin::RotaryData, Level::from_bool(data_high));
            self.inputs
                .set(InputPin::RotaryClock, Level::from_bool(self.clock_high));
            self.pause(1);
        }
    }
}
