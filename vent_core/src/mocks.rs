//! Minimal collaborators for tests, benches and headless runs.

use vent_traits::{ActuatorDriver, BreathPhase, PhaseIndicator, PressureSensor};

/// Indicator that ignores every phase change.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndicator;

impl PhaseIndicator for NoopIndicator {
    fn set_indicator(&mut self, _phase: BreathPhase) {}
}

/// Actuator that discards every output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl ActuatorDriver for NullActuator {
    fn set_output(&mut self, _magnitude: u32, _full_scale: u32) {}
}

/// Sensor that always reads the same raw value.
#[derive(Debug, Clone, Copy)]
pub struct FixedPressure(pub u32);

impl PressureSensor for FixedPressure {
    fn read_instantaneous(&mut self) -> u32 {
        self.0
    }
}
