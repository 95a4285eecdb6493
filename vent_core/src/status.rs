//! Results returned by the tick handler and the settings editor.

use vent_traits::BreathPhase;

use crate::timing::CycleTiming;

/// What one controller tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub phase: BreathPhase,
    pub tick: u32,
    /// Scaled actuator output sent this tick.
    pub drive: u32,
    pub pressure_raw: u32,
    /// An inhale started this tick because the patient pulled pressure down.
    pub patient_triggered: bool,
    /// A committed parameter set was picked up this tick; carries the new timing.
    pub applied: Option<CycleTiming>,
}

/// Outcome of one settings-editor step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorProgress {
    /// Still editing; call `step` again.
    Editing,
    /// The new set was handed off and the controller has picked it up.
    Committed,
    /// Aborted with Cancel; nothing was committed.
    Cancelled,
}
