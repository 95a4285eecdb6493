//! Notable controller events, passed to the foreground without blocking.
//!
//! The tick path only ever `try_send`s into a bounded channel; when the
//! foreground falls behind, events are dropped rather than delaying a tick.

use crossbeam_channel as xch;
use vent_traits::BreathPhase;

use crate::parameters::ParameterSet;
use crate::timing::CycleTiming;

/// Capacity of the controller-to-foreground event queue.
pub const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BreathEvent {
    PhaseStarted { phase: BreathPhase, breath: u64 },
    PatientTriggered { pressure_cm_h2o: f32, breath: u64 },
    ParametersApplied { set: ParameterSet, timing: CycleTiming },
}

pub type EventSender = xch::Sender<BreathEvent>;
pub type EventReceiver = xch::Receiver<BreathEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    xch::bounded(EVENT_CAPACITY)
}

/// Log one event at the level it deserves.
pub fn log_event(ev: &BreathEvent) {
    match *ev {
        BreathEvent::PhaseStarted { phase, breath } => {
            tracing::trace!(phase = phase.as_str(), breath, "phase started");
        }
        BreathEvent::PatientTriggered {
            pressure_cm_h2o,
            breath,
        } => {
            tracing::info!(pressure_cm_h2o, breath, "patient-triggered breath");
        }
        BreathEvent::ParametersApplied { set, timing } => {
            tracing::info!(
                rate = set.respiratory_rate(),
                ie_x100 = set.ie_ratio_x100(),
                tidal = set.tidal_volume(),
                mode = set.mode.label(),
                ticks_per_inhale = timing.ticks_per_inhale,
                ticks_per_exhale = timing.ticks_per_exhale,
                "new parameters in effect"
            );
        }
    }
}
