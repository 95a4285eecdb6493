//! Lock-free view of the controller for the foreground and the CLI.

use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};

use vent_traits::BreathPhase;

use crate::parameters::VentilationMode;
use crate::timing::CycleTiming;

const PHASE_INHALE: u8 = 0;
const PHASE_EXHALE: u8 = 1;

/// Written by the controller every tick with relaxed stores; fields are
/// individually consistent, not a snapshot of one tick.
#[derive(Debug, Default)]
pub struct Telemetry {
    phase: AtomicU8,
    spontaneous: AtomicU8,
    tick: AtomicU32,
    drive: AtomicU32,
    pressure_raw: AtomicU32,
    pressure_avg: AtomicU32,
    ticks_per_inhale: AtomicU32,
    ticks_per_exhale: AtomicU32,
    breaths: AtomicU64,
    triggered_breaths: AtomicU64,
    ticks: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub phase: BreathPhase,
    pub mode: VentilationMode,
    pub tick: u32,
    pub drive: u32,
    pub pressure_raw: u32,
    pub pressure_avg: u32,
    pub timing: CycleTiming,
    pub breaths: u64,
    pub triggered_breaths: u64,
    pub ticks: u64,
}

impl Telemetry {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record_tick(
        &self,
        phase: BreathPhase,
        mode: VentilationMode,
        tick: u32,
        drive: u32,
        pressure_raw: u32,
        pressure_avg: u32,
        timing: CycleTiming,
    ) {
        let p = match phase {
            BreathPhase::Inhale => PHASE_INHALE,
            BreathPhase::Exhale => PHASE_EXHALE,
        };
        self.phase.store(p, Ordering::Relaxed);
        self.spontaneous
            .store(u8::from(mode.is_spontaneous()), Ordering::Relaxed);
        self.tick.store(tick, Ordering::Relaxed);
        self.drive.store(drive, Ordering::Relaxed);
        self.pressure_raw.store(pressure_raw, Ordering::Relaxed);
        self.pressure_avg.store(pressure_avg, Ordering::Relaxed);
        self.ticks_per_inhale
            .store(timing.ticks_per_inhale, Ordering::Relaxed);
        self.ticks_per_exhale
            .store(timing.ticks_per_exhale, Ordering::Relaxed);
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_breath(&self, patient_triggered: bool) {
        self.breaths.fetch_add(1, Ordering::Relaxed);
        if patient_triggered {
            self.triggered_breaths.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let phase = if self.phase.load(Ordering::Relaxed) == PHASE_EXHALE {
            BreathPhase::Exhale
        } else {
            BreathPhase::Inhale
        };
        let mode = if self.spontaneous.load(Ordering::Relaxed) == 0 {
            VentilationMode::Ippv
        } else {
            VentilationMode::Spontaneous
        };
        TelemetrySnapshot {
            phase,
            mode,
            tick: self.tick.load(Ordering::Relaxed),
            drive: self.drive.load(Ordering::Relaxed),
            pressure_raw: self.pressure_raw.load(Ordering::Relaxed),
            pressure_avg: self.pressure_avg.load(Ordering::Relaxed),
            timing: CycleTiming {
                ticks_per_inhale: self.ticks_per_inhale.load(Ordering::Relaxed),
                ticks_per_exhale: self.ticks_per_exhale.load(Ordering::Relaxed),
            },
            breaths: self.breaths.load(Ordering::Relaxed),
            triggered_breaths: self.triggered_breaths.load(Ordering::Relaxed),
            ticks: self.ticks.load(Ordering::Relaxed),
        }
    }
}
