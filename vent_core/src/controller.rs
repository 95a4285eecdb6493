//! The breath-cycle controller: one call to `tick` per scheduling period.
//!
//! Per tick:
//! 1. advance the tick counter and sample pressure into the running average;
//! 2. in spontaneous mode during exhale, start an inhale at once if pressure
//!    is at or below the trigger threshold;
//! 3. look up and scale the drive for the current phase and emit it;
//! 4. switch phase when the phase's tick budget is used up.
//!
//! New parameters are taken only when an inhale starts, so timing never
//! changes part-way through a phase. `tick` does not allocate or block.

use std::sync::Arc;

use vent_traits::{ActuatorDriver, BreathPhase, PhaseIndicator, PressureSensor};

use crate::config::ControllerCfg;
use crate::context::VentContext;
use crate::events::{BreathEvent, EventSender};
use crate::parameters::{ParameterKind, ParameterSet};
use crate::pressure::{RunningAverage, TriggerSource};
use crate::status::TickReport;
use crate::timing::CycleTiming;
use crate::util::ticks_per_minute;
use crate::waveform::DriveWaveform;

pub struct BreathController<A, P, I> {
    pub(crate) actuator: A,
    pub(crate) pressure: P,
    pub(crate) indicator: I,
    pub(crate) waveform: DriveWaveform,
    pub(crate) ctx: Arc<VentContext>,
    pub(crate) cfg: ControllerCfg,
    pub(crate) events: Option<EventSender>,

    // precomputed
    pub(crate) ticks_per_minute: u32,
    pub(crate) tidal_max: u32,

    // runtime state
    pub(crate) working: ParameterSet,
    pub(crate) timing: CycleTiming,
    pub(crate) phase: BreathPhase,
    pub(crate) tick: u32,
    pub(crate) filter: RunningAverage,
    pub(crate) breaths: u64,
}

impl<A, P, I> std::fmt::Debug for BreathController<A, P, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreathController")
            .field("phase", &self.phase)
            .field("tick", &self.tick)
            .field("timing", &self.timing)
            .field("working", &self.working)
            .field("breaths", &self.breaths)
            .finish_non_exhaustive()
    }
}

impl<A, P, I> BreathController<A, P, I>
where
    A: ActuatorDriver,
    P: PressureSensor,
    I: PhaseIndicator,
{
    pub(crate) fn new(
        actuator: A,
        pressure: P,
        indicator: I,
        waveform: DriveWaveform,
        ctx: Arc<VentContext>,
        cfg: ControllerCfg,
        events: Option<EventSender>,
    ) -> Self {
        let ticks_per_minute = ticks_per_minute(cfg.tick_period);
        let tidal_max = ctx.handoff.spec(ParameterKind::TidalVolume).max;
        let working = ctx.handoff.committed();
        let timing = CycleTiming::for_set(&working, ticks_per_minute);
        ctx.telemetry.record_breath(false);
        Self {
            actuator,
            pressure,
            indicator,
            waveform,
            cfg,
            events,
            ticks_per_minute,
            tidal_max,
            working,
            timing,
            phase: BreathPhase::Inhale,
            tick: 0,
            filter: RunningAverage::new(cfg.spontaneous.smoothing_window),
            breaths: 1,
            ctx,
        }
    }

    /// One period of the control loop.
    pub fn tick(&mut self) -> TickReport {
        self.tick = self.tick.saturating_add(1);
        let raw = self.pressure.read_instantaneous();
        self.filter.push(raw);

        let mut report = TickReport {
            phase: self.phase,
            tick: self.tick,
            drive: 0,
            pressure_raw: raw,
            patient_triggered: false,
            applied: None,
        };

        if self.phase == BreathPhase::Exhale && self.working.mode.is_spontaneous() {
            let sample = match self.cfg.spontaneous.source {
                TriggerSource::Raw => raw,
                TriggerSource::Smoothed => self.filter.mean(),
            };
            let cm_h2o = self.cfg.pressure.to_cm_h2o(sample);
            if cm_h2o <= self.cfg.spontaneous.threshold_cm_h2o {
                self.tick = 0;
                report.patient_triggered = true;
                report.applied = self.begin_inhale(true);
                self.emit(BreathEvent::PatientTriggered {
                    pressure_cm_h2o: cm_h2o,
                    breath: self.breaths,
                });
            }
        }

        let tidal = self.working.tidal_volume();
        let drive = match self.phase {
            BreathPhase::Inhale => self.waveform.inhale_drive(
                self.tick,
                self.timing.ticks_per_inhale,
                tidal,
                self.tidal_max,
            ),
            BreathPhase::Exhale => self.waveform.exhale_drive(tidal, self.tidal_max),
        };
        self.actuator.set_output(drive, self.waveform.full_scale());
        self.indicator.set_indicator(self.phase);
        report.drive = drive;

        match self.phase {
            BreathPhase::Inhale if self.tick >= self.timing.ticks_per_inhale => {
                self.phase = BreathPhase::Exhale;
                self.tick = 0;
                self.emit(BreathEvent::PhaseStarted {
                    phase: BreathPhase::Exhale,
                    breath: self.breaths,
                });
            }
            BreathPhase::Exhale if self.tick >= self.timing.ticks_per_exhale => {
                self.tick = 0;
                if let Some(t) = self.begin_inhale(false) {
                    report.applied = Some(t);
                }
            }
            _ => {}
        }

        report.phase = self.phase;
        report.tick = self.tick;
        self.ctx.telemetry.record_tick(
            self.phase,
            self.working.mode,
            self.tick,
            drive,
            raw,
            self.filter.mean(),
            self.timing,
        );
        report
    }

    /// Enter inhale and take any pending parameters. Returns the new timing
    /// when a commit was picked up.
    fn begin_inhale(&mut self, patient_triggered: bool) -> Option<CycleTiming> {
        self.phase = BreathPhase::Inhale;
        self.breaths += 1;
        self.ctx.telemetry.record_breath(patient_triggered);

        let mut applied = None;
        if let Some(set) = self.ctx.handoff.take_pending() {
            self.working = set;
            self.timing = CycleTiming::for_set(&set, self.ticks_per_minute);
            self.emit(BreathEvent::ParametersApplied {
                set,
                timing: self.timing,
            });
            applied = Some(self.timing);
        }
        self.emit(BreathEvent::PhaseStarted {
            phase: BreathPhase::Inhale,
            breath: self.breaths,
        });
        applied
    }

    #[inline]
    fn emit(&self, ev: BreathEvent) {
        if let Some(tx) = &self.events {
            // full or disconnected: drop, never wait
            let _ = tx.try_send(ev);
        }
    }

    #[inline]
    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    /// Ticks elapsed in the current phase.
    #[inline]
    pub fn tick_in_phase(&self) -> u32 {
        self.tick
    }

    #[inline]
    pub fn tick_period(&self) -> std::time::Duration {
        self.cfg.tick_period
    }

    #[inline]
    pub fn timing(&self) -> CycleTiming {
        self.timing
    }

    /// Parameters the controller is currently delivering.
    #[inline]
    pub fn working_set(&self) -> &ParameterSet {
        &self.working
    }

    /// Breaths started so far, including the first.
    #[inline]
    pub fn breaths(&self) -> u64 {
        self.breaths
    }

    #[inline]
    pub fn context(&self) -> &Arc<VentContext> {
        &self.ctx
    }

    #[inline]
    pub fn waveform(&self) -> &DriveWaveform {
        &self.waveform
    }

    /// Hand back the collaborators.
    pub fn into_parts(self) -> (A, P, I) {
        (self.actuator, self.pressure, self.indicator)
    }
}
