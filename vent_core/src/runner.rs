//! Wire the controller to a tick thread and drive the foreground until shutdown.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use vent_traits::{ActuatorDriver, Clock, DisplayDriver, InputSource, PhaseIndicator, PressureSensor};

use crate::controller::BreathController;
use crate::error::Result;
use crate::foreground::{Foreground, ForegroundStats};
use crate::scheduler::PeriodicScheduler;
use crate::telemetry::TelemetrySnapshot;

/// What a run did, gathered after the tick thread has been joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub overruns: u64,
    pub publishes: u64,
    pub pickups: u64,
    pub foreground: ForegroundStats,
    pub telemetry: TelemetrySnapshot,
    pub elapsed: Duration,
}

/// Run until `shutdown` is raised.
///
/// The controller moves onto a `vent-tick` thread; `on_start` runs there
/// before the first tick. The foreground runs on the calling thread.
pub fn run<A, P, I, In, D, C, TC, S>(
    controller: BreathController<A, P, I>,
    foreground: &mut Foreground<In, D, C>,
    tick_clock: TC,
    on_start: S,
    shutdown: &AtomicBool,
) -> Result<RunSummary>
where
    A: ActuatorDriver + Send + 'static,
    P: PressureSensor + Send + 'static,
    I: PhaseIndicator + Send + 'static,
    In: InputSource,
    D: DisplayDriver,
    C: Clock,
    TC: Clock + Send + 'static,
    S: FnOnce() + Send + 'static,
{
    let ctx = std::sync::Arc::clone(controller.context());
    let period = controller.tick_period();
    let started = std::time::Instant::now();
    let mut controller = controller;

    tracing::info!(
        ticks_per_inhale = controller.timing().ticks_per_inhale,
        ticks_per_exhale = controller.timing().ticks_per_exhale,
        mode = controller.working_set().mode.label(),
        "ventilation started"
    );

    let scheduler = PeriodicScheduler::run_periodic(period, tick_clock, on_start, move || {
        controller.tick();
    })?;
    let fg = foreground.run_until(&scheduler, shutdown);

    let ticks = scheduler.ticks();
    let overruns = scheduler.overruns();
    scheduler.stop();

    let telemetry = ctx.telemetry.snapshot();
    let summary = RunSummary {
        ticks,
        overruns,
        publishes: ctx.handoff.publishes(),
        pickups: ctx.handoff.pickups(),
        foreground: fg,
        telemetry,
        elapsed: started.elapsed(),
    };
    if overruns > 0 {
        tracing::warn!(overruns, ticks, "tick deadlines missed");
    }
    tracing::info!(
        breaths = telemetry.breaths,
        triggered = telemetry.triggered_breaths,
        commits = fg.commits,
        "ventilation stopped"
    );
    Ok(summary)
}
