//! Periodic tick source with a suspend window for the hand-off.
//!
//! The handler runs on a dedicated thread against absolute deadlines. Each
//! invocation holds the gate lock for exactly one tick, so `suspend()` waits
//! out a tick already in flight and holds off the next one until the returned
//! `Suspension` is dropped.
//!
//! Each `PeriodicScheduler` owns exactly one thread, stopped and joined on drop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use vent_traits::Clock;

use crate::error::{Result, VentError};

/// Suspend/resume control over the periodic handler.
pub trait TickGate {
    /// Halt the tick source until the returned guard is dropped.
    fn suspend(&self) -> Suspension<'_>;
}

/// Proof that the tick source is halted. Dropping it resumes ticking.
#[must_use = "the tick source resumes as soon as the suspension is dropped"]
pub struct Suspension<'a> {
    _guard: Option<MutexGuard<'a, ()>>,
}

impl Suspension<'_> {
    /// A suspension with nothing to hold, for gates without a real tick thread.
    pub fn detached() -> Self {
        Suspension { _guard: None }
    }

    /// Resume the tick source. Same as dropping the guard.
    pub fn resume(self) {}
}

/// Gate for single-threaded simulation where the caller invokes ticks itself.
#[derive(Debug, Default)]
pub struct ManualGate {
    suspensions: AtomicU64,
}

impl ManualGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `suspend()` has been called.
    pub fn suspensions(&self) -> u64 {
        self.suspensions.load(Ordering::Relaxed)
    }
}

impl TickGate for ManualGate {
    fn suspend(&self) -> Suspension<'_> {
        self.suspensions.fetch_add(1, Ordering::Relaxed);
        Suspension::detached()
    }
}

#[derive(Debug, Default)]
struct Shared {
    gate: Mutex<()>,
    shutdown: AtomicBool,
    ticks: AtomicU64,
    overruns: AtomicU64,
}

pub struct PeriodicScheduler {
    shared: Arc<Shared>,
    period: Duration,
    join_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for PeriodicScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicScheduler")
            .field("period", &self.period)
            .field("ticks", &self.ticks())
            .field("overruns", &self.overruns())
            .finish()
    }
}

impl PeriodicScheduler {
    /// Start calling `handler` every `period` on a new thread.
    ///
    /// `on_start` runs once on that thread before the first tick; use it for
    /// scheduling priority or CPU affinity.
    pub fn run_periodic<C, S, F>(
        period: Duration,
        clock: C,
        on_start: S,
        mut handler: F,
    ) -> Result<Self>
    where
        C: Clock + Send + 'static,
        S: FnOnce() + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(eyre::Report::new(VentError::Scheduler(
                "tick period must be > 0".into(),
            )));
        }
        let shared = Arc::new(Shared::default());
        let worker = Arc::clone(&shared);

        let join_handle = std::thread::Builder::new()
            .name("vent-tick".into())
            .spawn(move || {
                on_start();
                let mut next = clock.now() + period;
                loop {
                    {
                        let _tick = worker.gate.lock().unwrap_or_else(PoisonError::into_inner);
                        if worker.shutdown.load(Ordering::Acquire) {
                            break;
                        }
                        handler();
                    }
                    worker.ticks.fetch_add(1, Ordering::Relaxed);

                    let now = clock.now();
                    if now < next {
                        clock.sleep(next - now);
                        next += period;
                    } else {
                        worker.overruns.fetch_add(1, Ordering::Relaxed);
                        next = now + period;
                    }
                }
                tracing::trace!("tick thread exiting");
            })
            .map_err(|e| eyre::Report::new(VentError::Scheduler(e.to_string())))?;

        let period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX);
        tracing::debug!(period_us, "tick thread started");
        Ok(Self {
            shared,
            period,
            join_handle: Some(join_handle),
        })
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed handler invocations.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that finished after their next deadline had already passed.
    pub fn overruns(&self) -> u64 {
        self.shared.overruns.load(Ordering::Relaxed)
    }

    /// Stop and join the tick thread.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("tick thread joined"),
                Err(e) => tracing::warn!(?e, "tick thread panicked during shutdown"),
            }
        }
    }
}

impl TickGate for PeriodicScheduler {
    fn suspend(&self) -> Suspension<'_> {
        let guard = self
            .shared
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Suspension {
            _guard: Some(guard),
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
