//! Hand-off of committed parameters from the editor to the controller.
//!
//! Stage, signal, wait for pickup:
//! - the editor writes the committed store, then raises the pending flag
//!   inside a suspension of the tick source (`publish`);
//! - the controller, at an inhale-start boundary, copies the committed set
//!   out and lowers the flag (`take_pending`);
//! - the editor polls `is_pending` until the controller has taken it.
//!
//! Only `publish` raises the flag and only `take_pending` lowers it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, TryLockError};

use crate::parameters::{ParameterKind, ParameterSet, ParameterSpec, ParameterStore, ParameterTable};
use crate::scheduler::TickGate;

#[derive(Debug)]
pub struct Handoff {
    committed: Mutex<ParameterStore>,
    pending: AtomicBool,
    publishes: AtomicU64,
    pickups: AtomicU64,
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new(ParameterStore::default())
    }
}

impl Handoff {
    pub fn new(store: ParameterStore) -> Self {
        Self {
            committed: Mutex::new(store),
            pending: AtomicBool::new(false),
            publishes: AtomicU64::new(0),
            pickups: AtomicU64::new(0),
        }
    }

    /// Copy of the committed values. Foreground only.
    pub fn committed(&self) -> ParameterSet {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Bounds of `kind`. The table never changes after construction.
    pub fn spec(&self, kind: ParameterKind) -> ParameterSpec {
        self.table().get(kind)
    }

    pub fn table(&self) -> ParameterTable {
        *self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .table()
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Commit `staged` and signal the controller.
    ///
    /// Foreground only, and only once every staged value is clamped. The
    /// flag is raised while the tick source is suspended.
    pub fn publish<G: TickGate + ?Sized>(&self, staged: &ParameterSet, gate: &G) {
        if self.is_pending() {
            tracing::warn!("publishing over a commit the controller has not picked up yet");
        }
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .commit(staged);

        let suspension = gate.suspend();
        self.pending.store(true, Ordering::Release);
        suspension.resume();

        self.publishes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("parameters committed, waiting for pickup");
    }

    /// Controller side. Never blocks: if the store is momentarily held by the
    /// foreground, the pickup waits for the next boundary.
    pub fn take_pending(&self) -> Option<ParameterSet> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        let set = match self.committed.try_lock() {
            Ok(store) => store.snapshot(),
            Err(TryLockError::Poisoned(p)) => p.into_inner().snapshot(),
            Err(TryLockError::WouldBlock) => return None,
        };
        self.pending.store(false, Ordering::Release);
        self.pickups.fetch_add(1, Ordering::Relaxed);
        Some(set)
    }

    pub fn publishes(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }

    pub fn pickups(&self) -> u64 {
        self.pickups.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualGate;

    #[test]
    fn flag_round_trip() {
        let h = Handoff::default();
        let gate = ManualGate::new();
        assert!(h.take_pending().is_none());

        let mut set = h.committed();
        set.set(ParameterKind::RespiratoryRate, 25);
        h.publish(&set, &gate);
        assert!(h.is_pending());
        assert_eq!(gate.suspensions(), 1);

        let got = h.take_pending().unwrap();
        assert_eq!(got.respiratory_rate(), 25);
        assert!(!h.is_pending());
        assert!(h.take_pending().is_none());
        assert_eq!((h.publishes(), h.pickups()), (1, 1));
    }

    #[test]
    fn publish_clamps_into_bounds() {
        let h = Handoff::default();
        let mut set = h.committed();
        set.set(ParameterKind::TidalVolume, 5);
        h.publish(&set, &ManualGate::new());
        assert_eq!(h.take_pending().unwrap().tidal_volume(), 200);
    }
}
