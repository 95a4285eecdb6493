//! Real-time setup for the tick thread (Linux): SCHED_FIFO priority, CPU
//! affinity and memory locking.
//!
//! Call `apply` from the thread that should run real-time, typically the
//! scheduler's `on_start` hook. Each step is attempted independently and
//! failures are logged as warnings; the controller runs either way.

use nix::sched::{CpuSet, sched_setaffinity};
use nix::sys::mman::{MlockAllFlags, mlockall};
use nix::unistd::Pid;

use crate::error::{HwError, Result};

/// Which pages to lock in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemLock {
    #[default]
    None,
    Current,
    /// Current and future mappings; falls back to `Current` when refused.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtOptions {
    /// SCHED_FIFO priority; `None` means the highest allowed. Clamped to the system range.
    pub priority: Option<i32>,
    /// Pin the calling thread to this CPU.
    pub cpu: Option<usize>,
    pub lock: MemLock,
}

/// Outcome of each step, for the caller to report.
#[derive(Debug, Default)]
pub struct RtOutcome {
    pub priority: Option<Result<i32>>,
    pub affinity: Option<Result<usize>>,
    pub lock: Option<Result<MemLock>>,
}

/// Apply `opts` to the calling thread and log what did not take effect.
pub fn apply(opts: &RtOptions) -> RtOutcome {
    let out = RtOutcome {
        lock: (opts.lock != MemLock::None).then(|| lock_memory(opts.lock)),
        priority: Some(set_fifo_priority(opts.priority)),
        affinity: opts.cpu.map(pin_to_cpu),
    };
    match &out.lock {
        Some(Ok(l)) => tracing::info!(lock = ?l, "memory locked"),
        Some(Err(e)) => tracing::warn!(error = %e, "mlockall failed"),
        None => {}
    }
    match &out.priority {
        Some(Ok(p)) => tracing::info!(priority = p, "SCHED_FIFO applied"),
        Some(Err(e)) => tracing::warn!(
            error = %e,
            "SCHED_FIFO not applied; needs CAP_SYS_NICE or root"
        ),
        None => {}
    }
    match &out.affinity {
        Some(Ok(cpu)) => tracing::info!(cpu, "tick thread pinned"),
        Some(Err(e)) => tracing::warn!(error = %e, "affinity not applied"),
        None => {}
    }
    out
}

fn lock_memory(lock: MemLock) -> Result<MemLock> {
    let current = || {
        mlockall(MlockAllFlags::MCL_CURRENT)
            .map(|()| MemLock::Current)
            .map_err(|e| HwError::Rt(format!("mlockall(current): {e}")))
    };
    match lock {
        MemLock::None => Ok(MemLock::None),
        MemLock::Current => current(),
        MemLock::All => match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
            Ok(()) => Ok(MemLock::All),
            Err(e) => {
                tracing::debug!(error = %e, "mlockall(current|future) refused, trying current");
                current()
            }
        },
    }
}

/// Clamp `wanted` into the SCHED_FIFO priority range reported by the kernel.
pub fn clamp_priority(wanted: Option<i32>) -> i32 {
    // SAFETY: plain queries with a valid policy constant.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    wanted.unwrap_or(max).clamp(min, max)
}

fn set_fifo_priority(wanted: Option<i32>) -> Result<i32> {
    let prio = clamp_priority(wanted);
    let param = libc::sched_param {
        sched_priority: prio,
    };
    // SAFETY: `param` is a valid sched_param and pthread_self() is the calling thread.
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(HwError::Io(std::io::Error::from_raw_os_error(rc)));
    }
    Ok(prio)
}

fn pin_to_cpu(cpu: usize) -> Result<usize> {
    if cpu >= CpuSet::count() {
        return Err(HwError::Rt(format!(
            "cpu {cpu} exceeds cpu_set_t capacity {}",
            CpuSet::count()
        )));
    }
    let mut set = CpuSet::new();
    set.set(cpu)
        .map_err(|e| HwError::Rt(format!("cpu {cpu}: {e}")))?;
    // pid 0 is the calling thread
    sched_setaffinity(Pid::from_raw(0), &set)
        .map_err(|e| HwError::Rt(format!("sched_setaffinity(cpu {cpu}): {e}")))?;
    Ok(cpu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped_into_range() {
        let hi = clamp_priority(Some(10_000));
        let lo = clamp_priority(Some(-5));
        assert!(hi >= lo);
        assert_eq!(clamp_priority(None), hi);
    }

    #[test]
    fn absurd_cpu_is_rejected() {
        assert!(pin_to_cpu(usize::MAX).is_err());
    }
}
