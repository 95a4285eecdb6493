//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "vent", version, about = "Ventilator breath-cycle controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/vent_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print JSON results
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Log level (error|warn|info|debug|trace); overrides RUST_LOG and [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the breath cycle until Ctrl-C or the duration elapses
    Run {
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Start in spontaneous mode regardless of the config
        #[arg(long, action = ArgAction::SetTrue)]
        spontaneous: bool,
        /// Print tick and hand-off statistics
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Simulation only: have a scripted operator change the respiratory rate
        #[arg(long, value_name = "BPM")]
        sim_set_rate: Option<u32>,
        /// Enable real-time mode on the tick thread (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode for the tick thread (Linux, requires the `rt` feature).\n\nAttempts SCHED_FIFO priority, pins the tick thread to one CPU, and calls mlockall to keep the process resident. This reduces jitter but may require CAP_SYS_NICE, CAP_IPC_LOCK or a raised 'ulimit -l'. Failures are logged and the controller runs anyway."
        )]
        rt: bool,
        /// SCHED_FIFO priority for --rt (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
        /// CPU index to pin the tick thread to for --rt
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Print the inhale/exhale tick counts for a rate and I:E ratio
    Timing {
        /// Breaths per minute (defaults to the configured default)
        #[arg(long, value_name = "BPM")]
        rate: Option<u32>,
        /// I:E ratio scaled by 100 (defaults to the configured default)
        #[arg(long, value_name = "X100")]
        ie: Option<u32>,
    },
    /// Validate the configuration and waveform, then build a controller
    SelfCheck,
}
