//! Command line of the `drive` binary.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Keeps the non-blocking file writer alive for the whole process.
pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Set from `--json`; read by the error path in `main`.
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "drive", version, about = "Dual-wheel PID speed controller")]
pub struct Cli {
    /// Controller config (TOML); see etc/drive_config.toml
    #[arg(long, value_name = "FILE", default_value = "etc/drive_config.toml")]
    pub config: PathBuf,

    /// Log and report as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log filter when RUST_LOG is unset (e.g. info, debug, drive_core=trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

/// What `--rt` pins in RAM.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Nothing
    None,
    /// Pages mapped now (MCL_CURRENT)
    Current,
    /// Pages mapped now and later (MCL_CURRENT | MCL_FUTURE)
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Hold both wheels at a target speed (ticks/s) until Ctrl-C or --duration-ms
    Run {
        /// Left wheel target, ticks per second (negative runs backwards)
        #[arg(long, value_name = "TPS", allow_negative_numbers = true)]
        left: i64,
        /// Right wheel target, ticks per second
        #[arg(long, value_name = "TPS", allow_negative_numbers = true)]
        right: i64,
        /// Stop after this many milliseconds (default: run until Ctrl-C)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Do not print report lines
        #[arg(long = "no-report", action = ArgAction::SetTrue)]
        no_report: bool,
        /// Send reports to the log instead of stdout
        #[arg(long, action = ArgAction::SetTrue)]
        log_reports: bool,
        /// Simulated backend only: advance time only when the loop sleeps
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Drive the simulated backend from a virtual clock. Every poll-interval sleep advances time without waiting, so a run of any length finishes immediately with the same report lines it would print in real time. Ignored with the hardware backend."
        )]
        virtual_time: bool,
        /// Print loop statistics after the run
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and mlockall to lock the process address space into RAM. This reduces page faults and jitter but may require elevated privileges or ulimits (e.g., memlock). Failures are logged and the run continues."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
    },
    /// Brake both wheels once and exit
    Halt,
    /// Open the backend, brake, and read both encoders once
    SelfCheck,
    /// Print the effective configuration (defaults filled in) as TOML
    PrintConfig,
}
