//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "mirror", version, about = "Contactless mirror light")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/mirror_config.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON and log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
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
    /// Run the presence/light control loop
    Run {
        /// Stop after this many polls (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        iterations: Option<u64>,
        /// Enable real-time mode (SCHED_FIFO, affinity, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode (Linux only).\n\nAttempts SCHED_FIFO priority, pins the process to one CPU, and locks memory with mlockall. Echo ranging times the pulse by busy-waiting, so scheduler preemption during a measurement shows up directly as distance error; real-time mode reduces that jitter. May require CAP_SYS_NICE / CAP_IPC_LOCK or root."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is set (clamped to the system range)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
        /// CPU index to pin to when --rt is set (default 0)
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Take distance readings and print them with the presence verdict
    Measure {
        /// Number of readings (spaced by the configured poll interval)
        #[arg(long, value_name = "N", default_value_t = 1)]
        count: u32,
    },
    /// List the sensor kinds this build can drive
    Sensors,
    /// Quick health check: build sensor and light, take a reading, pulse the light
    SelfCheck,
}
