//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "hydroctl", version, about = "Hydroponic rig controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/hydro_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides the
    /// config file's logging.level, defaults to info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop against the simulated rig
    Run {
        /// Stop after this many cycles instead of running until Ctrl-C
        #[arg(long, value_name = "N")]
        cycles: Option<u64>,
    },
    /// Send one external command (start_irrigation | stop_all |
    /// start_recirculation | refill_on) and print the acknowledgement
    Command {
        /// Command name on the wire
        cmd: String,
    },
    /// Load config and calibration, run one cycle on null collaborators,
    /// and report readiness
    SelfCheck,
}
