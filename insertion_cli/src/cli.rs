//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();
/// Effective safety knobs used for the current run (for JSON details).
pub static LAST_SAFETY: OnceLock<CliSafety> = OnceLock::new();

#[derive(Copy, Clone, Debug)]
pub struct CliSafety {
    pub max_run_ms: u64,
    pub phase_timeout_ms: u64,
    pub jam_force_n: f64,
    pub max_descent_m: f64,
}

#[derive(Parser, Debug)]
#[command(name = "insertion", version, about = "Peg-in-hole insertion supervisor")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/insertion.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); defaults to [logging] level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one insertion against the simulated arm
    Run {
        /// Override safety: max run time in ms (takes precedence over config)
        #[arg(long, value_name = "MS")]
        max_run_ms: Option<u64>,
        /// Dump every generated Cartesian trajectory to this CSV (x,y,z)
        #[arg(long, value_name = "FILE")]
        trajectory_csv: Option<PathBuf>,
        /// Print total runtime on completion
        #[arg(long, action = ArgAction::SetTrue)]
        print_runtime: bool,
    },
    /// Validate the config and probe the simulated hardware
    SelfCheck,
    /// Write the configured search spiral as CSV (stdout when no --out)
    Spiral {
        /// Spiral center x (m)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        x: f64,
        /// Spiral center y (m)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        y: f64,
        /// Spiral plane z (m)
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        z: f64,
        /// Output CSV path
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}
