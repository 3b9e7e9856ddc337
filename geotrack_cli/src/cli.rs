//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "geotrack", version, about = "Tracking profile scheduler CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/geotrack.toml")]
    pub config: PathBuf,

    /// Optional profile CSV import, merged after the TOML profiles (strict header)
    #[arg(long, value_name = "FILE")]
    pub profiles_csv: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a recorded device-event trace deterministically
    Replay {
        /// Trace file: one JSON event per line
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
    },
    /// Read device events from stdin and schedule in real time until Ctrl-C
    Follow,
    /// List enabled profiles in evaluation order
    Profiles,
    /// Validate the config (and CSV import, if given) without running
    SelfCheck,
}
