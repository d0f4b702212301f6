use std::path::PathBuf;

use clap::Parser;
use pmtrack::config::LogFormat;

use crate::cmd::Commands;

/// Implementation tracking and customer health from the command line.
/// Storage defaults to ~/.pmtrack/store.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "pmtrack", version, about = "Task status, Gantt layout and weekly health reports")]
pub struct Cli {
    /// Path to the JSON record store.
    #[arg(long, global = true, env = "PMTRACK_DB")]
    pub db: Option<PathBuf>,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, env = "PMTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, env = "PMTRACK_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}
