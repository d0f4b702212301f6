//! # pmtrack
//!
//! Command-line front end for the implementation-tracking engines: derived
//! task status, filterable task tables, the hierarchical Gantt layout and the
//! weekly customer health reports.
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a root task and a subtask
//! pmtrack add "Site survey" --step onboarding --planned-start 2024-06-03 --planned-end 2024-06-07
//! pmtrack add "Camera audit" --parent <root-id> --planned-end 2024-06-05
//!
//! # Tasks that are overdue, latest deadline first
//! pmtrack list --filter "status=Overdue - Not Complete on Time" --sort planned-end:desc
//!
//! # Gantt hierarchy
//! pmtrack list --tree
//!
//! # Weekly health
//! pmtrack weeks
//! pmtrack health
//! pmtrack trend acme logins
//! ```
//!
//! Data lives in `~/.pmtrack/store.json` unless `--db` says otherwise.
//! Set `RUST_LOG` to change log verbosity.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pmtrack::config::{Config, LogFormat};

mod cli;
mod cmd;

use cli::Cli;

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmtrack=info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(cli.log_format.unwrap_or(config.log_format));

    let db_path = config.db_path(cli.db.as_deref());
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data directory {}", dir.display()))?;
    }

    cmd::run(cli.command, &config, &db_path)
}
