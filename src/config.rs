//! TOML configuration.
//!
//! The config file lives at `~/.pmtrack/config.toml` unless `--config` (or
//! `PMTRACK_CONFIG`) points elsewhere. Every field is optional; command-line
//! flags override whatever the file says.
//!
//! ```toml
//! db = "/srv/pmtrack/store.json"
//! log_format = "json"
//! session = "ops-team"
//! trend_window = 8
//!
//! [flags]
//! gantt = 50   # "on", "off" or a rollout percentage
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flags::{FlagSetting, SessionFlags};
use crate::weekly::TREND_WINDOW;

/// Output format of log events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// The `[flags]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagsConfig {
    #[serde(default)]
    pub gantt: FlagSetting,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub db: Option<PathBuf>,
    #[serde(default)]
    pub log_format: LogFormat,
    pub session: Option<String>,
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    #[serde(default)]
    pub flags: FlagsConfig,
}

fn default_trend_window() -> usize {
    TREND_WINDOW
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db: None,
            log_format: LogFormat::default(),
            session: None,
            trend_window: TREND_WINDOW,
            flags: FlagsConfig::default(),
        }
    }
}

/// `~/.pmtrack`, or `./.pmtrack` when `HOME` is unset.
pub fn default_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".pmtrack")
}

impl Config {
    /// Parse a config document.
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from an explicit path, which must exist, or from the default
    /// location, which may be absent.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = default_dir().join("config.toml");
                if !p.exists() {
                    return Ok(Config::default());
                }
                p
            }
        };
        let buf = fs::read_to_string(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
        Self::from_toml(&buf)
    }

    /// Store path: the override if given, else the configured path, else the default.
    pub fn db_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.db.clone())
            .unwrap_or_else(|| default_dir().join("store.json"))
    }

    /// Identifier used to bucket this session into flag rollouts.
    pub fn session_id(&self) -> String {
        self.session
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    /// Resolve feature flags for this session.
    pub fn flags(&self) -> SessionFlags {
        SessionFlags::resolve(&self.session_id(), self.flags.gantt)
    }
}
