//! Error type shared by the library modules.
//!
//! The pure engines (status, layout, weekly) never fail. Errors only come from
//! state transitions on columns a table was not built with, from the JSON
//! record store and from configuration parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for pmtrack operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A filter or sort targeted a column the table state was not built with.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A date string supplied where a date was required could not be parsed.
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A filter specification could not be parsed.
    #[error("invalid filter '{0}': expected COLUMN=VALUE[,VALUE...]")]
    InvalidFilter(String),

    /// A sort specification could not be parsed.
    #[error("invalid sort '{0}': expected COLUMN[:asc|desc]")]
    InvalidSort(String),

    /// A task identifier did not resolve in the record store.
    #[error("task '{0}' not found")]
    UnknownTask(String),

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record store contents could not be (de)serialised.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The configuration file was malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for pmtrack operations.
pub type Result<T> = std::result::Result<T, Error>;
