//! Error types for configuration loading and watching.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while locating, parsing, or watching the configuration file.
///
/// The caller decides severity: during the initial load a `Parse` or `Invalid`
/// error is fatal, while the hot-reload path logs it and keeps the previous
/// configuration. `NotFound` and `AccessDenied` both mean "skip the overlay"
/// but stay distinguishable for diagnostics.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    /// The configuration file exists but cannot be accessed.
    #[error("config file not accessible: {path}: {source}")]
    AccessDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the file failed after it was located.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON, or a field has the wrong type for the
    /// aggregate. Nothing from the file is applied in either case.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The merged configuration violates an aggregate invariant.
    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },

    /// The filesystem notification subscription could not be established.
    /// Fatal: without it the hot-reload contract cannot be honored.
    #[error("failed to establish config file watch: {source}")]
    Watch {
        #[from]
        source: notify::Error,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
