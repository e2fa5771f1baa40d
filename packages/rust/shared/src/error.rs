//! Error types for herdbook.
//!
//! Library crates use [`HerdbookError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Missing query parameters and empty results are not errors; they are
//! ordinary query outcomes and never travel through this type.

use std::path::PathBuf;

/// Top-level error type for all herdbook operations.
#[derive(Debug, thiserror::Error)]
pub enum HerdbookError {
    /// Configuration loading or validation error. Fatal to the request.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// One registry archive could not be read. The loader recovers from
    /// this by skipping the archive.
    #[error("archive {path:?} rejected: {message}")]
    Archive { path: PathBuf, message: String },

    /// Delimited-text parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (duplicate keys, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HerdbookError>;

impl HerdbookError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an archive error for the archive at `path`.
    pub fn archive(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is fatal to the whole request.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Archive { .. })
    }
}
