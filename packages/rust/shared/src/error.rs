//! Error types for remotedocs.
//!
//! Library crates use [`RemoteDocsError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all remotedocs operations.
///
/// Every variant is build-fatal; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RemoteDocsError {
    /// Configuration loading or source validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success response for one document.
    #[error("fetch error: source '{source_name}', document '{document}': {message}")]
    Fetch {
        source_name: String,
        document: String,
        message: String,
    },

    /// A compatibility rewrite could not be applied to a document.
    #[error("transform error: {filename}: {message}")]
    Transform { filename: String, message: String },

    /// Filesystem I/O error (reading config, writing the site tree).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RemoteDocsError>;

impl RemoteDocsError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error for a single document of a source.
    pub fn fetch(
        source_name: impl Into<String>,
        document: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            document: document.into(),
            message: msg.into(),
        }
    }

    /// Create a transform error for the given file.
    pub fn transform(filename: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Transform {
            filename: filename.into(),
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

    /// Pipeline stage the error belongs to, for operator-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Fetch { .. } => "fetch",
            Self::Transform { .. } => "transform",
            Self::Io { .. } => "write",
        }
    }
}
