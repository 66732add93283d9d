//! Error taxonomy for the pipeline core.
//!
//! Expected business outcomes are data, not errors: a unit failing its own
//! content validation is recorded on the event, and a candidate failing the
//! promotion gate comes back as a rejection outcome. Only programmer-usage
//! mistakes and storage failures surface here.

use std::path::PathBuf;

use thiserror::Error;

/// Core errors raised by the recorder, storage, and gate paths.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("telemetry recorder used before start()")]
    NotStarted,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CoreError {
    /// Attach a path to an I/O failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach a path to a parse failure.
    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
