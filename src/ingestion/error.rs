use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while discovering and parsing export files.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to traverse {path:?}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Reading streams was cancelled")]
    Cancelled,

    #[error("A reader worker panicked: {0}")]
    WorkerPanicked(String),
}

impl IngestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, IngestError::Cancelled)
    }

    /// The file the error is attributed to, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            IngestError::Discovery { path, .. }
            | IngestError::Io { path, .. }
            | IngestError::Parse { path, .. } => Some(path),
            IngestError::Cancelled | IngestError::WorkerPanicked(_) => None,
        }
    }
}
