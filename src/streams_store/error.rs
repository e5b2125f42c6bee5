use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the streams database.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open database {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to prepare table {table}: {source:#}")]
    Schema {
        table: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A batch insert failed. `start..end` are the indices of the streams in
    /// the failed batch; batches before it may already be committed.
    #[error("Failed to insert streams {start}..{end}: {source}")]
    Batch {
        start: usize,
        end: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to {action} import transaction: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query {query} failed: {source}")]
    Query {
        query: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}
