//! SQLite persistence of streaming history and the listening statistics
//! computed from it.

mod error;
mod schema;
mod stats;
mod store;
mod trait_def;

pub use error::StoreError;
pub use schema::{STREAMS_TABLE, STREAMS_TABLE_NAME};
pub use stats::{SqliteStatsStore, MIN_PLAYS_FOR_SKIP_RATE, STATS_LIMIT};
pub use store::{
    BatchReport, LoadSummary, LoaderSettings, SqliteStreamsStore, DEFAULT_BATCH_SIZE,
    FIELDS_PER_STREAM, PARAMETER_CEILING,
};
pub use trait_def::{ListeningStatsStore, StreamsStore};

#[cfg(feature = "mock")]
pub use trait_def::MockListeningStatsStore;
