//! Decibel Library
//!
//! Imports Spotify extended streaming history exports into SQLite and
//! computes listening statistics from them. The modules are exposed for the
//! `decibel` binary and for integration tests.

pub mod config;
pub mod ingestion;
pub mod logging;
pub mod seeder;
pub mod sqlite_persistence;
pub mod stats_output;
pub mod streams;
pub mod streams_store;

// Re-export commonly used types for convenience
pub use ingestion::{IngestError, JsonReader};
pub use seeder::{seed, SeedReport};
pub use streams::Stream;
pub use streams_store::{SqliteStatsStore, SqliteStreamsStore, StoreError};
