//! The `seed` pipeline: read every export file under a folder and load the
//! streams into the database.

use crate::config::AppConfig;
use crate::ingestion::JsonReader;
use crate::logging::current_dispatch;
use crate::streams::Stream;
use crate::streams_store::{LoadSummary, SqliteStreamsStore, StreamsStore};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub files_read: usize,
    pub streams_read: usize,
    pub load: LoadSummary,
}

/// Reads all streams under `source_dir` and appends them to the database at
/// `db_path`, creating it if needed.
///
/// Cancelling `cancellation_token` aborts the read phase; nothing is written
/// in that case. Once loading has started it runs to completion or to the
/// first failed batch.
pub async fn seed(
    db_path: &Path,
    source_dir: &Path,
    config: &AppConfig,
    cancellation_token: &CancellationToken,
) -> Result<SeedReport> {
    let started_at = Instant::now();
    info!("Reading streaming history from {:?}", source_dir);

    let reader = JsonReader::new(config.reader.clone());
    let parsed = reader
        .read_streams_from_folder(source_dir, cancellation_token)
        .await
        .with_context(|| format!("Failed to read streams from {:?}", source_dir))?;
    let files_read = parsed.files.len();
    let streams_read = parsed.streams.len();

    let load = load_streams(db_path.to_path_buf(), config, parsed.streams).await?;

    info!(
        "Seeded {} streams from {} files into {:?} in {:?}",
        load.rows_inserted,
        files_read,
        db_path,
        started_at.elapsed()
    );
    Ok(SeedReport {
        files_read,
        streams_read,
        load,
    })
}

/// Runs the blocking SQLite writer off the async workers, keeping the
/// caller's log dispatch.
async fn load_streams(
    db_path: PathBuf,
    config: &AppConfig,
    streams: Vec<Stream>,
) -> Result<LoadSummary> {
    let settings = config.loader.clone();
    let dispatch = current_dispatch();
    let context_path = db_path.clone();

    let result = tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || {
            let store = SqliteStreamsStore::open(&db_path, settings)?;
            let result = store.bulk_insert_streams(&streams);
            store.close();
            result
        })
    })
    .await
    .context("Streams loader task failed")?;

    result.with_context(|| format!("Failed to load streams into {:?}", context_path))
}
