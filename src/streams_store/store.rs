//! Bulk loader for the streams database.

use super::schema::STREAMS_TABLE;
use super::trait_def::StreamsStore;
use super::StoreError;
use crate::streams::Stream;
use rusqlite::limits::Limit;
use rusqlite::{Connection, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Maximum number of bound parameters SQLite accepts in one statement.
pub const PARAMETER_CEILING: usize = 999;

/// Number of parameters bound for each inserted stream.
pub const FIELDS_PER_STREAM: usize = 21;

/// 45 rows * 21 fields = 945 parameters, safely under the ceiling.
pub const DEFAULT_BATCH_SIZE: usize = 45;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    /// Number of streams written by each INSERT statement.
    pub batch_size: usize,
    /// Wrap the whole import in a single transaction, so that a failed batch
    /// also rolls back the batches before it.
    pub single_transaction: bool,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            single_transaction: false,
        }
    }
}

impl LoaderSettings {
    /// Largest batch whose parameters fit under [`PARAMETER_CEILING`].
    pub const fn max_batch_size() -> usize {
        PARAMETER_CEILING / FIELDS_PER_STREAM
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.batch_size > Self::max_batch_size() {
            anyhow::bail!(
                "batch_size {} needs {} parameters per statement, the limit is {} (max batch_size {})",
                self.batch_size,
                self.batch_size * FIELDS_PER_STREAM,
                PARAMETER_CEILING,
                Self::max_batch_size()
            );
        }
        Ok(())
    }
}

/// One INSERT statement issued by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Index of the first stream of the batch.
    pub start: usize,
    /// One past the index of the last stream of the batch.
    pub end: usize,
    /// Number of parameters bound to the statement.
    pub parameters: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows_inserted: usize,
    pub batches: Vec<BatchReport>,
}

/// SQLite-backed writer for streams.
pub struct SqliteStreamsStore {
    conn: Mutex<Connection>,
    settings: LoaderSettings,
}

impl SqliteStreamsStore {
    /// Opens (or creates) the database at `db_path` for writing.
    pub fn open<P: AsRef<Path>>(db_path: P, settings: LoaderSettings) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

        // Any statement binding more parameters than the ceiling fails to
        // prepare instead of silently relying on the compiled-in default.
        conn.set_limit(Limit::SQLITE_LIMIT_VARIABLE_NUMBER, PARAMETER_CEILING as i32)
            .map_err(|source| StoreError::Open {
                path: db_path.to_path_buf(),
                source,
            })?;

        debug!("Opened streams database at {:?}", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
            settings,
        })
    }

    /// Closes the connection, logging instead of returning close failures.
    pub fn close(self) {
        let conn = self
            .conn
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if let Err((_, err)) = conn.close() {
            warn!("Failed to close streams database: {}", err);
        }
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn create_streams_schema(conn: &Connection) -> Result<(), StoreError> {
    let schema_error = |source: anyhow::Error| StoreError::Schema {
        table: STREAMS_TABLE.name,
        source,
    };
    STREAMS_TABLE.create_if_not_exists(conn).map_err(schema_error)?;
    STREAMS_TABLE.validate(conn).map_err(schema_error)?;
    STREAMS_TABLE
        .create_indices_if_not_exist(conn)
        .map_err(schema_error)?;
    Ok(())
}

/// Builds a multi-row INSERT for `rows` streams.
fn batch_insert_sql(rows: usize) -> String {
    let columns: Vec<&str> = STREAMS_TABLE.insertable_columns().collect();
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {} ({}) VALUES {}",
        STREAMS_TABLE.name,
        columns.join(", "),
        vec![placeholders.as_str(); rows].join(", ")
    )
}

/// Parameters for one stream, in table column order.
fn stream_params(stream: &Stream) -> [&dyn ToSql; FIELDS_PER_STREAM] {
    [
        &stream.ts,
        &stream.username,
        &stream.platform,
        &stream.ms_played,
        &stream.conn_country,
        &stream.ip_addr_decrypted,
        &stream.user_agent_decrypted,
        &stream.master_metadata_track_name,
        &stream.master_metadata_album_artist_name,
        &stream.master_metadata_album_album_name,
        &stream.spotify_track_uri,
        &stream.episode_name,
        &stream.episode_show_name,
        &stream.spotify_episode_uri,
        &stream.reason_start,
        &stream.reason_end,
        &stream.shuffle,
        &stream.skipped,
        &stream.offline,
        &stream.offline_timestamp,
        &stream.incognito_mode,
    ]
}

/// Writes one batch with a single statement and returns the number of
/// parameters it bound.
fn insert_batch(conn: &Connection, batch: &[Stream]) -> rusqlite::Result<usize> {
    let mut args: Vec<&dyn ToSql> = Vec::with_capacity(batch.len() * FIELDS_PER_STREAM);
    for stream in batch {
        args.extend(stream_params(stream));
    }
    // Every full batch shares the same statement text.
    let mut stmt = conn.prepare_cached(&batch_insert_sql(batch.len()))?;
    stmt.execute(args.as_slice())?;
    Ok(args.len())
}

fn insert_batches(
    conn: &Connection,
    streams: &[Stream],
    batch_size: usize,
) -> Result<LoadSummary, StoreError> {
    let mut summary = LoadSummary::default();
    for (batch_index, batch) in streams.chunks(batch_size).enumerate() {
        let start = batch_index * batch_size;
        let end = start + batch.len();
        let parameters =
            insert_batch(conn, batch).map_err(|source| StoreError::Batch { start, end, source })?;
        debug!(
            "Inserted streams {}..{} ({} parameters)",
            start, end, parameters
        );
        summary.rows_inserted += batch.len();
        summary.batches.push(BatchReport {
            start,
            end,
            parameters,
        });
    }
    Ok(summary)
}

impl StreamsStore for SqliteStreamsStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        create_streams_schema(&self.lock_conn())
    }

    fn bulk_insert_streams(&self, streams: &[Stream]) -> Result<LoadSummary, StoreError> {
        let mut conn = self.lock_conn();
        create_streams_schema(&conn)?;

        let batch_size = self.settings.batch_size.max(1);
        info!(
            "Inserting {} streams in batches of {}",
            streams.len(),
            batch_size
        );

        let summary = if self.settings.single_transaction {
            let tx = conn.transaction().map_err(|source| StoreError::Transaction {
                action: "begin",
                source,
            })?;
            // Dropping `tx` on error rolls every batch back.
            let summary = insert_batches(&tx, streams, batch_size)?;
            tx.commit().map_err(|source| StoreError::Transaction {
                action: "commit",
                source,
            })?;
            summary
        } else {
            insert_batches(&conn, streams, batch_size)?
        };

        info!(
            "Inserted {} streams with {} statements",
            summary.rows_inserted,
            summary.batches.len()
        );
        Ok(summary)
    }

    fn count_streams(&self) -> Result<usize, StoreError> {
        let conn = self.lock_conn();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", STREAMS_TABLE.name),
            [],
            |row| row.get(0),
        )
        .map_err(|source| StoreError::Query {
            query: "count_streams",
            source,
        })
    }
}
