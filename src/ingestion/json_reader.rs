//! Parallel reader for streaming history JSON files.
//!
//! A fixed pool of blocking workers pulls file paths from a shared queue,
//! decodes each file element by element and reports the outcome to a single
//! collector. The first failure (or a cancellation of the caller's token)
//! stops every worker at its next record boundary, and the whole read fails:
//! partial results are never returned.

use super::{discover_json_files, IngestError};
use crate::logging::current_dispatch;
use crate::streams::Stream;
use serde::de::{self, DeserializeSeed, SeqAccess, Visitor};
use std::cell::Cell;
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const READ_BUFFER_SIZE: usize = 32 * 1024;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct JsonReaderSettings {
    /// Maximum number of files decoded at the same time.
    pub workers: usize,
    /// Number of decoded files that can wait for the collector.
    pub channel_capacity: usize,
}

impl Default for JsonReaderSettings {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_WORKERS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub streams_count: usize,
}

/// All the streams read from a set of files.
///
/// The order of `streams` across files is unspecified; records coming from
/// the same file keep their order in the source array.
#[derive(Debug, Default)]
pub struct ParseSummary {
    pub streams: Vec<Stream>,
    pub files: Vec<FileSummary>,
}

struct FileStreams {
    path: PathBuf,
    streams: Vec<Stream>,
}

type FileOutcome = Result<FileStreams, IngestError>;

pub struct JsonReader {
    settings: JsonReaderSettings,
}

impl JsonReader {
    pub fn new(settings: JsonReaderSettings) -> Self {
        Self { settings }
    }

    /// Discovers every JSON file under `folder` and reads them all.
    pub async fn read_streams_from_folder<P: AsRef<Path>>(
        &self,
        folder: P,
        cancellation_token: &CancellationToken,
    ) -> Result<ParseSummary, IngestError> {
        let files = discover_json_files(folder)?;
        self.read_streams_from_files(files, cancellation_token)
            .await
    }

    /// Reads `files` concurrently and merges their streams.
    ///
    /// Returns [`IngestError::Cancelled`] if `cancellation_token` fires before
    /// every file has been read.
    pub async fn read_streams_from_files(
        &self,
        files: Vec<PathBuf>,
        cancellation_token: &CancellationToken,
    ) -> Result<ParseSummary, IngestError> {
        if cancellation_token.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if files.is_empty() {
            info!("No streaming history files to read");
            return Ok(ParseSummary::default());
        }

        let started_at = Instant::now();
        let files_count = files.len();
        let worker_count = self.settings.workers.clamp(1, files_count);
        debug!(
            "Reading {} files with {} workers",
            files_count, worker_count
        );

        // Cancelling the run token stops the workers without touching the
        // caller's token.
        let run_token = cancellation_token.child_token();
        let queue = Arc::new(Mutex::new(VecDeque::from(files)));
        let (sender, mut receiver) =
            mpsc::channel::<FileOutcome>(self.settings.channel_capacity.max(1));
        let dispatch = current_dispatch();

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = queue.clone();
            let sender = sender.clone();
            let token = run_token.clone();
            let dispatch = dispatch.clone();
            workers.spawn_blocking(move || {
                tracing::dispatcher::with_default(&dispatch, || {
                    run_worker(worker_id, &queue, &sender, &token)
                })
            });
        }
        // The channel closes once the last worker is done.
        drop(sender);

        let outcome = collect(&mut receiver, cancellation_token).await;

        run_token.cancel();
        // Workers blocked on a full channel fail their send and exit.
        drop(receiver);
        let panicked = join_workers(&mut workers).await;

        let summary = match (outcome, panicked) {
            (Err(err), _) => {
                warn!("Reading streams failed: {}", err);
                return Err(err);
            }
            (Ok(_), Some(message)) => return Err(IngestError::WorkerPanicked(message)),
            (Ok(summary), None) => summary,
        };

        info!(
            "Completed reading {} streams from {} files in {:?}",
            summary.streams.len(),
            summary.files.len(),
            started_at.elapsed()
        );
        Ok(summary)
    }
}

async fn collect(
    receiver: &mut mpsc::Receiver<FileOutcome>,
    cancellation_token: &CancellationToken,
) -> Result<ParseSummary, IngestError> {
    let mut summary = ParseSummary::default();
    loop {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => return Err(IngestError::Cancelled),
            outcome = receiver.recv() => match outcome {
                Some(Ok(file)) => {
                    debug!(
                        "Processed file {:?} with {} streams",
                        file.path.file_name().unwrap_or_default(),
                        file.streams.len()
                    );
                    summary.files.push(FileSummary {
                        path: file.path,
                        streams_count: file.streams.len(),
                    });
                    summary.streams.extend(file.streams);
                }
                Some(Err(err)) => return Err(err),
                None => return Ok(summary),
            },
        }
    }
}

/// Waits for every worker, returning the message of the first panic if any.
async fn join_workers(workers: &mut JoinSet<()>) -> Option<String> {
    let mut panicked = None;
    while let Some(result) = workers.join_next().await {
        if let Err(err) = result {
            warn!("Reader worker ended abnormally: {}", err);
            if panicked.is_none() {
                panicked = Some(err.to_string());
            }
        }
    }
    panicked
}

fn run_worker(
    worker_id: usize,
    queue: &Mutex<VecDeque<PathBuf>>,
    sender: &mpsc::Sender<FileOutcome>,
    token: &CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            debug!("Reader worker {} stopping, run cancelled", worker_id);
            return;
        }
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(path) = next else {
            return;
        };

        let outcome = read_streams_from_file(path, token);
        let failed = outcome.is_err();
        if sender.blocking_send(outcome).is_err() || failed {
            return;
        }
    }
}

fn read_streams_from_file(path: PathBuf, token: &CancellationToken) -> FileOutcome {
    debug!("Reading file {:?}", path.file_name().unwrap_or_default());
    if token.is_cancelled() {
        return Err(IngestError::Cancelled);
    }

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(source) => return Err(IngestError::Io { path, source }),
    };
    let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

    match decode_stream_array(reader, token) {
        Ok(streams) => Ok(FileStreams { path, streams }),
        Err(DecodeError::Cancelled) => Err(IngestError::Cancelled),
        Err(DecodeError::Json(source)) if source.is_io() => Err(IngestError::Io {
            path,
            source: source.into(),
        }),
        Err(DecodeError::Json(source)) => Err(IngestError::Parse { path, source }),
    }
}

enum DecodeError {
    Cancelled,
    Json(serde_json::Error),
}

/// Decodes a top-level JSON array of streams without building a parse tree
/// for the whole document. `token` is checked before every element.
fn decode_stream_array<R: Read>(
    reader: R,
    token: &CancellationToken,
) -> Result<Vec<Stream>, DecodeError> {
    let mut streams = Vec::new();
    let cancelled = Cell::new(false);
    let mut deserializer = serde_json::Deserializer::from_reader(reader);

    let result = StreamArraySeed {
        out: &mut streams,
        token,
        cancelled: &cancelled,
    }
    .deserialize(&mut deserializer)
    .and_then(|()| deserializer.end());

    match result {
        Ok(()) => Ok(streams),
        Err(_) if cancelled.get() => Err(DecodeError::Cancelled),
        Err(err) => Err(DecodeError::Json(err)),
    }
}

struct StreamArraySeed<'a> {
    out: &'a mut Vec<Stream>,
    token: &'a CancellationToken,
    cancelled: &'a Cell<bool>,
}

impl<'de> DeserializeSeed<'de> for StreamArraySeed<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for StreamArraySeed<'_> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of stream records")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        loop {
            if self.token.is_cancelled() {
                self.cancelled.set(true);
                return Err(de::Error::custom("cancelled"));
            }
            match seq.next_element::<Stream>()? {
                Some(stream) => self.out.push(stream),
                None => return Ok(()),
            }
        }
    }
}
