//! Reading streaming history exports from disk.

mod discovery;
mod error;
mod json_reader;

pub use discovery::{discover_json_files, JSON_EXTENSION};
pub use error::IngestError;
pub use json_reader::{FileSummary, JsonReader, JsonReaderSettings, ParseSummary};
