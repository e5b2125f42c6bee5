use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub log_level: Option<String>,
    pub timeout_secs: Option<u64>,

    pub ingest: Option<IngestConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct IngestConfig {
    /// Number of files parsed concurrently.
    pub workers: Option<usize>,
    /// Streams per INSERT statement.
    pub batch_size: Option<usize>,
    /// Parsed files buffered between the workers and the collector.
    pub channel_capacity: Option<usize>,
    pub single_transaction: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
