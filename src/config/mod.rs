mod file_config;

pub use file_config::{FileConfig, IngestConfig};

use crate::ingestion::JsonReaderSettings;
use crate::streams_store::LoaderSettings;
use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub verbose: bool,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Default level for log events, `LOG_LEVEL` still takes precedence.
    pub log_level: LevelFilter,
    /// Parsing is cancelled once this much time has passed.
    pub timeout: Option<Duration>,
    pub reader: JsonReaderSettings,
    pub loader: LoaderSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            timeout: None,
            reader: JsonReaderSettings::default(),
            loader: LoaderSettings::default(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present, except `--verbose`
    /// which always forces debug logging.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let defaults = AppConfig::default();

        let log_level = if cli.verbose {
            LevelFilter::DEBUG
        } else {
            match file.log_level {
                Some(level) => level
                    .parse::<LevelFilter>()
                    .with_context(|| format!("Invalid log_level: {:?}", level))?,
                None => defaults.log_level,
            }
        };

        let timeout_secs = file.timeout_secs.or(cli.timeout_secs);
        if timeout_secs == Some(0) {
            bail!("timeout_secs must be greater than 0");
        }

        let ingest = file.ingest.unwrap_or_default();
        let reader = JsonReaderSettings {
            workers: ingest.workers.unwrap_or(defaults.reader.workers),
            channel_capacity: ingest
                .channel_capacity
                .unwrap_or(defaults.reader.channel_capacity),
        };
        if reader.workers == 0 {
            bail!("ingest.workers must be at least 1");
        }
        if reader.channel_capacity == 0 {
            bail!("ingest.channel_capacity must be at least 1");
        }

        let loader = LoaderSettings {
            batch_size: ingest.batch_size.unwrap_or(defaults.loader.batch_size),
            single_transaction: ingest
                .single_transaction
                .unwrap_or(defaults.loader.single_transaction),
        };
        loader.validate().context("Invalid ingest.batch_size")?;

        Ok(Self {
            log_level,
            timeout: timeout_secs.map(Duration::from_secs),
            reader,
            loader,
        })
    }
}
