use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn};

use decibel::config::{self, AppConfig};
use decibel::logging::build_dispatch;
use decibel::seeder::seed;
use decibel::stats_output::{render_stats, StatsKind};
use decibel::streams_store::SqliteStatsStore;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|err| err.to_string())?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
#[command(name = "decibel", version, about = "Spotify streaming history analytics")]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Imports every JSON export file found under a directory.
    Seed {
        /// Path to the SQLite database file, created if missing.
        #[clap(long, value_parser = parse_path)]
        db: PathBuf,

        /// Directory containing the streaming history JSON files.
        #[clap(long, value_parser = parse_dir)]
        dir: PathBuf,

        /// Cancel reading the files after this many seconds.
        #[clap(long)]
        timeout_secs: Option<u64>,

        /// Enable verbose logging.
        #[clap(short, long)]
        verbose: bool,
    },

    /// Prints listening statistics.
    Stats {
        #[command(subcommand)]
        kind: StatsCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum StatsCommand {
    /// Top artists by play time.
    Artists(StatsArgs),
    /// Top tracks by play time.
    Tracks(StatsArgs),
    /// Top albums by play count.
    Albums(StatsArgs),
    /// Tracks skipped the most.
    Skipped(StatsArgs),
}

#[derive(clap::Args, Debug, Clone)]
struct StatsArgs {
    /// Path to the SQLite database file.
    #[clap(long, value_parser = parse_path)]
    db: PathBuf,

    /// Enable verbose logging.
    #[clap(short, long)]
    verbose: bool,
}

impl StatsCommand {
    fn kind(&self) -> StatsKind {
        match self {
            StatsCommand::Artists(_) => StatsKind::Artists,
            StatsCommand::Tracks(_) => StatsKind::Tracks,
            StatsCommand::Albums(_) => StatsKind::Albums,
            StatsCommand::Skipped(_) => StatsKind::Skipped,
        }
    }

    fn args(&self) -> &StatsArgs {
        match self {
            StatsCommand::Artists(args)
            | StatsCommand::Tracks(args)
            | StatsCommand::Albums(args)
            | StatsCommand::Skipped(args) => args,
        }
    }
}

/// Convert CLI args to CliConfig for config resolution
impl From<&Command> for config::CliConfig {
    fn from(command: &Command) -> Self {
        match command {
            Command::Seed {
                timeout_secs,
                verbose,
                ..
            } => config::CliConfig {
                verbose: *verbose,
                timeout_secs: *timeout_secs,
            },
            Command::Stats { kind } => config::CliConfig {
                verbose: kind.args().verbose,
                timeout_secs: None,
            },
        }
    }
}

/// Cancels `token` on Ctrl+C or once `timeout` has elapsed.
fn spawn_cancel_watcher(token: CancellationToken, timeout: Option<Duration>) {
    tokio::spawn(
        async move {
            let deadline = async {
                match timeout {
                    Some(timeout) => tokio::time::sleep(timeout).await,
                    None => std::future::pending::<()>().await,
                }
            };
            tokio::select! {
                _ = token.cancelled() => return,
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => warn!("Interrupted, cancelling import"),
                    Err(err) => {
                        warn!("Failed to listen for Ctrl+C: {}", err);
                        return;
                    }
                },
                _ = deadline => warn!("Timed out after {:?}, cancelling import", timeout),
            }
            token.cancel();
        }
        .with_current_subscriber(),
    );
}

async fn run_seed(db: PathBuf, dir: PathBuf, app_config: AppConfig) -> Result<()> {
    let token = CancellationToken::new();
    spawn_cancel_watcher(token.clone(), app_config.timeout);

    let result = seed(&db, &dir, &app_config, &token).await;
    // Stops the watcher.
    token.cancel();

    let report = result?;
    info!(
        "Imported {} streams from {} files ({} insert statements)",
        report.load.rows_inserted,
        report.files_read,
        report.load.batches.len()
    );
    Ok(())
}

fn run_stats(db: &Path, kind: StatsKind) -> Result<()> {
    debug!("Connecting to database {:?}", db);
    let store = SqliteStatsStore::open(db)?;
    let rendered = render_stats(&store, kind)
        .with_context(|| format!("Failed to compute {:?} statistics", kind))?;
    print!("{}", rendered);
    Ok(())
}

async fn run(cli_args: CliArgs) -> Result<()> {
    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => Some(config::FileConfig::load(path)?),
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args.command).into();
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    // Every command logs through its own dispatch, nothing is installed
    // process-wide.
    let dispatch = build_dispatch(app_config.log_level);
    match cli_args.command {
        Command::Seed { db, dir, .. } => {
            run_seed(db, dir, app_config)
                .with_subscriber(dispatch)
                .await
        }
        Command::Stats { kind } => tracing::dispatcher::with_default(&dispatch, || {
            run_stats(&kind.args().db, kind.kind())
        }),
    }
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();
    if let Err(err) = run(cli_args).await {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
