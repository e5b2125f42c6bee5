//! Export files written the way Spotify ships them: one top-level JSON
//! array per file, with podcast and music entries mixed.

use super::constants::FIRST_PLAY_TS;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use decibel::config::AppConfig;
use decibel::seeder::{seed, SeedReport};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

static NEXT_PLAY: AtomicI64 = AtomicI64::new(0);

fn next_ts() -> String {
    let start: DateTime<Utc> = FIRST_PLAY_TS.parse().unwrap();
    let offset = NEXT_PLAY.fetch_add(1, Ordering::Relaxed);
    (start + Duration::seconds(offset)).to_rfc3339()
}

fn base_entry(ms_played: i64, skipped: bool) -> Value {
    json!({
        "ts": next_ts(),
        "username": "listener",
        "platform": "Android OS 14 API 34 (Google, Pixel 8)",
        "ms_played": ms_played,
        "conn_country": "IT",
        "ip_addr_decrypted": "192.0.2.1",
        "user_agent_decrypted": "unknown",
        "master_metadata_track_name": null,
        "master_metadata_album_artist_name": null,
        "master_metadata_album_album_name": null,
        "spotify_track_uri": null,
        "episode_name": null,
        "episode_show_name": null,
        "spotify_episode_uri": null,
        "reason_start": "clickrow",
        "reason_end": if skipped { "fwdbtn" } else { "trackdone" },
        "shuffle": false,
        "skipped": skipped,
        "offline": false,
        "offline_timestamp": 0,
        "incognito_mode": false
    })
}

/// A music play of `track` by `artist`.
pub fn play(track: &str, artist: &str, ms_played: i64, skipped: bool) -> Value {
    let mut entry = base_entry(ms_played, skipped);
    entry["master_metadata_track_name"] = json!(track);
    entry["master_metadata_album_artist_name"] = json!(artist);
    entry["master_metadata_album_album_name"] = json!(format!("{} album", artist));
    entry["spotify_track_uri"] = json!(format!("spotify:track:{}", track.replace(' ', "")));
    entry
}

/// A podcast play, with every track metadata field null.
pub fn podcast(episode: &str, ms_played: i64) -> Value {
    let mut entry = base_entry(ms_played, false);
    entry["episode_name"] = json!(episode);
    entry["episode_show_name"] = json!("The Show");
    entry["spotify_episode_uri"] = json!("spotify:episode:0");
    entry
}

/// A temporary export folder plus the database path it gets seeded into.
pub struct TestExport {
    _temp_dir: TempDir,
    pub export_dir: PathBuf,
    pub db_path: PathBuf,
}

impl TestExport {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let export_dir = temp_dir.path().join("export");
        fs::create_dir(&export_dir).unwrap();
        let db_path = temp_dir.path().join("streams.db");
        Self {
            _temp_dir: temp_dir,
            export_dir,
            db_path,
        }
    }

    /// Writes `entries` as a JSON array to `name`, relative to the export
    /// folder. Missing parent folders are created.
    pub fn write_file(&self, name: &str, entries: &[Value]) -> PathBuf {
        self.write_raw(name, &serde_json::to_string(entries).unwrap())
    }

    pub fn write_raw(&self, name: &str, content: &str) -> PathBuf {
        let path = self.export_dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn config(&self) -> AppConfig {
        let mut config = AppConfig::default();
        config.reader.workers = 4;
        config
    }

    pub async fn seed(&self) -> Result<SeedReport> {
        self.seed_with(&self.config(), &CancellationToken::new())
            .await
    }

    pub async fn seed_with(
        &self,
        config: &AppConfig,
        token: &CancellationToken,
    ) -> Result<SeedReport> {
        seed(&self.db_path, &self.export_dir, config, token).await
    }
}
