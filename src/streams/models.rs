//! Data models for streaming history records and their aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One entry of a Spotify Extended Streaming History export.
///
/// Nullable fields are `Option`s: a JSON `null` or a missing key both decode
/// to `None`, which is persisted as SQL `NULL` and never as an empty string.
///
/// The remaining scalar fields must be present, but a JSON `null` in them
/// decodes to the zero value (`""`, `0`, `false`). `ts` must be a timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stream {
    pub ts: DateTime<Utc>,
    #[serde(deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(deserialize_with = "null_as_default")]
    pub platform: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ms_played: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub conn_country: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ip_addr_decrypted: String,
    #[serde(deserialize_with = "null_as_default")]
    pub user_agent_decrypted: String,
    // Track metadata, null for podcast plays
    pub master_metadata_track_name: Option<String>,
    pub master_metadata_album_artist_name: Option<String>,
    pub master_metadata_album_album_name: Option<String>,
    pub spotify_track_uri: Option<String>,
    // Podcast metadata, null for music plays
    pub episode_name: Option<String>,
    pub episode_show_name: Option<String>,
    pub spotify_episode_uri: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub reason_start: String,
    #[serde(deserialize_with = "null_as_default")]
    pub reason_end: String,
    #[serde(deserialize_with = "null_as_default")]
    pub shuffle: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub skipped: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub offline: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub offline_timestamp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub incognito_mode: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Total listening per artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistStats {
    pub artist: String,
    pub play_count: i64,
    pub total_play_time_ms: i64,
}

/// Total listening per (track, artist) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackStats {
    pub track: String,
    pub artist: Option<String>,
    pub play_count: i64,
    pub total_play_time_ms: i64,
}

/// Total listening per (album, artist) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumStats {
    pub album: String,
    pub artist: Option<String>,
    pub play_count: i64,
    pub total_play_time_ms: i64,
}

/// Skip behaviour for a (track, artist) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSkipStats {
    pub track: String,
    pub artist: Option<String>,
    pub play_count: i64,
    pub skip_count: i64,
    /// Skipped plays divided by total plays, in `0.0..=1.0`.
    pub skip_rate: f64,
}
