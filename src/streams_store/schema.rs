//! SQLite schema of the streams database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table};

pub const STREAMS_TABLE_NAME: &str = "spotify_streams";

/// One row per streamed item. Column order matches the insert parameters.
pub const STREAMS_TABLE: Table = Table {
    name: STREAMS_TABLE_NAME,
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_autoincrement = true
        ),
        sqlite_column!("ts", &SqlType::Timestamp),
        sqlite_column!("username", &SqlType::Text),
        sqlite_column!("platform", &SqlType::Text),
        sqlite_column!("ms_played", &SqlType::Integer),
        sqlite_column!("conn_country", &SqlType::Text),
        sqlite_column!("ip_addr_decrypted", &SqlType::Text),
        sqlite_column!("user_agent_decrypted", &SqlType::Text),
        sqlite_column!("master_metadata_track_name", &SqlType::Text),
        sqlite_column!("master_metadata_album_artist_name", &SqlType::Text),
        sqlite_column!("master_metadata_album_album_name", &SqlType::Text),
        sqlite_column!("spotify_track_uri", &SqlType::Text),
        sqlite_column!("episode_name", &SqlType::Text),
        sqlite_column!("episode_show_name", &SqlType::Text),
        sqlite_column!("spotify_episode_uri", &SqlType::Text),
        sqlite_column!("reason_start", &SqlType::Text),
        sqlite_column!("reason_end", &SqlType::Text),
        sqlite_column!("shuffle", &SqlType::Boolean),
        sqlite_column!("skipped", &SqlType::Boolean),
        sqlite_column!("offline", &SqlType::Boolean),
        sqlite_column!("offline_timestamp", &SqlType::Integer),
        sqlite_column!("incognito_mode", &SqlType::Boolean),
    ],
    indices: &[
        (
            "spotify_streams_artist_index",
            "master_metadata_album_artist_name",
        ),
        ("spotify_streams_track_index", "master_metadata_track_name"),
    ],
};
