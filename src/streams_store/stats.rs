//! Read-only aggregate queries over stored streams.

use super::trait_def::ListeningStatsStore;
use super::StoreError;
use crate::streams::{AlbumStats, ArtistStats, TrackSkipStats, TrackStats};
use rusqlite::{params, Connection, OpenFlags, Row};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Number of rows returned by every aggregate query.
pub const STATS_LIMIT: usize = 10;

/// Tracks with fewer plays than this are left out of the skip ranking.
pub const MIN_PLAYS_FOR_SKIP_RATE: i64 = 5;

const TOP_ARTISTS_SQL: &str = "
    SELECT master_metadata_album_artist_name, COUNT(*), SUM(ms_played) AS total
    FROM spotify_streams
    WHERE master_metadata_album_artist_name IS NOT NULL
    GROUP BY master_metadata_album_artist_name
    ORDER BY total DESC, master_metadata_album_artist_name
    LIMIT ?1";

const TOP_TRACKS_SQL: &str = "
    SELECT master_metadata_track_name, master_metadata_album_artist_name,
           COUNT(*), SUM(ms_played) AS total
    FROM spotify_streams
    WHERE master_metadata_track_name IS NOT NULL
    GROUP BY master_metadata_track_name, master_metadata_album_artist_name
    ORDER BY total DESC, master_metadata_track_name, master_metadata_album_artist_name
    LIMIT ?1";

const TOP_ALBUMS_SQL: &str = "
    SELECT master_metadata_album_album_name, master_metadata_album_artist_name,
           COUNT(*) AS plays, SUM(ms_played)
    FROM spotify_streams
    WHERE master_metadata_album_album_name IS NOT NULL
    GROUP BY master_metadata_album_album_name, master_metadata_album_artist_name
    ORDER BY plays DESC, master_metadata_album_album_name, master_metadata_album_artist_name
    LIMIT ?1";

const MOST_SKIPPED_SQL: &str = "
    SELECT master_metadata_track_name, master_metadata_album_artist_name,
           COUNT(*), SUM(skipped) AS skips,
           CAST(SUM(skipped) AS REAL) / COUNT(*)
    FROM spotify_streams
    WHERE master_metadata_track_name IS NOT NULL
    GROUP BY master_metadata_track_name, master_metadata_album_artist_name
    HAVING COUNT(*) >= ?1
    ORDER BY skips DESC, master_metadata_track_name, master_metadata_album_artist_name
    LIMIT ?2";

/// SQLite-backed reader for listening statistics.
pub struct SqliteStatsStore {
    conn: Mutex<Connection>,
}

impl SqliteStatsStore {
    /// Opens an existing database read-only.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;
        debug!("Opened streams database at {:?} (read-only)", db_path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query<T>(
        &self,
        query: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
        map_row: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let to_error = |source: rusqlite::Error| StoreError::Query { query, source };
        let mut stmt = conn.prepare_cached(sql).map_err(to_error)?;
        let rows = stmt
            .query_map(params, map_row)
            .map_err(to_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(to_error)?;
        debug!("{} returned {} rows", query, rows.len());
        Ok(rows)
    }
}

impl ListeningStatsStore for SqliteStatsStore {
    fn get_top_artists_by_play_time(&self) -> Result<Vec<ArtistStats>, StoreError> {
        self.query(
            "top_artists_by_play_time",
            TOP_ARTISTS_SQL,
            params![STATS_LIMIT as i64],
            |row| {
                Ok(ArtistStats {
                    artist: row.get(0)?,
                    play_count: row.get(1)?,
                    total_play_time_ms: row.get(2)?,
                })
            },
        )
    }

    fn get_top_tracks_by_play_time(&self) -> Result<Vec<TrackStats>, StoreError> {
        self.query(
            "top_tracks_by_play_time",
            TOP_TRACKS_SQL,
            params![STATS_LIMIT as i64],
            |row| {
                Ok(TrackStats {
                    track: row.get(0)?,
                    artist: row.get(1)?,
                    play_count: row.get(2)?,
                    total_play_time_ms: row.get(3)?,
                })
            },
        )
    }

    fn get_top_albums_by_play_count(&self) -> Result<Vec<AlbumStats>, StoreError> {
        self.query(
            "top_albums_by_play_count",
            TOP_ALBUMS_SQL,
            params![STATS_LIMIT as i64],
            |row| {
                Ok(AlbumStats {
                    album: row.get(0)?,
                    artist: row.get(1)?,
                    play_count: row.get(2)?,
                    total_play_time_ms: row.get(3)?,
                })
            },
        )
    }

    fn get_most_skipped_tracks(&self) -> Result<Vec<TrackSkipStats>, StoreError> {
        self.query(
            "most_skipped_tracks",
            MOST_SKIPPED_SQL,
            params![MIN_PLAYS_FOR_SKIP_RATE, STATS_LIMIT as i64],
            |row| {
                Ok(TrackSkipStats {
                    track: row.get(0)?,
                    artist: row.get(1)?,
                    play_count: row.get(2)?,
                    skip_count: row.get(3)?,
                    skip_rate: row.get(4)?,
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::testing::make_stream;
    use crate::streams::Stream;
    use crate::streams_store::{LoaderSettings, SqliteStreamsStore, StreamsStore};
    use tempfile::TempDir;

    /// Loads `streams` into a fresh database and opens a reader on it.
    fn create_stats_store(streams: &[Stream]) -> (SqliteStatsStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("streams.db");
        let writer = SqliteStreamsStore::open(&db_path, LoaderSettings::default()).unwrap();
        writer.bulk_insert_streams(streams).unwrap();
        writer.close();
        (SqliteStatsStore::open(&db_path).unwrap(), temp_dir)
    }

    fn play(id: i64, track: &str, artist: &str, ms_played: i64, skipped: bool) -> Stream {
        let mut stream = make_stream(id, artist, ms_played);
        stream.master_metadata_track_name = Some(track.to_string());
        stream.skipped = skipped;
        stream
    }

    fn podcast(id: i64, ms_played: i64) -> Stream {
        let mut stream = make_stream(id, "unused", ms_played);
        stream.master_metadata_track_name = None;
        stream.master_metadata_album_artist_name = None;
        stream.master_metadata_album_album_name = None;
        stream.spotify_track_uri = None;
        stream.episode_name = Some("Episode".to_string());
        stream
    }

    #[test]
    fn test_top_artists_sums_play_time() {
        let (store, _temp_dir) = create_stats_store(&[
            play(1, "a1", "A", 1000, false),
            play(2, "a2", "A", 2000, false),
            play(3, "a1", "A", 2000, false),
            play(4, "b1", "B", 1500, false),
            play(5, "b1", "B", 1500, false),
            podcast(6, 100_000),
        ]);

        let artists = store.get_top_artists_by_play_time().unwrap();
        assert_eq!(
            artists,
            vec![
                ArtistStats {
                    artist: "A".to_string(),
                    play_count: 3,
                    total_play_time_ms: 5000,
                },
                ArtistStats {
                    artist: "B".to_string(),
                    play_count: 2,
                    total_play_time_ms: 3000,
                },
            ]
        );
    }

    #[test]
    fn test_top_artists_limited_to_ten() {
        let streams: Vec<Stream> = (0..15)
            .map(|i| play(i, "t", &format!("Artist {:02}", i), 1000 * (i + 1), false))
            .collect();
        let (store, _temp_dir) = create_stats_store(&streams);

        let artists = store.get_top_artists_by_play_time().unwrap();
        assert_eq!(artists.len(), STATS_LIMIT);
        assert_eq!(artists[0].artist, "Artist 14");
        assert!(artists
            .windows(2)
            .all(|w| w[0].total_play_time_ms >= w[1].total_play_time_ms));
    }

    #[test]
    fn test_top_tracks_grouped_by_track_and_artist() {
        let (store, _temp_dir) = create_stats_store(&[
            play(1, "Intro", "A", 1000, false),
            play(2, "Intro", "B", 4000, false),
            play(3, "Intro", "A", 1000, false),
            podcast(4, 50_000),
        ]);

        let tracks = store.get_top_tracks_by_play_time().unwrap();
        assert_eq!(
            tracks,
            vec![
                TrackStats {
                    track: "Intro".to_string(),
                    artist: Some("B".to_string()),
                    play_count: 1,
                    total_play_time_ms: 4000,
                },
                TrackStats {
                    track: "Intro".to_string(),
                    artist: Some("A".to_string()),
                    play_count: 2,
                    total_play_time_ms: 2000,
                },
            ]
        );
    }

    #[test]
    fn test_top_albums_ordered_by_play_count() {
        let (store, _temp_dir) = create_stats_store(&[
            play(1, "x", "A", 10_000, false),
            play(2, "y", "B", 100, false),
            play(3, "z", "B", 100, false),
        ]);

        let albums = store.get_top_albums_by_play_count().unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].album, "B album");
        assert_eq!(albums[0].play_count, 2);
        assert_eq!(albums[0].total_play_time_ms, 200);
        assert_eq!(albums[1].album, "A album");
    }

    #[test]
    fn test_most_skipped_requires_minimum_plays() {
        let mut streams = Vec::new();
        for i in 0..10 {
            streams.push(play(i, "Often", "A", 1000, i < 6));
        }
        for i in 10..14 {
            streams.push(play(i, "Rarely", "A", 1000, i < 13));
        }
        let (store, _temp_dir) = create_stats_store(&streams);

        let skipped = store.get_most_skipped_tracks().unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].track, "Often");
        assert_eq!(skipped[0].play_count, 10);
        assert_eq!(skipped[0].skip_count, 6);
        assert!((skipped[0].skip_rate - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_most_skipped_keeps_never_skipped_tracks_last() {
        let mut streams: Vec<Stream> = (0..5).map(|i| play(i, "Loved", "A", 1000, false)).collect();
        for i in 5..10 {
            streams.push(play(i, "Meh", "A", 1000, i == 5));
        }
        let (store, _temp_dir) = create_stats_store(&streams);

        let skipped = store.get_most_skipped_tracks().unwrap();
        let ranked: Vec<(&str, i64)> = skipped
            .iter()
            .map(|t| (t.track.as_str(), t.skip_count))
            .collect();
        assert_eq!(ranked, vec![("Meh", 1), ("Loved", 0)]);
        assert_eq!(skipped[1].skip_rate, 0.0);
    }

    #[test]
    fn test_empty_database_returns_no_rows() {
        let (store, _temp_dir) = create_stats_store(&[]);
        assert!(store.get_top_artists_by_play_time().unwrap().is_empty());
        assert!(store.get_top_tracks_by_play_time().unwrap().is_empty());
        assert!(store.get_top_albums_by_play_count().unwrap().is_empty());
        assert!(store.get_most_skipped_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_missing_database_fails_to_open() {
        let temp_dir = TempDir::new().unwrap();
        let result = SqliteStatsStore::open(temp_dir.path().join("nope.db"));
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }

    #[test]
    fn test_query_error_names_query() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("empty.db");
        Connection::open(&db_path)
            .unwrap()
            .execute("CREATE TABLE other (id INTEGER)", [])
            .unwrap();

        let store = SqliteStatsStore::open(&db_path).unwrap();
        let err = store.get_top_albums_by_play_count().unwrap_err();
        assert!(matches!(
            err,
            StoreError::Query {
                query: "top_albums_by_play_count",
                ..
            }
        ));
    }
}
