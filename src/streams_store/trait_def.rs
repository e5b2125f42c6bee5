use super::{LoadSummary, StoreError};
use crate::streams::{AlbumStats, ArtistStats, Stream, TrackSkipStats, TrackStats};

pub trait StreamsStore: Send + Sync {
    /// Creates the streams table if it does not exist yet and checks that an
    /// existing one has the expected shape. Safe to call repeatedly.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Writes all `streams` in parameter-bounded batches, creating the schema
    /// first if needed.
    fn bulk_insert_streams(&self, streams: &[Stream]) -> Result<LoadSummary, StoreError>;

    /// Returns the number of stored streams.
    fn count_streams(&self) -> Result<usize, StoreError>;
}

#[cfg_attr(feature = "mock", mockall::automock)]
pub trait ListeningStatsStore: Send + Sync {
    /// Artists with the most total play time.
    fn get_top_artists_by_play_time(&self) -> Result<Vec<ArtistStats>, StoreError>;

    /// Tracks with the most total play time.
    fn get_top_tracks_by_play_time(&self) -> Result<Vec<TrackStats>, StoreError>;

    /// Albums played the most times.
    fn get_top_albums_by_play_count(&self) -> Result<Vec<AlbumStats>, StoreError>;

    /// Tracks skipped the most, among tracks with enough plays for their
    /// skip rate to mean something. Tracks that were never skipped still
    /// qualify and rank after every skipped one.
    fn get_most_skipped_tracks(&self) -> Result<Vec<TrackSkipStats>, StoreError>;
}
