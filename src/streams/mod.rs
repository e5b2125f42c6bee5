mod models;

pub use models::{AlbumStats, ArtistStats, Stream, TrackSkipStats, TrackStats};
