//! Shared constants for end-to-end tests

/// Artist with 3 plays totalling 5000 ms in the two-file fixture.
pub const ARTIST_A: &str = "A";

/// Artist with 2 plays totalling 3000 ms in the two-file fixture.
pub const ARTIST_B: &str = "B";

/// Timestamp of the first generated play, later plays are one second apart.
pub const FIRST_PLAY_TS: &str = "2024-01-01T00:00:00Z";
