//! Plain-text rendering of listening statistics.

use crate::streams::{AlbumStats, ArtistStats, TrackSkipStats, TrackStats};
use crate::streams_store::{ListeningStatsStore, StoreError};
use std::fmt::Write;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

// ═══════════════════════════════════════════════════════════════════════════════
// Cell Formatting
// ═══════════════════════════════════════════════════════════════════════════════

/// Shortens `s` to at most `max_width` display columns, ending it with
/// "..." when something was cut.
pub fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Renders a play time as whole hours and minutes, e.g. `2h 5m`.
pub fn format_play_time(ms: i64) -> String {
    let total_minutes = ms.max(0) / 60_000;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

pub fn format_skip_rate(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

/// Table with fixed column widths. Cells wider than their column are
/// truncated, narrower ones padded with spaces.
pub struct TableBuilder {
    title: String,
    headers: Vec<String>,
    col_widths: Vec<usize>,
    rows: Vec<Vec<String>>,
}

impl TableBuilder {
    pub fn new(title: &str, columns: &[(&str, usize)]) -> Self {
        TableBuilder {
            title: title.to_string(),
            headers: columns.iter().map(|(h, _)| h.to_string()).collect(),
            col_widths: columns.iter().map(|(_, w)| *w).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn total_width(&self) -> usize {
        self.col_widths.iter().sum::<usize>() + self.col_widths.len().saturating_sub(1)
    }

    fn render_line(&self, out: &mut String, cells: &[String]) {
        let mut line = String::new();
        for (i, width) in self.col_widths.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            let cell = truncate_to_width(cells.get(i).map(String::as_str).unwrap_or(""), *width);
            let padding = width.saturating_sub(cell.width());
            line.push_str(&cell);
            line.push_str(&" ".repeat(padding));
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}:\n", self.title);
        self.render_line(&mut out, &self.headers);
        let _ = writeln!(out, "{}", "-".repeat(self.total_width()));
        if self.rows.is_empty() {
            let _ = writeln!(out, "(no data)");
        }
        for row in &self.rows {
            self.render_line(&mut out, row);
        }
        out
    }
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

pub fn artists_table(artists: &[ArtistStats]) -> TableBuilder {
    let mut table = TableBuilder::new(
        "Top Artists by Play Time",
        &[("Artist", 30), ("Play Count", 12), ("Total Time", 15)],
    );
    for artist in artists {
        table.add_row(vec![
            artist.artist.clone(),
            artist.play_count.to_string(),
            format_play_time(artist.total_play_time_ms),
        ]);
    }
    table
}

pub fn tracks_table(tracks: &[TrackStats]) -> TableBuilder {
    let mut table = TableBuilder::new(
        "Top Tracks by Play Time",
        &[
            ("Track", 40),
            ("Artist", 30),
            ("Play Count", 12),
            ("Total Time", 15),
        ],
    );
    for track in tracks {
        table.add_row(vec![
            track.track.clone(),
            optional(&track.artist),
            track.play_count.to_string(),
            format_play_time(track.total_play_time_ms),
        ]);
    }
    table
}

pub fn albums_table(albums: &[AlbumStats]) -> TableBuilder {
    let mut table = TableBuilder::new(
        "Top Albums by Play Count",
        &[
            ("Album", 40),
            ("Artist", 30),
            ("Play Count", 12),
            ("Total Time", 15),
        ],
    );
    for album in albums {
        table.add_row(vec![
            album.album.clone(),
            optional(&album.artist),
            album.play_count.to_string(),
            format_play_time(album.total_play_time_ms),
        ]);
    }
    table
}

pub fn skipped_tracks_table(tracks: &[TrackSkipStats]) -> TableBuilder {
    let mut table = TableBuilder::new(
        "Most Skipped Tracks",
        &[
            ("Track", 40),
            ("Artist", 30),
            ("Plays", 8),
            ("Skips", 8),
            ("Skip Rate", 10),
        ],
    );
    for track in tracks {
        table.add_row(vec![
            track.track.clone(),
            optional(&track.artist),
            track.play_count.to_string(),
            track.skip_count.to_string(),
            format_skip_rate(track.skip_rate),
        ]);
    }
    table
}

/// The statistics the `stats` command can print.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    Artists,
    Tracks,
    Albums,
    Skipped,
}

/// Runs the query behind `kind` and renders its rows as a table.
pub fn render_stats(
    store: &dyn ListeningStatsStore,
    kind: StatsKind,
) -> Result<String, StoreError> {
    let table = match kind {
        StatsKind::Artists => artists_table(&store.get_top_artists_by_play_time()?),
        StatsKind::Tracks => tracks_table(&store.get_top_tracks_by_play_time()?),
        StatsKind::Albums => albums_table(&store.get_top_albums_by_play_count()?),
        StatsKind::Skipped => skipped_tracks_table(&store.get_most_skipped_tracks()?),
    };
    Ok(table.render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_untouched() {
        assert_eq!(truncate_to_width("Muse", 30), "Muse");
        assert_eq!(truncate_to_width("", 3), "");
    }

    #[test]
    fn test_truncate_long_string() {
        let truncated = truncate_to_width("Godspeed You! Black Emperor", 10);
        assert_eq!(truncated, "Godspee...");
        assert_eq!(truncated.width(), 10);
    }

    #[test]
    fn test_truncate_counts_display_width() {
        // Each of these characters takes two columns.
        let truncated = truncate_to_width("坂本龍一坂本龍一", 9);
        assert_eq!(truncated, "坂本龍...");
        assert!(truncated.width() <= 9);

        // Multibyte but single-width characters are not cut mid-char.
        assert_eq!(truncate_to_width("Sigur Rós Sigur Rós", 12), "Sigur Rós...");
    }

    #[test]
    fn test_format_play_time() {
        assert_eq!(format_play_time(0), "0h 0m");
        assert_eq!(format_play_time(59_999), "0h 0m");
        assert_eq!(format_play_time(5 * 60_000), "0h 5m");
        assert_eq!(format_play_time(125 * 60_000 + 30_000), "2h 5m");
        assert_eq!(format_play_time(-10), "0h 0m");
    }

    #[test]
    fn test_format_skip_rate() {
        assert_eq!(format_skip_rate(0.6), "60.0%");
        assert_eq!(format_skip_rate(1.0 / 3.0), "33.3%");
    }

    #[test]
    fn test_artists_table_layout() {
        let rendered = artists_table(&[ArtistStats {
            artist: "A".to_string(),
            play_count: 3,
            total_play_time_ms: 3_600_000 + 120_000,
        }])
        .render();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[1], "Top Artists by Play Time:");
        assert_eq!(
            lines[3],
            format!("{:<30} {:<12} Total Time", "Artist", "Play Count")
        );
        assert_eq!(lines[4], "-".repeat(59));
        assert_eq!(lines[5], format!("{:<30} {:<12} 1h 2m", "A", "3"));
    }

    #[test]
    fn test_long_names_are_truncated_in_columns() {
        let rendered = tracks_table(&[TrackStats {
            track: "x".repeat(60),
            artist: None,
            play_count: 1,
            total_play_time_ms: 0,
        }])
        .render();
        let row = rendered.lines().last().unwrap();
        assert!(row.starts_with(&format!("{}...", "x".repeat(37))));
        assert!(!row.contains(&"x".repeat(38)));
    }

    #[test]
    fn test_empty_table_says_so() {
        let rendered = skipped_tracks_table(&[]).render();
        assert!(rendered.contains("Most Skipped Tracks:"));
        assert!(rendered.contains("(no data)"));
    }

    #[test]
    fn test_skipped_table_shows_percentage() {
        let rendered = skipped_tracks_table(&[TrackSkipStats {
            track: "Often".to_string(),
            artist: Some("A".to_string()),
            play_count: 10,
            skip_count: 6,
            skip_rate: 0.6,
        }])
        .render();
        assert!(rendered.contains("60.0%"));
    }

    #[cfg(feature = "mock")]
    #[test]
    fn test_render_stats_uses_matching_query() {
        use crate::streams_store::MockListeningStatsStore;

        let mut store = MockListeningStatsStore::new();
        store.expect_get_top_albums_by_play_count().times(1).returning(|| {
            Ok(vec![AlbumStats {
                album: "Kid A".to_string(),
                artist: Some("Radiohead".to_string()),
                play_count: 12,
                total_play_time_ms: 3_000_000,
            }])
        });
        store.expect_get_top_artists_by_play_time().never();

        let rendered = render_stats(&store, StatsKind::Albums).unwrap();
        assert!(rendered.contains("Top Albums by Play Count:"));
        assert!(rendered.contains("Kid A"));
        assert!(rendered.contains("0h 50m"));
    }
}
