//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{play, TestExport};
//!
//! #[tokio::test]
//! async fn test_seed() {
//!     let export = TestExport::new();
//!     export.write_file("Streaming_History_Audio_2024.json", &[play("Song", "Band", 1000, false)]);
//!     let report = export.seed().await.unwrap();
//!     assert_eq!(report.load.rows_inserted, 1);
//! }
//! ```

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::{play, podcast, TestExport};
