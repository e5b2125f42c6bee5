use super::IngestError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Extension of the files produced by the streaming history export.
pub const JSON_EXTENSION: &str = "json";

/// Walks `root` recursively and returns every regular file with a `.json`
/// extension.
///
/// Entries are visited sorted by file name, so the result is stable for a
/// given directory listing.
pub fn discover_json_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, IngestError> {
    let root = root.as_ref();
    let metadata = std::fs::metadata(root).map_err(|source| IngestError::Discovery {
        path: root.to_path_buf(),
        source,
    })?;
    if !metadata.is_dir() {
        return Err(IngestError::Discovery {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let mut json_files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|err| IngestError::Discovery {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_json = entry
            .path()
            .extension()
            .map(|ext| ext == JSON_EXTENSION)
            .unwrap_or(false);
        if is_json {
            json_files.push(entry.into_path());
        }
    }

    debug!(
        "Found {} JSON files to process under {:?}",
        json_files.len(),
        root
    );
    Ok(json_files)
}
