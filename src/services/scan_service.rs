use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::models::file_record::FileRecord;
use crate::scope_path;

/// Lists the immediate entries of `source` as pending records, ordered by path.
pub fn scan(source: &Path) -> Result<Vec<FileRecord>, AppError> {
    if !source.is_dir() {
        return Err(AppError::SourceNotFound(source.display().to_string()));
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry: {e}");
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %entry.path().display(), "skipping entry without metadata: {e}");
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        let extension = if metadata.is_dir() {
            None
        } else {
            entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_string())
        };

        records.push(FileRecord::new(
            scope_path::normalize_path(entry.path()),
            name,
            extension,
            if metadata.is_dir() { 0 } else { metadata.len() },
            metadata
                .modified()
                .ok()
                .map(chrono::DateTime::<chrono::Utc>::from),
            metadata.is_dir(),
        ));
    }

    records.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(count = records.len(), "scanned source folder");
    Ok(records)
}
