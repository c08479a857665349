//! Recordings-directory listing.
//!
//! Only metadata is decoded, so listing a directory of multi-hour
//! recordings stays cheap. Unreadable or corrupt files are skipped with a
//! warning instead of aborting the listing.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::codec;
use crate::types::RecordingSummary;

/// Scans `dir` for persisted recordings and returns their metadata, newest
/// first.
pub fn list_recordings(dir: &Path) -> Vec<RecordingSummary> {
    let mut recordings = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();
        if !(file_name.ends_with(".json") || file_name.ends_with(".json.gz")) {
            continue;
        }

        debug!("Reading recording metadata: {:?}", path);
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping unreadable recording {:?}: {}", path, e);
                continue;
            }
        };

        match codec::decode_metadata_only(&bytes) {
            Ok(metadata) => recordings.push(RecordingSummary {
                file_name,
                file_path: path.to_string_lossy().to_string(),
                file_size_bytes: bytes.len() as u64,
                metadata,
            }),
            Err(e) => warn!("Skipping corrupt recording {:?}: {}", path, e),
        }
    }

    recordings.sort_by(|a, b| b.metadata.start_time.cmp(&a.metadata.start_time));
    recordings
}
