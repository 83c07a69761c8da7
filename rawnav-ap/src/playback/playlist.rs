//! Playlist directory scanning
//!
//! A scan returns the eligible files of one directory (no recursion),
//! each resolved to a canonical absolute path and sorted
//! case-insensitively by file name.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Whether `path` carries one of `extensions` (lowercase, no dot)
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Hidden entries start with a dot
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Case-insensitive ordering by file name, ties broken by the raw name
pub fn compare_names(a: &Path, b: &Path) -> std::cmp::Ordering {
    let key = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    let (a, b) = (key(a), key(b));
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(&b))
}

/// Scan `dir` for playlist entries
///
/// Hidden entries and directories are skipped. An entry whose canonical
/// path cannot be resolved is skipped with a warning. An unreadable
/// directory is an error for the caller to report.
pub fn scan_directory(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name();
        if is_hidden(&name.to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        if !has_extension(&path, extensions) {
            continue;
        }

        let canonical = match fs::canonicalize(&path) {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!("Skipping {}: cannot resolve path: {}", path.display(), e);
                continue;
            }
        };

        // Follows symlinks, so a link to a directory is excluded too
        if canonical.is_dir() {
            continue;
        }

        entries.push(canonical);
    }

    entries.sort_by(|a, b| compare_names(a, b));
    debug!("Scanned {}: {} playlist entries", dir.display(), entries.len());
    Ok(entries)
}
