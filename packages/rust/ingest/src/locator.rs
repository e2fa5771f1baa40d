//! Archive discovery.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, instrument, warn};

use herdbook_shared::{HerdbookError, Result};

/// List the archives in `dir` carrying `extension`, in path order.
///
/// An empty directory yields an empty list. A missing or unreadable
/// directory is a configuration error.
#[instrument(skip_all, fields(dir = %dir.display(), extension))]
pub fn locate_archives(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(HerdbookError::config(format!(
            "archive directory '{}' does not exist or is not a directory",
            dir.display()
        )));
    }
    std::fs::read_dir(dir).map_err(|e| {
        HerdbookError::config(format!(
            "archive directory '{}' is not readable: {e}",
            dir.display()
        ))
    })?;

    let extension = extension.trim_start_matches('.');
    let pattern = format!(
        "{}/*.{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(extension)
    );
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let entries = glob::glob_with(&pattern, options)
        .map_err(|e| HerdbookError::config(format!("invalid archive pattern '{pattern}': {e}")))?;

    let mut archives = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => archives.push(path),
            Ok(path) => debug!(path = %path.display(), "skipping non-file match"),
            Err(e) => warn!(error = %e, "unreadable directory entry, skipping"),
        }
    }
    archives.sort();

    debug!(count = archives.len(), "archives located");
    Ok(archives)
}
