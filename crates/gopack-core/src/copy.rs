//! Recursive directory copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{GopackError, Result};

/// Copy the tree rooted at `from` so that it becomes `into/<basename of from>`.
///
/// Without `overwrite`, any file that already exists at the destination
/// fails the copy with [`GopackError::DestinationExists`] before anything
/// is written. Symlinks and other special files are skipped. Returns the
/// copied root.
pub fn copy_tree(from: &Path, into: &Path, overwrite: bool) -> Result<PathBuf> {
    let base = from.file_name().ok_or_else(|| {
        GopackError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cannot copy {from:?}: no directory name"),
        ))
    })?;
    let dest_root = into.join(base);

    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in WalkDir::new(from).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| GopackError::Io(e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .unwrap_or_else(|_| entry.path());
        let target = dest_root.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            dirs.push(target);
        } else if file_type.is_file() {
            if !overwrite && target.exists() {
                return Err(GopackError::DestinationExists(target));
            }
            files.push((entry.into_path(), target));
        } else {
            warn!(path = ?entry.path(), "skipping special file");
        }
    }

    for dir in &dirs {
        fs::create_dir_all(dir)?;
    }
    for (source, target) in &files {
        fs::copy(source, target)?;
    }

    debug!(from = ?from, to = ?dest_root, files = files.len(), "copied tree");
    Ok(dest_root)
}
