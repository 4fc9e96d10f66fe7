use std::io;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};
use walkdir::WalkDir;

use crate::error::Error;
use crate::storage::INFRA_DIR;

/// Validate that `root` exists and is a directory.
pub fn ensure_root(root: &Path) -> Result<(), Error> {
    if !root.exists() {
        return Err(Error::NotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Immediate subdirectories of the migration root, sorted by name.
///
/// The `.freight` infrastructure directory and hidden directories are never
/// candidates. Failing to read the root itself is fatal; an unreadable entry
/// below it is logged and skipped.
pub fn list_candidate_dirs(root: &Path) -> Result<Vec<PathBuf>, Error> {
    ensure_root(root)?;

    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                let kind = err.io_error().map(|e| e.kind()).unwrap_or(io::ErrorKind::Other);
                return Err(io::Error::new(
                    kind,
                    format!("Error reading directory {}: {}", root.display(), err),
                )
                .into());
            }
            Err(err) => {
                warn!("Skipping unreadable entry in {}: {}", root.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == INFRA_DIR || name.starts_with('.') {
            trace!("Ignoring infrastructure directory {}", entry.path().display());
            continue;
        }
        dirs.push(entry.into_path());
    }

    Ok(dirs)
}

/// Names of the directories directly inside `dir` (one level, unsorted).
pub fn list_child_dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            Err(err) if err.depth() == 0 => {
                let kind = err.io_error().map(|e| e.kind()).unwrap_or(io::ErrorKind::Other);
                return Err(io::Error::new(kind, err.to_string()));
            }
            // Dangling symlinks and the like are not directories.
            Err(_) => {}
        }
    }
    Ok(names)
}
