//! Non-destructive theme copying.
//!
//! Build output is additive: a theme (or plugin tree) is mirrored into the
//! domain root, but a file that already exists at the destination is never
//! replaced. Re-running a build therefore keeps manual edits and files
//! rewritten by an earlier run. Stale files from an older theme version stay
//! too, which is what `build --clean` is for.

use crate::generate::{GenerateError, ensure_dir};
use log::{debug, warn};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src` into `dst`, skipping files that already exist.
///
/// Directories that cannot be created abort the copy; a single file that
/// fails to copy is logged and skipped. Returns the number of files copied.
/// A missing `src` copies nothing.
pub fn copy_dir_no_overwrite(src: &Path, dst: &Path) -> Result<usize, GenerateError> {
    if !src.is_dir() {
        debug!("{} is not a directory, nothing to copy", src.display());
        return Ok(0);
    }
    ensure_dir(dst)?;
    let mut copied = 0;
    for entry in WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            ensure_dir(&target)?;
        } else if !target.exists() {
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            match fs::copy(entry.path(), &target) {
                Ok(_) => copied += 1,
                Err(e) => warn!(
                    "could not copy {} to {}: {}",
                    entry.path().display(),
                    target.display(),
                    e
                ),
            }
        }
    }
    Ok(copied)
}

/// Resolve a configured theme path (`./themes/x` or `themes/x`) against the
/// config directory.
pub fn resolve_theme(base: &Path, theme: &str) -> std::path::PathBuf {
    base.join(theme.strip_prefix("./").unwrap_or(theme))
}
