//! Lifecycle of an entry's target directory.

use std::io;
use std::path::Path;

/// Remove `dir` and everything below it. A missing directory is not an error.
pub(crate) fn remove_if_present(dir: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(dir) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// Replace `dir` with a fresh, empty directory so nothing from an earlier run survives.
pub(crate) fn recreate(dir: &Path) -> io::Result<()> {
    remove_if_present(dir)?;
    std::fs::create_dir_all(dir)
}
