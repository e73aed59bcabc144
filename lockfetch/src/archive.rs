//! Downloading and extracting per-revision tarballs from the archive host.
//!
//! The archive host wraps every tarball in a single synthetic top-level directory (e.g.
//! `owner-repo-1a2b3c4/`). Extraction strips that directory, keeps only the child directories
//! named in the entry's [`AllowSet`], and writes the rest below the target directory.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType, Header};

use crate::error::Error;
use crate::manifest::AllowSet;
use crate::target;

/// The tarball endpoint for `owner/repo` pinned at `revision`.
pub fn tarball_url(api: &str, owner: &str, repo: &str, revision: &str) -> String {
    format!("{api}/repos/{owner}/{repo}/tarball/{revision}")
}

/// Fetch the whole response body, failing on any non-success status.
pub fn download(client: &reqwest::blocking::Client, url: &str) -> Result<Vec<u8>, Error> {
    let mut response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(Error::HttpStatus {
            status: response.status(),
            url: url.to_string(),
        });
    }
    let mut body = Vec::new();
    response.read_to_end(&mut body)?;
    tracing::debug!(%url, bytes = body.len(), "downloaded tarball");
    Ok(body)
}

/// Extract a gzipped tarball into `target`, replacing anything already there. Returns the number
/// of entries written.
pub fn extract<R: Read>(
    compressed: R,
    target: &Path,
    allow: &AllowSet,
    verbose: bool,
) -> Result<usize, Error> {
    target::recreate(target)?;
    let mut archive = Archive::new(GzDecoder::new(compressed));
    let mut written = 0usize;
    for archive_entry in archive.entries()? {
        let mut archive_entry = archive_entry?;
        let kind = archive_entry.header().entry_type();
        if kind.is_pax_global_extensions() || kind.is_pax_local_extensions() {
            continue;
        }
        let stored = archive_entry.path()?.into_owned();
        let Some(relative) = strip_wrapper(&stored)? else {
            continue;
        };
        if !is_retained(&relative, kind.is_dir(), allow) {
            continue;
        }
        let dest = target.join(&relative);
        reject_symlinked_path(target, &relative, &stored)?;
        if verbose {
            tracing::info!(path = %dest.display(), "Writing");
        }
        let times = entry_times(archive_entry.header());
        if kind.is_file() || kind == EntryType::Continuous {
            let mode = archive_entry.header().mode().unwrap_or(0o644) & 0o7777;
            ensure_parent(&dest)?;
            let mut file = create_file(&dest, mode)?;
            io::copy(&mut archive_entry, &mut file)?;
        } else if kind.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if kind.is_symlink() {
            let link_target = archive_entry.link_name()?.ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("symlink '{}' has no target", stored.display()),
                )
            })?;
            if !link_stays_within(&relative, &link_target) {
                return Err(Error::UnsafeEntryPath { path: stored });
            }
            ensure_parent(&dest)?;
            make_symlink(&link_target, &dest, &stored)?;
        } else {
            return Err(Error::UnsupportedEntry { path: stored, kind });
        }
        if let Some(times) = times
            && !kind.is_symlink()
        {
            restore_times(&dest, times);
        }
        written += 1;
    }
    Ok(written)
}

/// Drop the synthetic top-level directory. `None` for the wrapper itself.
fn strip_wrapper(stored: &Path) -> Result<Option<PathBuf>, Error> {
    let mut relative = PathBuf::new();
    for component in stored.components().skip(1) {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(Error::UnsafeEntryPath {
                    path: stored.to_path_buf(),
                });
            }
        }
    }
    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}

/// Fail if `relative`, or any directory on the way to it, is already a symlink below `target`.
/// Writing there would follow the link.
fn reject_symlinked_path(target: &Path, relative: &Path, stored: &Path) -> Result<(), Error> {
    let mut current = target.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(Error::UnsafeEntryPath {
                    path: stored.to_path_buf(),
                });
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}

/// Whether a link stored at `relative` and pointing at `link_target` resolves inside the target
/// directory. Absolute targets never do.
fn link_stays_within(relative: &Path, link_target: &Path) -> bool {
    let mut depth = relative.components().count().saturating_sub(1);
    for component in link_target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir if depth > 0 => depth -= 1,
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Files directly below the wrapper are always kept; anything inside a child directory is kept
/// only if that child is allowed.
fn is_retained(relative: &Path, is_dir: bool, allow: &AllowSet) -> bool {
    if allow.is_empty() {
        return true;
    }
    let mut components = relative.components();
    let first = components.next();
    if components.next().is_none() && !is_dir {
        return true;
    }
    first
        .and_then(|c| c.as_os_str().to_str())
        .is_some_and(|name| allow.allows(name))
}

fn ensure_parent(dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn create_file(path: &Path, mode: u32) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;
    options.open(path)
}

// The link is created at `dest` and points at the target recorded in the archive.
#[cfg(unix)]
fn make_symlink(link_target: &Path, dest: &Path, _stored: &Path) -> Result<(), Error> {
    Ok(std::os::unix::fs::symlink(link_target, dest)?)
}

#[cfg(not(unix))]
fn make_symlink(_link_target: &Path, _dest: &Path, stored: &Path) -> Result<(), Error> {
    Err(Error::UnsupportedEntry {
        path: stored.to_path_buf(),
        kind: EntryType::Symlink,
    })
}

/// Access and modification times recorded for an entry. Only GNU headers carry an access time;
/// otherwise the modification time stands in for it.
fn entry_times(header: &Header) -> Option<fs::FileTimes> {
    let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(header.mtime().ok()?);
    let accessed = header
        .as_gnu()
        .and_then(|gnu| gnu.atime().ok())
        .filter(|&atime| atime > 0)
        .map(|atime| SystemTime::UNIX_EPOCH + Duration::from_secs(atime))
        .unwrap_or(modified);
    Some(
        fs::FileTimes::new()
            .set_accessed(accessed)
            .set_modified(modified),
    )
}

// Best effort: failing to restore timestamps never fails the extraction.
fn restore_times(path: &Path, times: fs::FileTimes) {
    let _ = fs::File::open(path).and_then(|f| f.set_times(times));
}
