//! Filesystem queries and destination-directory handling shared by the
//! archive, extract and verify paths.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ArchiveError, Result};
use crate::REQUIRED_SPACE_MULTIPLIER;

/// On-disk size of a file or of every regular file below a directory.
pub fn size_of_path(path: &Path) -> Result<u64> {
    let meta = fs::metadata(path)?;
    if meta.is_file() {
        return Ok(meta.len());
    }

    let mut total = 0u64;
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Free bytes on the device holding `path`.
#[cfg(unix)]
pub fn available_capacity(path: &Path) -> Result<u64> {
    let stat = nix::sys::statvfs::statvfs(path)
        .map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
    Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
}

#[cfg(not(unix))]
pub fn available_capacity(_path: &Path) -> Result<u64> {
    // No statvfs to ask; let the extraction itself hit the wall.
    Ok(u64::MAX)
}

/// Bytes that must be free before an operation needing `bytes` is admitted.
pub fn required_space(bytes: u64) -> u64 {
    (bytes as f64 * REQUIRED_SPACE_MULTIPLIER) as u64
}

/// Create `dest`, enforcing the collision rules shared by archive
/// creation, extraction and rerouted encryption output: the parent must
/// exist, and an existing destination is only replaced under `force`.
pub fn handle_destination_directory_creation(dest: &Path, force: bool) -> Result<()> {
    if dest.exists() {
        if !force {
            return Err(ArchiveError::DestinationExists(dest.to_path_buf()));
        }
        if dest.is_dir() {
            fs::remove_dir_all(dest)?;
        } else {
            fs::remove_file(dest)?;
        }
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ArchiveError::DestinationParentMissing(dest.to_path_buf()));
        }
    }

    fs::create_dir(dest)?;
    Ok(())
}

/// True if the file name carries `suffix` (multi-dot suffixes included).
pub fn file_has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(suffix))
}

/// All files directly inside `dir` whose name ends with `suffix`,
/// sorted by name so parts are always visited in order.
pub fn files_with_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && file_has_suffix(&path, suffix) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Same as [`files_with_suffix`] but an empty result is an error.
pub fn files_with_suffix_or_fail(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let found = files_with_suffix(dir, suffix)?;
    if found.is_empty() {
        return Err(ArchiveError::NoArchivesFound {
            dir: dir.to_path_buf(),
            suffix: suffix.to_string(),
        });
    }
    Ok(found)
}

/// `path` relative to `base`, rendered with forward slashes.
pub fn posix_relpath(path: &Path, base: &Path) -> Result<String> {
    let rel = path.strip_prefix(base).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not below {}", path.display(), base.display()),
        )
    })?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str().unwrap_or(""))
        .collect();
    Ok(parts.join("/"))
}

/// Strip every known archive suffix from a part file name, leaving the
/// effective part name (`N` or `N.partK`).
pub fn part_stem(archive: &Path) -> String {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let name = name.strip_suffix(".gpg").unwrap_or(name);
    let name = name.strip_suffix(".tar.lz").unwrap_or(name);
    let name = name.strip_suffix(".tar").unwrap_or(name);
    name.to_string()
}
