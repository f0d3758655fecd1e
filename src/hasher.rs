// ─────────────────────────────────────────────────────────────────────────────
// Coldpack v0.1.0
// Copyright 2026 The Coldpack Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
// ─────────────────────────────────────────────────────────────────────────────
//! Streaming 128-bit digests and listing hashes, parallelized with Rayon.
//!
//! Digests are emitted as 32-character lowercase hex — the token format
//! of every `.md5` sidecar.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use hex::encode;
use md5::{Digest, Md5};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::Result;
use crate::fsutil::posix_relpath;

/// Stream-hash a file. No temp files.
pub fn file_digest(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        std::io::Error::new(e.kind(), format!("Cannot open {}: {}", path.display(), e))
    })?;
    let mut reader = BufReader::new(file);
    hash_reader(&mut reader)
}

/// Stream-hash from an arbitrary reader.
pub fn hash_reader<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Md5::new();
    let mut buf = [0u8; 131072]; // 128 KiB chunks
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(encode(hasher.finalize()))
}

/// Compute `file_digest(path)` and write it beside the file as
/// `<path>.md5` (single token, no trailing newline). Returns the
/// sidecar path.
pub fn write_file_digest(path: &Path) -> Result<PathBuf> {
    let digest = file_digest(path)?;
    let mut name = path.as_os_str().to_owned();
    name.push(".md5");
    let sidecar = PathBuf::from(name);
    let mut f = File::create(&sidecar)?;
    f.write_all(digest.as_bytes())?;
    f.sync_all()?;
    Ok(sidecar)
}

/// Listing hash of a tree: one `(relpath, digest)` per regular file
/// under `root`, where relpath is POSIX and relative to the PARENT of
/// `tree_base` (so entries are rooted at the source name). Symlinks
/// count only when their target is a regular file; broken links are
/// skipped. Output order is unspecified — compare as a set.
pub fn tree_listing(root: &Path, tree_base: &Path, max_workers: usize) -> Result<Vec<(String, String)>> {
    let base = tree_base.parent().unwrap_or(Path::new(""));

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        } else if entry.file_type().is_symlink() {
            // Follow the link by hand; hash only resolvable file targets.
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => files.push(entry.into_path()),
                _ => {}
            }
        }
    }

    hash_file_set(&files, base, max_workers)
}

/// Listing hash for the explicit path set of one split part: whole
/// directories expand through [`tree_listing`], single files hash
/// directly. Relpaths stay rooted at the source name.
pub fn listing_for_part(paths: &[PathBuf], source_root: &Path, max_workers: usize) -> Result<Vec<(String, String)>> {
    let mut listing = Vec::new();
    for path in paths {
        if path.is_dir() {
            listing.extend(tree_listing(path, source_root, max_workers)?);
        } else {
            let base = source_root.parent().unwrap_or(Path::new(""));
            let rel = posix_relpath(path, base)?;
            let digest = file_digest(path)?;
            listing.push((rel, digest));
        }
    }
    Ok(listing)
}

fn hash_file_set(files: &[PathBuf], base: &Path, max_workers: usize) -> Result<Vec<(String, String)>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers) // 0 = let rayon size the pool
        .build()
        .map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to build thread pool: {}", e),
            )
        })?;

    pool.install(|| {
        files
            .par_iter()
            .map(|path| -> Result<(String, String)> {
                let rel = posix_relpath(path, base)?;
                let digest = file_digest(path)?;
                Ok((rel, digest))
            })
            .collect()
    })
}
