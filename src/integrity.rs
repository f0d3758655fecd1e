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
//! Two-level archive verification.
//!
//! Shallow: each part's digest against its signature sidecar; first
//! mismatch short-circuits. Deep: every part is extracted into a fresh
//! scratch directory, its tree listing recomputed and compared as a set
//! of `(relpath, digest)` pairs against the listing-hash sidecar;
//! failures aggregate across all parts. The verifier is total — every
//! run produces exactly one [`CheckOutcome`].

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ArchiveError, Result};
use crate::fsutil::{
    available_capacity, file_has_suffix, files_with_suffix, files_with_suffix_or_fail, part_stem,
    required_space,
};
use crate::hasher;
use crate::ops::Operators;
use crate::output::OutputCtx;
use crate::{COMPRESSED_ARCHIVE_SUFFIX, ENCRYPTED_ARCHIVE_SUFFIX};

/// Result of an integrity check. Mapped to exit codes by the CLI:
/// `Ok` → 0, the two `Failed` variants → 3, `SetupError` → 1.
#[derive(Debug)]
pub enum CheckOutcome {
    Ok,
    /// A part's artifact digest no longer matches its signature sidecar.
    ShallowFailed { part: PathBuf },
    /// Extracted content whose digests are absent from the listing hash.
    DeepFailed { paths: Vec<String> },
    /// The check could not run to a verdict.
    SetupError { error: ArchiveError },
}

/// One archive part paired with its two sidecars.
#[derive(Debug)]
struct PartSidecars {
    archive: PathBuf,
    signature: PathBuf,
    listing: PathBuf,
}

/// Check `source` — an archive directory or a single part file.
pub fn check_integrity(
    source: &Path,
    deep: bool,
    threads: Option<usize>,
    ops: &Operators,
    out: &OutputCtx,
) -> CheckOutcome {
    let (parts, encrypted) = match discover(source) {
        Ok(found) => found,
        Err(error) => return CheckOutcome::SetupError { error },
    };

    for part in &parts {
        match shallow_part_ok(part) {
            Ok(true) => {}
            Ok(false) => {
                return CheckOutcome::ShallowFailed {
                    part: part.archive.clone(),
                }
            }
            Err(error) => return CheckOutcome::SetupError { error },
        }
    }

    if !deep {
        return CheckOutcome::Ok;
    }

    let mut corrupted = Vec::new();
    for part in &parts {
        match deep_check_part(part, encrypted, threads, ops, out) {
            Ok(mut bad) => corrupted.append(&mut bad),
            Err(error) => return CheckOutcome::SetupError { error },
        }
    }

    if corrupted.is_empty() {
        CheckOutcome::Ok
    } else {
        corrupted.sort();
        corrupted.dedup();
        CheckOutcome::DeepFailed { paths: corrupted }
    }
}

/// Collect the parts to verify and pair each with its sidecars.
/// Encrypted artifacts are preferred when both forms are present.
fn discover(source: &Path) -> Result<(Vec<PartSidecars>, bool)> {
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }

    let (archives, encrypted) = if source.is_dir() {
        let gpg = files_with_suffix(source, ENCRYPTED_ARCHIVE_SUFFIX)?;
        if !gpg.is_empty() {
            (gpg, true)
        } else {
            (files_with_suffix_or_fail(source, COMPRESSED_ARCHIVE_SUFFIX)?, false)
        }
    } else if file_has_suffix(source, ENCRYPTED_ARCHIVE_SUFFIX) {
        (vec![source.to_path_buf()], true)
    } else if file_has_suffix(source, COMPRESSED_ARCHIVE_SUFFIX) {
        (vec![source.to_path_buf()], false)
    } else {
        return Err(ArchiveError::WrongFileType {
            path: source.to_path_buf(),
            expected: format!("{} or {}", COMPRESSED_ARCHIVE_SUFFIX, ENCRYPTED_ARCHIVE_SUFFIX),
        });
    };

    let mut parts = Vec::with_capacity(archives.len());
    for archive in archives {
        let parent = archive.parent().unwrap_or(Path::new(".")).to_path_buf();

        let mut signature = archive.as_os_str().to_owned();
        signature.push(".md5");
        let signature = PathBuf::from(signature);
        if !signature.exists() {
            return Err(ArchiveError::MissingSidecar(signature));
        }

        // `N.partK.tar.lz[.gpg]` pairs with `N.partK.md5`.
        let listing = parent.join(format!("{}.md5", part_stem(&archive)));
        if !listing.exists() {
            return Err(ArchiveError::MissingSidecar(listing));
        }

        parts.push(PartSidecars {
            archive,
            signature,
            listing,
        });
    }

    Ok((parts, encrypted))
}

fn digest_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Fa-f0-9]{32}$").unwrap())
}

/// Compare the artifact digest with the signature sidecar
/// (whitespace-trimmed, case-insensitive). A malformed sidecar counts
/// as a mismatch.
fn shallow_part_ok(part: &PartSidecars) -> Result<bool> {
    let recorded = fs::read_to_string(&part.signature)?;
    let recorded = recorded.trim();
    if !digest_token_re().is_match(recorded) {
        return Ok(false);
    }
    let actual = hasher::file_digest(&part.archive)?;
    Ok(actual.eq_ignore_ascii_case(recorded))
}

/// Extract one part into a scratch directory and return the relpaths
/// whose recomputed digests are not in the listing hash.
fn deep_check_part(
    part: &PartSidecars,
    encrypted: bool,
    threads: Option<usize>,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<Vec<String>> {
    let extract_scratch = tempfile::TempDir::new()?;

    // Decrypted artifacts go in their own scratch so the extracted root
    // stays the single top-level entry of the extraction scratch.
    let mut _decrypt_scratch: Option<tempfile::TempDir> = None;
    let plain = if encrypted {
        let scratch = tempfile::TempDir::new()?;
        let name = part
            .archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let out_path = scratch.path().join(name.strip_suffix(".gpg").unwrap_or(name));
        out.println(&format!("Decrypting archive: {}", part.archive.display()));
        ops.crypto.decrypt(&part.archive, &out_path)?;
        _decrypt_scratch = Some(scratch);
        out_path
    } else {
        part.archive.clone()
    };

    let needed = ops.compressor.uncompressed_size(&plain)?;
    if available_capacity(extract_scratch.path())? < required_space(needed) {
        return Err(ArchiveError::InsufficientSpace("deep integrity check".into()));
    }

    let mut reader = ops.compressor.reader(&plain, threads)?;
    ops.tar.extract_stream(&mut *reader, extract_scratch.path())?;

    let root = resolve_extracted_root(extract_scratch.path())?;
    let actual = hasher::tree_listing(&root, &root, threads.unwrap_or(0))?;
    let expected = load_listing_set(&part.listing)?;

    let corrupted = actual
        .into_iter()
        .filter(|pair| !expected.contains(pair))
        .map(|(relpath, _)| relpath)
        .collect();
    Ok(corrupted)
}

/// The freshly-extracted source tree is the one top-level entry of the
/// scratch directory; anything else means the extraction went wrong.
fn resolve_extracted_root(scratch: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(scratch)?.collect::<std::io::Result<Vec<_>>>()?;
    match entries.as_slice() {
        [single] => Ok(single.path()),
        other => Err(ArchiveError::DeepExtractionFailed(format!(
            "expected a single extracted root, found {} entries",
            other.len()
        ))),
    }
}

/// Parse `<hex> <relpath>` lines into a set of `(relpath, digest)`
/// pairs. Digests are normalized to lowercase.
fn load_listing_set(listing: &Path) -> Result<HashSet<(String, String)>> {
    let text = fs::read_to_string(listing)?;
    let mut set = HashSet::new();
    for line in text.lines() {
        if let Some((digest, relpath)) = line.split_once(' ') {
            set.insert((relpath.trim().to_string(), digest.trim().to_lowercase()));
        }
    }
    Ok(set)
}
