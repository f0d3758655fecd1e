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
//! Archive extraction: optional decryption, capacity admission control,
//! then streamed decompress+untar (or partial untar by inner path).

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::encryption::decrypt_list_of_archives;
use crate::error::{ArchiveError, Result};
use crate::fsutil::{
    available_capacity, file_has_suffix, files_with_suffix, files_with_suffix_or_fail,
    handle_destination_directory_creation, required_space,
};
use crate::ops::Operators;
use crate::output::OutputCtx;
use crate::{COMPRESSED_ARCHIVE_SUFFIX, ENCRYPTED_ARCHIVE_SUFFIX};

#[derive(Default)]
pub struct ExtractOptions {
    /// Extract only this inner path instead of the whole archive.
    pub partial: Option<String>,
    /// Worker count handed to the decompressor.
    pub threads: Option<usize>,
    /// Replace an existing destination directory.
    pub force: bool,
    /// Leave decrypted `.tar.lz` files in the destination instead of a
    /// scratch directory.
    pub extract_at_destination: bool,
}

/// Extract an archive directory (all parts) or a single part file into
/// `destination`.
pub fn extract_archive(
    source: &Path,
    destination: &Path,
    opts: &ExtractOptions,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }

    handle_destination_directory_creation(destination, opts.force)?;

    let encrypted = if source.is_dir() {
        !files_with_suffix(source, ENCRYPTED_ARCHIVE_SUFFIX)?.is_empty()
    } else {
        file_has_suffix(source, ENCRYPTED_ARCHIVE_SUFFIX)
    };

    let mut archives = archives_from_path(source, encrypted)?;

    // The scratch guard must outlive extraction of the decrypted files.
    let mut _decrypt_scratch: Option<tempfile::TempDir> = None;
    if encrypted {
        ensure_capacity_for_decryption(&archives, destination)?;

        let decrypt_dir = if opts.extract_at_destination {
            destination.to_path_buf()
        } else {
            let scratch = tempfile::TempDir::new_in(destination)?;
            let path = scratch.path().to_path_buf();
            _decrypt_scratch = Some(scratch);
            path
        };
        archives = decrypt_list_of_archives(&archives, Some(&decrypt_dir), false, ops, out)?;
    }

    ensure_capacity_for_extraction(&archives, destination, ops)?;

    if let Some(inner) = &opts.partial {
        partial_extraction(&archives, destination, inner, ops, out)?;
    } else {
        uncompress_and_extract(&archives, destination, opts.threads, ops, out)?;
    }

    Ok(())
}

fn archives_from_path(source: &Path, encrypted: bool) -> Result<Vec<PathBuf>> {
    if source.is_dir() {
        let suffix = if encrypted {
            ENCRYPTED_ARCHIVE_SUFFIX
        } else {
            COMPRESSED_ARCHIVE_SUFFIX
        };
        files_with_suffix_or_fail(source, suffix)
    } else {
        Ok(vec![source.to_path_buf()])
    }
}

/// Decrypted copies land next to the extraction, so the device must
/// hold the encrypted payload size again, with headroom.
fn ensure_capacity_for_decryption(archives: &[PathBuf], destination: &Path) -> Result<()> {
    let mut total = 0u64;
    for archive in archives {
        total += fs::metadata(archive)?.len();
    }
    if available_capacity(destination)? < required_space(total) {
        return Err(ArchiveError::InsufficientSpace("archive decryption".into()));
    }
    Ok(())
}

fn ensure_capacity_for_extraction(
    archives: &[PathBuf],
    destination: &Path,
    ops: &Operators,
) -> Result<()> {
    let mut total = 0u64;
    for archive in archives {
        total += ops.compressor.uncompressed_size(archive)?;
    }
    if available_capacity(destination)? < required_space(total) {
        return Err(ArchiveError::InsufficientSpace("archive extraction".into()));
    }
    Ok(())
}

/// Stream each part through the decompressor straight into tar, so the
/// uncompressed tar never hits the disk.
fn uncompress_and_extract(
    archives: &[PathBuf],
    destination: &Path,
    threads: Option<usize>,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    let pb = ProgressBar::new(archives.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "  {spinner:.cyan} Extracting [{bar:40.cyan/blue}] part {pos}/{len}  {elapsed}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    for archive in archives {
        out.println(&format!("Extract archive {}", archive.display()));
        let mut reader = ops.compressor.reader(archive, threads)?;
        ops.tar.extract_stream(&mut *reader, destination)?;
        pb.inc(1);
    }

    pb.finish_with_message("extraction done".green().to_string());
    Ok(())
}

/// Pull one inner path out of each part. The target may live in only
/// one part of a split archive, so per-part misses are tolerated as
/// long as something matched somewhere.
fn partial_extraction(
    archives: &[PathBuf],
    destination: &Path,
    inner: &str,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    out.println(&format!("Start extracting {} from archive...", inner));

    let mut extracted_any = false;
    for archive in archives {
        match ops.tar.extract(archive, destination, Some(inner)) {
            Ok(()) => {
                extracted_any = true;
                out.println(&format!("Extracted {} from {}", inner, archive.display()));
            }
            Err(_) => {
                out.println(&format!(
                    "  {} {} not in {}",
                    "skip:".dimmed(),
                    inner,
                    archive.display()
                ));
            }
        }
    }

    if !extracted_any {
        return Err(ArchiveError::operator(
            "tar",
            PathBuf::from(inner),
            "path not found in any archive part",
        ));
    }
    Ok(())
}
