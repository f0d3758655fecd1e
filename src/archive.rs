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
//! Per-part archive pipeline.
//!
//! Every part runs the same fixed stage order: listing hash → tar →
//! tar digest → tar listing → compress → compressed digest →
//! (encrypt → encrypted digest). Each sidecar is flushed before the
//! next stage starts, so a crash leaves a readable prefix of the
//! quintet. Parts are strictly sequential.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::encryption;
use crate::error::{ArchiveError, Result};
use crate::fsutil::{self, handle_destination_directory_creation};
use crate::hasher;
use crate::ops::Operators;
use crate::output::OutputCtx;
use crate::splitter::split_directory;
use crate::utils::human;

pub struct ArchiveOptions {
    /// Worker count for hashing and the tar/compress operators.
    /// `None` lets each of them pick its own default.
    pub threads: Option<usize>,
    /// Compression level, 0 (fastest) to 9 (smallest).
    pub compression: u32,
    /// Split the source into parts below this many bytes.
    pub split_bytes: Option<u64>,
    /// Recipients to encrypt each compressed part for.
    pub encryption_keys: Vec<String>,
    /// Delete `.tar.lz` + `.tar.lz.md5` once the encrypted pair exists.
    pub remove_unencrypted: bool,
    /// Replace an existing destination directory.
    pub force: bool,
    /// Scratch-file location override (defaults to the system temp dir).
    pub work_dir: Option<PathBuf>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            threads: None,
            compression: 6,
            split_bytes: None,
            encryption_keys: Vec::new(),
            remove_unencrypted: false,
            force: false,
            work_dir: None,
        }
    }
}

#[derive(Debug)]
pub struct ArchiveSummary {
    pub parts: usize,
    pub total_bytes: u64,
    pub encrypted: bool,
}

/// Archive `source` into `destination`, producing one sidecar quintet
/// (septet when encrypted) per part.
pub fn create_archive(
    source: &Path,
    destination: &Path,
    opts: &ArchiveOptions,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<ArchiveSummary> {
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }
    let source = source.canonicalize()?;

    handle_destination_directory_creation(destination, opts.force)?;

    if !opts.encryption_keys.is_empty() {
        encryption::encryption_keys_must_exist(&opts.encryption_keys)?;
    }

    let source_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ArchiveError::WrongFileType {
            path: source.clone(),
            expected: "a named file or directory".into(),
        })?;

    out.println(&format!(
        "{} {} → {}",
        "Creating archive:".cyan().bold(),
        source.display().to_string().yellow(),
        destination.display().to_string().yellow()
    ));

    let total_bytes = fsutil::size_of_path(&source)?;

    let parts = if let Some(bound) = opts.split_bytes {
        create_split_archive(&source, destination, &source_name, bound, opts, ops, out)?
    } else {
        out.println("Create and write hash list...");
        build_part(&source, destination, &source_name, None, opts, ops, out)?;
        1
    };

    out.println(&format!(
        "  {}  ({} part{}, {})",
        "archive written".green(),
        parts,
        if parts == 1 { "" } else { "s" },
        human(total_bytes).cyan()
    ));

    Ok(ArchiveSummary {
        parts,
        total_bytes,
        encrypted: !opts.encryption_keys.is_empty(),
    })
}

fn create_split_archive(
    source: &Path,
    destination: &Path,
    source_name: &str,
    bound: u64,
    opts: &ArchiveOptions,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<usize> {
    out.println("Start creation of split archive");
    let parts = split_directory(source, bound)?;

    let pb = ProgressBar::new(parts.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "  {spinner:.cyan} Archiving  [{bar:40.cyan/blue}] part {pos}/{len}  {elapsed}",
        )
        .unwrap()
        .progress_chars("=> "),
    );

    for (index, part_paths) in parts.iter().enumerate() {
        let part_name = format!("{}.part{}", source_name, index + 1);
        out.println(&format!("Create and write hash list of part {}...", index + 1));
        build_part(source, destination, &part_name, Some(part_paths), opts, ops, out)?;
        pb.inc(1);
    }

    pb.finish_with_message("archive written".green().to_string());
    Ok(parts.len())
}

/// One full pipeline run for a part named `part_name`. `part_paths` is
/// `None` for an unsplit archive (the whole source is the part).
fn build_part(
    source: &Path,
    destination: &Path,
    part_name: &str,
    part_paths: Option<&[PathBuf]>,
    opts: &ArchiveOptions,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    let workers = opts.threads.unwrap_or(0);

    // 1. Listing hash
    let listing = match part_paths {
        Some(paths) => hasher::listing_for_part(paths, source, workers)?,
        None => hasher::tree_listing(source, source, workers)?,
    };
    write_listing_file(&destination.join(format!("{}.md5", part_name)), &listing)?;

    // 2. Tar, entries relative to the source's parent so every entry
    //    starts with the source name.
    let tar_path = destination.join(format!("{}.tar", part_name));
    let workdir = source.parent().unwrap_or(Path::new("/")).to_path_buf();
    match part_paths {
        None => {
            let entry = source
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            ops.tar.create(&tar_path, &workdir, &entry)?;
        }
        Some(paths) => {
            let scratch = match &opts.work_dir {
                Some(dir) => tempfile::TempDir::new_in(dir)?,
                None => tempfile::TempDir::new()?,
            };
            let list_path = scratch.path().join("paths.txt");
            write_tar_file_list(&list_path, paths, &workdir)?;
            ops.tar.create_from_list(&tar_path, &workdir, &list_path)?;
        }
    }

    // 3. Tar digest
    hasher::write_file_digest(&tar_path)?;

    // 4. Tar listing
    let listing_text = ops.tar.list(&tar_path, None)?;
    let lst_path = destination.join(format!("{}.tar.lst", part_name));
    let mut lst = File::create(&lst_path)?;
    lst.write_all(listing_text.as_bytes())?;
    lst.sync_all()?;

    // 5. Compress (replaces the tar with <part>.tar.lz)
    out.println(&format!("Starting compression of {}...", part_name));
    let compressed = ops
        .compressor
        .compress(&tar_path, opts.compression, opts.threads)?;

    // 6. Compressed digest
    hasher::write_file_digest(&compressed)?;

    // 7. Optional encryption
    if !opts.encryption_keys.is_empty() {
        out.println(&format!("Starting encryption of {}...", part_name));
        encryption::encrypt_list_of_archives(
            &[compressed],
            &opts.encryption_keys,
            opts.remove_unencrypted,
            None,
            ops,
            out,
        )?;
    }

    Ok(())
}

/// Write the `<digest> <relpath>` listing-hash lines.
fn write_listing_file(path: &Path, listing: &[(String, String)]) -> Result<()> {
    let mut f = File::create(path)?;
    for (relpath, digest) in listing {
        writeln!(f, "{} {}", digest, relpath)?;
    }
    f.sync_all()?;
    Ok(())
}

/// One relative POSIX path per line, for `tar --files-from`.
fn write_tar_file_list(path: &Path, part_paths: &[PathBuf], workdir: &Path) -> Result<()> {
    let mut f = File::create(path)?;
    for entry in part_paths {
        writeln!(f, "{}", fsutil::posix_relpath(entry, workdir)?)?;
    }
    f.sync_all()?;
    Ok(())
}
