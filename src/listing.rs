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
//! Answering "what is in this archive?".
//!
//! Cheap mode trusts the `.tar.lst` sidecars; deep mode asks the tar
//! operator about the compressed parts themselves.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::fsutil::{files_with_suffix_or_fail, part_stem};
use crate::ops::Operators;
use crate::output::OutputCtx;
use crate::COMPRESSED_ARCHIVE_SUFFIX;

/// Print the archive contents to stdout, optionally filtered to lines
/// whose entry path contains `subpath`.
pub fn create_listing(
    source: &Path,
    subpath: Option<&str>,
    deep: bool,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    let text = render_listing(source, subpath, deep, ops)?;
    out.raw(&text);
    Ok(())
}

/// The listing text itself, one verbose tar line per entry.
pub fn render_listing(
    source: &Path,
    subpath: Option<&str>,
    deep: bool,
    ops: &Operators,
) -> Result<String> {
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }

    if deep {
        deep_listing(source, subpath, ops)
    } else {
        cheap_listing(source, subpath)
    }
}

fn cheap_listing(source: &Path, subpath: Option<&str>) -> Result<String> {
    let sidecars: Vec<PathBuf> = if source.is_dir() {
        files_with_suffix_or_fail(source, ".tar.lst")?
    } else {
        let parent = source.parent().unwrap_or(Path::new(".")).to_path_buf();
        let sidecar = parent.join(format!("{}.tar.lst", part_stem(source)));
        if !sidecar.exists() {
            return Err(ArchiveError::MissingSidecar(sidecar));
        }
        vec![sidecar]
    };

    let mut rendered = String::new();
    for sidecar in sidecars {
        let text = fs::read_to_string(&sidecar)?;
        for line in text.lines() {
            if line_matches(line, subpath) {
                rendered.push_str(line);
                rendered.push('\n');
            }
        }
    }
    Ok(rendered)
}

fn deep_listing(source: &Path, subpath: Option<&str>, ops: &Operators) -> Result<String> {
    let archives: Vec<PathBuf> = if source.is_dir() {
        files_with_suffix_or_fail(source, COMPRESSED_ARCHIVE_SUFFIX)?
    } else {
        vec![source.to_path_buf()]
    };

    let mut rendered = String::new();
    for archive in archives {
        rendered.push_str(&ops.tar.list(&archive, subpath)?);
    }
    Ok(rendered)
}

/// A verbose tar listing line matches when its final token — the entry
/// path — contains the filter as a substring.
fn line_matches(line: &str, subpath: Option<&str>) -> bool {
    match subpath {
        None => true,
        Some(filter) => line
            .split_whitespace()
            .last()
            .is_some_and(|entry| entry.contains(filter)),
    }
}
