//! Size-bounded partitioning of a source tree into ordered parts.
//!
//! A part is a list of whole paths (files and pruned subdirectories)
//! whose cumulative on-disk size stays strictly below the bound. The
//! walk is depth-first pre-order: at each directory, subdirectories
//! that fit the current part are taken whole and pruned from descent;
//! everything else is visited file by file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};
use crate::fsutil::size_of_path;

struct SplitState {
    max_part_bytes: u64,
    current_paths: Vec<PathBuf>,
    current_bytes: u64,
    parts: Vec<Vec<PathBuf>>,
}

/// Partition `root` into ordered parts bounded by `max_part_bytes`.
///
/// The union of all parts covers every regular file under `root`
/// exactly once. A file at or above the bound is fatal. An empty root
/// yields one empty part so the pipeline still produces a quintet.
pub fn split_directory(root: &Path, max_part_bytes: u64) -> Result<Vec<Vec<PathBuf>>> {
    let mut state = SplitState {
        max_part_bytes,
        current_paths: Vec::new(),
        current_bytes: 0,
        parts: Vec::new(),
    };

    visit(root, &mut state)?;

    state.parts.push(state.current_paths);
    Ok(state.parts)
}

fn visit(dir: &Path, state: &mut SplitState) -> Result<()> {
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // Symlinks are carried as plain path entries, never descended.
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }
    // Name order keeps part composition stable across runs.
    subdirs.sort();
    files.sort();

    let mut descend = Vec::new();
    for sub in subdirs {
        let sub_size = size_of_path(&sub)?;
        if state.current_bytes + sub_size < state.max_part_bytes {
            state.current_paths.push(sub);
            state.current_bytes += sub_size;
        } else {
            descend.push(sub);
        }
    }

    for file in files {
        let file_size = fs::metadata(&file).map(|m| m.len()).unwrap_or(0);

        if state.current_bytes + file_size < state.max_part_bytes {
            state.current_paths.push(file);
            state.current_bytes += file_size;
        } else if file_size < state.max_part_bytes {
            let finished = std::mem::replace(&mut state.current_paths, vec![file]);
            state.parts.push(finished);
            state.current_bytes = file_size;
        } else {
            return Err(ArchiveError::PartTooLarge(file));
        }
    }

    for sub in descend {
        visit(&sub, state)?;
    }

    Ok(())
}
