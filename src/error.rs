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
//! Error taxonomy for archive operations.
//!
//! Integrity-check outcomes are deliberately NOT errors — see
//! [`crate::integrity::CheckOutcome`]. Everything here maps to exit
//! code 1 at the CLI layer.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

#[derive(Error, Debug)]
pub enum ArchiveError {
    // ── Usage / precondition ───────────────────────────────────────────
    #[error("Source path does not exist: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Destination {} already exists. Use --force to overwrite", .0.display())]
    DestinationExists(PathBuf),

    #[error("Parent directory of destination {} does not exist", .0.display())]
    DestinationParentMissing(PathBuf),

    #[error("{} is not a file of type {}", .path.display(), .expected)]
    WrongFileType { path: PathBuf, expected: String },

    #[error("File {} is larger than the maximum part size", .0.display())]
    PartTooLarge(PathBuf),

    #[error("Encryption key not found: {0}")]
    EncryptionKeyMissing(String),

    // ── Capacity ───────────────────────────────────────────────────────
    #[error("Not enough space available for {0}")]
    InsufficientSpace(String),

    // ── State mismatch ─────────────────────────────────────────────────
    #[error("Encrypted archives present. Doing nothing.")]
    AlreadyEncrypted,

    #[error("Unencrypted archives present. Doing nothing.")]
    AlreadyDecrypted,

    #[error("No files of type {} found in {}", .suffix, .dir.display())]
    NoArchivesFound { dir: PathBuf, suffix: String },

    #[error("Missing sidecar file: {}", .0.display())]
    MissingSidecar(PathBuf),

    #[error("Extraction for deep integrity check failed: {0}")]
    DeepExtractionFailed(String),

    // ── Operator failure ───────────────────────────────────────────────
    #[error("{} failed on {}: {}", .operator, .path.display(), .message)]
    Operator {
        operator: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),
}

impl ArchiveError {
    /// Shorthand for a failed external tool invocation.
    pub fn operator(operator: &'static str, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Operator {
            operator,
            path: path.into(),
            message: message.into(),
        }
    }
}
