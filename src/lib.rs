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
//! Coldpack — verifiable, split, checksummed, optionally-encrypted
//! cold-storage archives.
//!
//! An archive directory holds, per part, the sidecar quintet
//! `M.md5` / `M.tar.md5` / `M.tar.lst` / `M.tar.lz` / `M.tar.lz.md5`
//! (plus `M.tar.lz.gpg` and `M.tar.lz.gpg.md5` when encrypted). The
//! library side creates, extracts, lists and verifies such directories;
//! the external tar, compression and encryption tools are reached
//! through the operator traits in [`ops`].

pub mod archive;
pub mod config;
pub mod encryption;
pub mod error;
pub mod extract;
pub mod fsutil;
pub mod hasher;
pub mod integrity;
pub mod listing;
pub mod ops;
pub mod output;
pub mod splitter;
pub mod utils;

/// Suffix of a compressed archive part.
pub const COMPRESSED_ARCHIVE_SUFFIX: &str = ".tar.lz";

/// Suffix of an encrypted archive part.
pub const ENCRYPTED_ARCHIVE_SUFFIX: &str = ".tar.lz.gpg";

/// Headroom factor applied to every disk-capacity precheck. Filesystem
/// metadata and block rounding eat into the nominal free space, so the
/// raw requirement is inflated by this factor before comparing.
pub const REQUIRED_SPACE_MULTIPLIER: f64 = 1.1;

pub use error::{ArchiveError, Result};
