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
//! Many-recipient encryption of compressed archives, and the symmetric
//! decryption. Directory-level operations are all-or-nothing: a
//! half-encrypted archive directory must never exist.

use std::fs;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::error::{ArchiveError, Result};
use crate::fsutil::{
    file_has_suffix, files_with_suffix, files_with_suffix_or_fail,
    handle_destination_directory_creation,
};
use crate::hasher;
use crate::ops::Operators;
use crate::output::OutputCtx;
use crate::{COMPRESSED_ARCHIVE_SUFFIX, ENCRYPTED_ARCHIVE_SUFFIX};

/// Keys that look like files on disk must exist; everything else is
/// taken as an id resolved by the ambient keyring.
pub fn encryption_keys_must_exist(keys: &[String]) -> Result<()> {
    for key in keys {
        let looks_like_file = key.contains(std::path::MAIN_SEPARATOR)
            || [".gpg", ".pub", ".asc"].iter().any(|ext| key.ends_with(ext));
        if looks_like_file && !Path::new(key).exists() {
            return Err(ArchiveError::EncryptionKeyMissing(key.clone()));
        }
    }
    Ok(())
}

/// Encrypt an archive directory (all parts) or a single `.tar.lz` file
/// that already exists on disk.
pub fn encrypt_existing_archive(
    target: &Path,
    keys: &[String],
    destination: Option<&Path>,
    remove_unencrypted: bool,
    force: bool,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    encryption_keys_must_exist(keys)?;

    if let Some(dest) = destination {
        handle_destination_directory_creation(dest, force)?;
    }

    if target.is_dir() {
        if !files_with_suffix(target, ENCRYPTED_ARCHIVE_SUFFIX)?.is_empty() {
            return Err(ArchiveError::AlreadyEncrypted);
        }
        let archives = files_with_suffix_or_fail(target, COMPRESSED_ARCHIVE_SUFFIX)?;
        encrypt_list_of_archives(&archives, keys, remove_unencrypted, destination, ops, out)?;
        return Ok(());
    }

    if !file_has_suffix(target, COMPRESSED_ARCHIVE_SUFFIX)
        || file_has_suffix(target, ENCRYPTED_ARCHIVE_SUFFIX)
    {
        return Err(ArchiveError::WrongFileType {
            path: target.to_path_buf(),
            expected: COMPRESSED_ARCHIVE_SUFFIX.into(),
        });
    }

    out.println(&format!(
        "{} {}",
        "Start encryption of existing archive".cyan(),
        target.display().to_string().yellow()
    ));
    encrypt_list_of_archives(
        &[target.to_path_buf()],
        keys,
        remove_unencrypted,
        destination,
        ops,
        out,
    )?;
    Ok(())
}

/// Encrypt each archive for all recipients and write the digest
/// sidecar of each encrypted output. The unencrypted pair is deleted
/// only once both encrypted artifacts exist.
pub fn encrypt_list_of_archives(
    archives: &[PathBuf],
    keys: &[String],
    remove_unencrypted: bool,
    destination: Option<&Path>,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<Vec<PathBuf>> {
    let mut encrypted = Vec::with_capacity(archives.len());

    for archive in archives {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let out_dir = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| archive.parent().unwrap_or(Path::new(".")).to_path_buf());
        let out_path = out_dir.join(format!("{}.gpg", name));

        out.println(&format!("Encrypting {}", archive.display()));
        ops.crypto.encrypt(archive, &out_path, keys)?;
        if !out_path.exists() {
            return Err(ArchiveError::operator(
                "gpg",
                archive.clone(),
                "encrypted output missing after run",
            ));
        }
        hasher::write_file_digest(&out_path)?;

        if remove_unencrypted {
            fs::remove_file(archive)?;
            let mut sidecar = archive.as_os_str().to_owned();
            sidecar.push(".md5");
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                fs::remove_file(&sidecar)?;
            }
        }

        encrypted.push(out_path);
    }

    Ok(encrypted)
}

/// Decrypt an archive directory (all parts) or a single `.tar.lz.gpg`
/// file, refusing directories that already hold unencrypted parts.
pub fn decrypt_existing_archive(
    target: &Path,
    destination: Option<&Path>,
    remove_encrypted: bool,
    force: bool,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<()> {
    if let Some(dest) = destination {
        handle_destination_directory_creation(dest, force)?;
    }

    if target.is_dir() {
        if !files_with_suffix(target, COMPRESSED_ARCHIVE_SUFFIX)?.is_empty() {
            return Err(ArchiveError::AlreadyDecrypted);
        }
        let archives = files_with_suffix_or_fail(target, ENCRYPTED_ARCHIVE_SUFFIX)?;
        decrypt_list_of_archives(&archives, destination, remove_encrypted, ops, out)?;
        return Ok(());
    }

    if !file_has_suffix(target, ENCRYPTED_ARCHIVE_SUFFIX) {
        return Err(ArchiveError::WrongFileType {
            path: target.to_path_buf(),
            expected: ENCRYPTED_ARCHIVE_SUFFIX.into(),
        });
    }

    out.println(&format!(
        "{} {}",
        "Start decryption of existing archive".cyan(),
        target.display().to_string().yellow()
    ));
    decrypt_list_of_archives(&[target.to_path_buf()], destination, remove_encrypted, ops, out)?;
    Ok(())
}

/// Decrypt each archive, returning the produced `.tar.lz` paths.
pub fn decrypt_list_of_archives(
    archives: &[PathBuf],
    destination: Option<&Path>,
    remove_encrypted: bool,
    ops: &Operators,
    out: &OutputCtx,
) -> Result<Vec<PathBuf>> {
    let mut decrypted = Vec::with_capacity(archives.len());

    for archive in archives {
        let name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let plain_name = name.strip_suffix(".gpg").unwrap_or(name);
        let out_dir = destination
            .map(Path::to_path_buf)
            .unwrap_or_else(|| archive.parent().unwrap_or(Path::new(".")).to_path_buf());
        let out_path = out_dir.join(plain_name);

        out.println(&format!("Decrypting {}", archive.display()));
        ops.crypto.decrypt(archive, &out_path)?;

        if remove_encrypted {
            fs::remove_file(archive)?;
            let mut sidecar = archive.as_os_str().to_owned();
            sidecar.push(".md5");
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                fs::remove_file(&sidecar)?;
            }
        }

        decrypted.push(out_path);
    }

    Ok(decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyring_ids_pass_the_existence_check() {
        encryption_keys_must_exist(&["alice@example.org".into()]).unwrap();
    }

    #[test]
    fn missing_key_files_are_rejected() {
        let err =
            encryption_keys_must_exist(&["/nonexistent/public.gpg".into()]).unwrap_err();
        assert!(matches!(err, ArchiveError::EncryptionKeyMissing(_)));
    }
}
