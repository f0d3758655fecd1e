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
//! External operator seam: tar, compression and public-key encryption.
//!
//! The pipeline, extractor and verifier only speak to these traits.
//! The default implementations shell out to `tar`, `plzip` and `gpg`;
//! tests substitute in-process doubles.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Output, Stdio};

use crate::error::{ArchiveError, Result};

// ─── Traits ─────────────────────────────────────────────────────────────────

pub trait TarArchiver: Send + Sync {
    /// Build `out_tar` from a single positional entry, relative to `workdir`.
    fn create(&self, out_tar: &Path, workdir: &Path, entry: &str) -> Result<()>;

    /// Build `out_tar` from a newline-separated list of relative paths.
    fn create_from_list(&self, out_tar: &Path, workdir: &Path, file_list: &Path) -> Result<()>;

    /// Verbose listing of a (possibly compressed) tar, optionally
    /// narrowed to one inner path.
    fn list(&self, archive: &Path, inner: Option<&str>) -> Result<String>;

    /// Extract from a tar file on disk, optionally only `inner`.
    fn extract(&self, archive: &Path, dest: &Path, inner: Option<&str>) -> Result<()>;

    /// Extract a tar stream, so a decompressed tar never touches disk.
    fn extract_stream(&self, reader: &mut dyn Read, dest: &Path) -> Result<()>;
}

pub trait Compressor: Send + Sync {
    /// Compress `tar_path` in place, producing `<tar_path>.lz` and
    /// removing the input. Returns the compressed path.
    fn compress(&self, tar_path: &Path, level: u32, threads: Option<usize>) -> Result<PathBuf>;

    /// Streaming decode of a compressed archive.
    fn reader(&self, archive: &Path, threads: Option<usize>) -> Result<Box<dyn Read + Send>>;

    /// Uncompressed payload size, for capacity prechecks.
    fn uncompressed_size(&self, archive: &Path) -> Result<u64>;
}

pub trait CryptoEngine: Send + Sync {
    /// Encrypt `input` to `output` for all `recipients`.
    fn encrypt(&self, input: &Path, output: &Path, recipients: &[String]) -> Result<()>;

    /// Decrypt `input` to `output` using the ambient keyring.
    fn decrypt(&self, input: &Path, output: &Path) -> Result<()>;
}

/// The bundle handed through every archive operation.
pub struct Operators {
    pub tar: Box<dyn TarArchiver>,
    pub compressor: Box<dyn Compressor>,
    pub crypto: Box<dyn CryptoEngine>,
}

impl Operators {
    /// Subprocess-backed defaults: `tar`, `plzip`, `gpg`.
    pub fn system() -> Self {
        Self {
            tar: Box::new(SystemTar),
            compressor: Box::new(SystemPlzip),
            crypto: Box::new(SystemGpg),
        }
    }
}

// ─── Shared subprocess plumbing ─────────────────────────────────────────────

fn run_checked(name: &'static str, subject: &Path, cmd: &mut Command) -> Result<Output> {
    let output = cmd
        .output()
        .map_err(|e| ArchiveError::operator(name, subject, format!("cannot spawn: {}", e)))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ArchiveError::operator(
            name,
            subject,
            format!("{} — {}", output.status, stderr.trim()),
        ));
    }
    Ok(output)
}

/// Reader over a child's stdout that reaps the child when dropped.
struct ChildStreamReader {
    child: Child,
    stdout: ChildStdout,
}

impl Read for ChildStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for ChildStreamReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ─── tar ────────────────────────────────────────────────────────────────────

pub struct SystemTar;

impl TarArchiver for SystemTar {
    fn create(&self, out_tar: &Path, workdir: &Path, entry: &str) -> Result<()> {
        // -C gives the relative entry names the sidecar formats rely on.
        run_checked(
            "tar",
            out_tar,
            Command::new("tar")
                .arg("-cf")
                .arg(out_tar)
                .arg("-C")
                .arg(workdir)
                .arg(entry),
        )?;
        Ok(())
    }

    fn create_from_list(&self, out_tar: &Path, workdir: &Path, file_list: &Path) -> Result<()> {
        run_checked(
            "tar",
            out_tar,
            Command::new("tar")
                .arg("-cf")
                .arg(out_tar)
                .arg("-C")
                .arg(workdir)
                .arg("--files-from")
                .arg(file_list),
        )?;
        Ok(())
    }

    fn list(&self, archive: &Path, inner: Option<&str>) -> Result<String> {
        let mut cmd = Command::new("tar");
        cmd.arg("-tvf").arg(archive);
        if let Some(inner) = inner {
            cmd.arg(inner);
        }
        let output = run_checked("tar", archive, &mut cmd)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn extract(&self, archive: &Path, dest: &Path, inner: Option<&str>) -> Result<()> {
        let mut cmd = Command::new("tar");
        cmd.arg("-xf").arg(archive).arg("-C").arg(dest);
        if let Some(inner) = inner {
            cmd.arg(inner);
        }
        run_checked("tar", archive, &mut cmd)?;
        Ok(())
    }

    fn extract_stream(&self, reader: &mut dyn Read, dest: &Path) -> Result<()> {
        let mut child = Command::new("tar")
            .arg("-x")
            .arg("-C")
            .arg(dest)
            .stdin(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ArchiveError::operator("tar", dest, format!("cannot spawn: {}", e)))?;

        {
            let mut stdin = child.stdin.take().expect("piped stdin");
            io::copy(reader, &mut stdin)?;
            stdin.flush()?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| ArchiveError::operator("tar", dest, e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ArchiveError::operator(
                "tar",
                dest,
                format!("{} — {}", output.status, stderr.trim()),
            ));
        }
        Ok(())
    }
}

// ─── plzip ──────────────────────────────────────────────────────────────────

pub struct SystemPlzip;

impl Compressor for SystemPlzip {
    fn compress(&self, tar_path: &Path, level: u32, threads: Option<usize>) -> Result<PathBuf> {
        let mut cmd = Command::new("plzip");
        cmd.arg(tar_path).arg(format!("-{}", level.min(9)));
        if let Some(n) = threads {
            cmd.arg("--threads").arg(n.to_string());
        }
        run_checked("plzip", tar_path, &mut cmd)?;

        let compressed = compressed_name(tar_path);
        if !compressed.exists() {
            return Err(ArchiveError::operator(
                "plzip",
                tar_path,
                "compressed output missing after run",
            ));
        }
        Ok(compressed)
    }

    fn reader(&self, archive: &Path, threads: Option<usize>) -> Result<Box<dyn Read + Send>> {
        let mut cmd = Command::new("plzip");
        cmd.arg("-dc").arg(archive);
        if let Some(n) = threads {
            cmd.arg("--threads").arg(n.to_string());
        }
        let mut child = cmd
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ArchiveError::operator("plzip", archive, format!("cannot spawn: {}", e)))?;
        let stdout = child.stdout.take().expect("piped stdout");
        Ok(Box::new(ChildStreamReader { child, stdout }))
    }

    fn uncompressed_size(&self, archive: &Path) -> Result<u64> {
        let output = run_checked(
            "plzip",
            archive,
            Command::new("plzip").arg("-l").arg(archive),
        )?;
        let text = String::from_utf8_lossy(&output.stdout);
        parse_list_output(&text).ok_or_else(|| {
            ArchiveError::operator("plzip", archive, "unparseable --list output")
        })
    }
}

/// `<path>.lz`, keeping the existing multi-dot name intact.
pub fn compressed_name(tar_path: &Path) -> PathBuf {
    let mut name: OsString = tar_path.as_os_str().to_owned();
    name.push(".lz");
    PathBuf::from(name)
}

/// First data row of `plzip -l` holds the uncompressed size in column one.
fn parse_list_output(text: &str) -> Option<u64> {
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() >= 4 {
            if let Ok(size) = tokens[0].parse::<u64>() {
                return Some(size);
            }
        }
    }
    None
}

// ─── gpg ────────────────────────────────────────────────────────────────────

pub struct SystemGpg;

impl CryptoEngine for SystemGpg {
    fn encrypt(&self, input: &Path, output: &Path, recipients: &[String]) -> Result<()> {
        let mut cmd = Command::new("gpg");
        cmd.arg("--batch")
            .arg("--yes")
            .arg("--output")
            .arg(output)
            .arg("--encrypt");
        for key in recipients {
            // A key may be a key file on disk or an id in the keyring.
            if Path::new(key).exists() {
                cmd.arg("--recipient-file").arg(key);
            } else {
                cmd.arg("--recipient").arg(key);
            }
        }
        cmd.arg(input);
        run_checked("gpg", input, &mut cmd)?;
        Ok(())
    }

    fn decrypt(&self, input: &Path, output: &Path) -> Result<()> {
        run_checked(
            "gpg",
            input,
            Command::new("gpg")
                .arg("--batch")
                .arg("--yes")
                .arg("--output")
                .arg(output)
                .arg("--decrypt")
                .arg(input),
        )?;
        Ok(())
    }
}
