//! Shared fixtures and in-process operator doubles. The doubles honor
//! the same contracts as the subprocess-backed operators, so the
//! pipeline, extractor and verifier can be exercised without external
//! tools: tar via the `tar` crate, compression via gzip behind the
//! `.lz` name, encryption via a reversible byte transform.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use coldpack::error::{ArchiveError, Result};
use coldpack::ops::{compressed_name, Compressor, CryptoEngine, Operators, TarArchiver};

pub fn test_operators() -> Operators {
    Operators {
        tar: Box::new(CrateTar),
        compressor: Box::new(GzipCompressor),
        crypto: Box::new(XorCrypto),
    }
}

/// The fixture tree the end-to-end scenarios revolve around.
pub fn build_test_folder(parent: &Path) -> PathBuf {
    let root = parent.join("test-folder");
    fs::create_dir_all(root.join("folder-in-archive")).unwrap();
    fs::write(root.join("file1.txt"), b"first file content\n").unwrap();
    fs::write(root.join("folder-in-archive/file2.txt"), b"second file content\n").unwrap();
    root
}

/// Parse a listing-hash file into sorted `(relpath, digest)` pairs.
pub fn read_listing_pairs(path: &Path) -> Vec<(String, String)> {
    let text = fs::read_to_string(path).unwrap();
    let mut pairs: Vec<(String, String)> = text
        .lines()
        .filter_map(|line| line.split_once(' '))
        .map(|(digest, relpath)| (relpath.to_string(), digest.to_string()))
        .collect();
    pairs.sort();
    pairs
}

pub fn dir_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ─── tar double ─────────────────────────────────────────────────────────────

pub struct CrateTar;

fn open_maybe_compressed(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.ends_with(".lz") {
        Ok(Box::new(flate2::read::GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

impl TarArchiver for CrateTar {
    fn create(&self, out_tar: &Path, workdir: &Path, entry: &str) -> Result<()> {
        let file = File::create(out_tar)?;
        let mut builder = tar::Builder::new(file);
        let full = workdir.join(entry);
        if full.is_dir() {
            builder.append_dir_all(entry, &full)?;
        } else {
            builder.append_path_with_name(&full, entry)?;
        }
        builder.finish()?;
        Ok(())
    }

    fn create_from_list(&self, out_tar: &Path, workdir: &Path, file_list: &Path) -> Result<()> {
        let names = fs::read_to_string(file_list)?;
        let file = File::create(out_tar)?;
        let mut builder = tar::Builder::new(file);
        for rel in names.lines().filter(|l| !l.is_empty()) {
            let full = workdir.join(rel);
            if full.is_dir() {
                builder.append_dir_all(rel, &full)?;
            } else {
                builder.append_path_with_name(&full, rel)?;
            }
        }
        builder.finish()?;
        Ok(())
    }

    fn list(&self, archive: &Path, inner: Option<&str>) -> Result<String> {
        let mut ar = tar::Archive::new(open_maybe_compressed(archive)?);
        let mut out = String::new();
        for entry in ar.entries()? {
            let entry = entry?;
            let path = entry.path()?.display().to_string();
            if inner.map_or(true, |i| path.contains(i)) {
                out.push_str(&format!(
                    "-rw-r--r-- user/user {:>8} 2026-01-01 00:00 {}\n",
                    entry.size(),
                    path
                ));
            }
        }
        Ok(out)
    }

    fn extract(&self, archive: &Path, dest: &Path, inner: Option<&str>) -> Result<()> {
        let mut ar = tar::Archive::new(open_maybe_compressed(archive)?);
        match inner {
            None => {
                ar.unpack(dest)?;
            }
            Some(filter) => {
                let mut matched = false;
                for entry in ar.entries()? {
                    let mut entry = entry?;
                    let path = entry.path()?.display().to_string();
                    if path.starts_with(filter) {
                        entry.unpack_in(dest)?;
                        matched = true;
                    }
                }
                if !matched {
                    return Err(ArchiveError::operator(
                        "tar",
                        archive.to_path_buf(),
                        format!("{} not found in archive", filter),
                    ));
                }
            }
        }
        Ok(())
    }

    fn extract_stream(&self, reader: &mut dyn Read, dest: &Path) -> Result<()> {
        tar::Archive::new(reader).unpack(dest)?;
        Ok(())
    }
}

// ─── compressor double ──────────────────────────────────────────────────────

pub struct GzipCompressor;

impl Compressor for GzipCompressor {
    fn compress(&self, tar_path: &Path, level: u32, _threads: Option<usize>) -> Result<PathBuf> {
        let out_path = compressed_name(tar_path);
        let mut input = File::open(tar_path)?;
        let output = File::create(&out_path)?;
        let mut encoder =
            flate2::write::GzEncoder::new(output, flate2::Compression::new(level.min(9)));
        io::copy(&mut input, &mut encoder)?;
        encoder.finish()?.sync_all()?;
        fs::remove_file(tar_path)?;
        Ok(out_path)
    }

    fn reader(&self, archive: &Path, _threads: Option<usize>) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(flate2::read::GzDecoder::new(File::open(archive)?)))
    }

    fn uncompressed_size(&self, archive: &Path) -> Result<u64> {
        let mut decoder = flate2::read::GzDecoder::new(File::open(archive)?);
        Ok(io::copy(&mut decoder, &mut io::sink())?)
    }
}

// ─── crypto double ──────────────────────────────────────────────────────────

/// Reversible byte transform standing in for public-key encryption.
/// The output is never a valid gzip stream, so anything skipping the
/// decrypt step fails loudly.
pub struct XorCrypto;

const XOR_KEY: u8 = 0x5a;

impl CryptoEngine for XorCrypto {
    fn encrypt(&self, input: &Path, output: &Path, recipients: &[String]) -> Result<()> {
        assert!(!recipients.is_empty(), "encrypt without recipients");
        xor_copy(input, output)
    }

    fn decrypt(&self, input: &Path, output: &Path) -> Result<()> {
        xor_copy(input, output)
    }
}

fn xor_copy(input: &Path, output: &Path) -> Result<()> {
    let bytes: Vec<u8> = fs::read(input)?.iter().map(|b| b ^ XOR_KEY).collect();
    let mut f = File::create(output)?;
    f.write_all(&bytes)?;
    f.sync_all()?;
    Ok(())
}
