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

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::PathBuf;

use coldpack::archive::{self, ArchiveOptions};
use coldpack::config::{self, Config};
use coldpack::encryption;
use coldpack::extract::{self, ExtractOptions};
use coldpack::integrity::{self, CheckOutcome};
use coldpack::listing;
use coldpack::ops::Operators;
use coldpack::output::OutputCtx;
use coldpack::utils;

// ─── CLI definition ─────────────────────────────────────────────────────────

/// Coldpack — verifiable, split, checksummed, optionally-encrypted
/// cold-storage archives.
#[derive(Parser)]
#[command(
    name = "coldpack",
    version = env!("CARGO_PKG_VERSION"),
    about = "Verifiable, split, checksummed, optionally-encrypted cold-storage archives",
    after_help = concat!(
        "EXAMPLES:\n",
        "  coldpack archive ./project ./backup\n",
        "  coldpack archive ./project ./backup --split 53687091200 -c 9\n",
        "  coldpack archive ./project ./backup --encrypt key1.pub --encrypt key2.pub\n",
        "  coldpack extract ./backup ./restored\n",
        "  coldpack extract ./backup ./restored -s project/docs/readme.md\n",
        "  coldpack list ./backup\n",
        "  coldpack check ./backup --deep\n",
        "\nEXIT CODES: 0 ok, 1 usage or filesystem error, 3 integrity check failed",
        "\nCONFIG: ~/.config/coldpack/config.toml"
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output JSON instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Suppress all output except errors and final status
    #[arg(long, global = true, short = 'q')]
    quiet: bool,

    /// Append all output to this log file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an archive from a source directory or file
    Archive {
        /// Source input file or directory
        #[arg(value_name = "SOURCE")]
        source: PathBuf,
        /// Path to the archive directory which will be created
        #[arg(value_name = "ARCHIVE_DIR")]
        archive_dir: PathBuf,
        /// Worker threads for hashing and compression
        #[arg(long, short = 'n', value_name = "N")]
        threads: Option<usize>,
        /// Compression level between 0 (fastest) and 9 (slowest)
        #[arg(long, short = 'c', value_name = "LEVEL",
              value_parser = clap::value_parser!(u32).range(0..=9))]
        compression: Option<u32>,
        /// Split the archive into parts below this many bytes
        #[arg(long, value_name = "BYTES")]
        split: Option<u64>,
        /// Public key (id or key file) to encrypt for; repeatable
        #[arg(long = "encrypt", value_name = "KEY")]
        encrypt: Vec<String>,
        /// Delete the unencrypted artifacts once encryption succeeded
        #[arg(long)]
        remove_unencrypted: bool,
        /// Overwrite an existing archive directory
        #[arg(long, short)]
        force: bool,
    },

    /// Extract an archive directory or a single part file
    Extract {
        /// Archive directory or .tar.lz/.tar.lz.gpg file
        #[arg(value_name = "ARCHIVE_DIR")]
        archive_dir: PathBuf,
        /// Directory where the archive will be extracted
        #[arg(value_name = "DESTINATION")]
        destination: PathBuf,
        /// Directory or file inside the archive to extract
        #[arg(long, short = 's', value_name = "SUBPATH")]
        subpath: Option<String>,
        /// Worker threads for decompression
        #[arg(long, short = 'n', value_name = "N")]
        threads: Option<usize>,
        /// Overwrite an existing destination directory
        #[arg(long, short)]
        force: bool,
    },

    /// List contents of an archive
    List {
        /// Archive directory or .tar.lz file
        #[arg(value_name = "ARCHIVE_DIR")]
        archive_dir: PathBuf,
        /// Only list entries containing this subpath
        #[arg(value_name = "SUBPATH")]
        subpath: Option<String>,
        /// Query the archive itself instead of the listing sidecar
        #[arg(long, short)]
        deep: bool,
    },

    /// Check integrity of an archive
    Check {
        /// Archive directory or .tar.lz/.tar.lz.gpg file
        #[arg(value_name = "ARCHIVE_DIR")]
        archive_dir: PathBuf,
        /// Also extract each part and verify its content hashes
        #[arg(long, short)]
        deep: bool,
        /// Worker threads for hashing and decompression
        #[arg(long, short = 'n', value_name = "N")]
        threads: Option<usize>,
    },

    /// Encrypt an existing unencrypted archive
    Encrypt {
        /// Archive directory or .tar.lz file
        #[arg(value_name = "TARGET")]
        target: PathBuf,
        /// Public key (id or key file) to encrypt for; repeatable
        #[arg(long = "key", short = 'k', value_name = "KEY", required = true)]
        keys: Vec<String>,
        /// Write encrypted output here instead of next to the input
        #[arg(long, value_name = "DIR")]
        destination: Option<PathBuf>,
        /// Delete the unencrypted artifacts once encryption succeeded
        #[arg(long)]
        remove_unencrypted: bool,
        /// Overwrite an existing destination directory
        #[arg(long, short)]
        force: bool,
    },

    /// Decrypt an existing encrypted archive using the ambient keyring
    Decrypt {
        /// Archive directory or .tar.lz.gpg file
        #[arg(value_name = "TARGET")]
        target: PathBuf,
        /// Write decrypted output here instead of next to the input
        #[arg(long, value_name = "DIR")]
        destination: Option<PathBuf>,
        /// Delete the encrypted artifacts after decryption
        #[arg(long)]
        remove_encrypted: bool,
        /// Overwrite an existing destination directory
        #[arg(long, short)]
        force: bool,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },

    /// Print current configuration
    Config,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

fn main() {
    match run() {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            for cause in e.chain().skip(1) {
                eprintln!("  {} {}", "caused by:".yellow(), cause);
            }
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = Config::load();

    let out = OutputCtx::new(
        cli.json || cfg.output.json,
        cli.quiet || cfg.output.quiet,
        cli.log_file.as_deref(),
    )?;

    let ops = Operators::system();

    match cli.command {
        // ── Archive ─────────────────────────────────────────────────────────
        Commands::Archive {
            source,
            archive_dir,
            threads,
            compression,
            split,
            encrypt,
            remove_unencrypted,
            force,
        } => {
            utils::print_banner(&out);

            let opts = ArchiveOptions {
                threads: resolve_threads(threads, &cfg),
                compression: compression.unwrap_or(cfg.defaults.compression),
                split_bytes: split,
                encryption_keys: encrypt,
                remove_unencrypted,
                force,
                work_dir: None,
            };

            let summary = archive::create_archive(&source, &archive_dir, &opts, &ops, &out)?;

            if out.json {
                let j = serde_json::json!({
                    "archive_dir": archive_dir,
                    "parts": summary.parts,
                    "total_bytes": summary.total_bytes,
                    "encrypted": summary.encrypted,
                });
                out.raw(&serde_json::to_string_pretty(&j)?);
                out.raw("\n");
            } else {
                out.status(&format!("Archive created: {}", archive_dir.display()));
            }
            Ok(0)
        }

        // ── Extract ─────────────────────────────────────────────────────────
        Commands::Extract {
            archive_dir,
            destination,
            subpath,
            threads,
            force,
        } => {
            utils::print_banner(&out);

            let opts = ExtractOptions {
                partial: subpath,
                threads: resolve_threads(threads, &cfg),
                force,
                extract_at_destination: false,
            };
            extract::extract_archive(&archive_dir, &destination, &opts, &ops, &out)?;
            out.status(&format!("Archive extracted to: {}", destination.display()));
            Ok(0)
        }

        // ── List ────────────────────────────────────────────────────────────
        Commands::List {
            archive_dir,
            subpath,
            deep,
        } => {
            listing::create_listing(&archive_dir, subpath.as_deref(), deep, &ops, &out)?;
            Ok(0)
        }

        // ── Check ───────────────────────────────────────────────────────────
        Commands::Check {
            archive_dir,
            deep,
            threads,
        } => {
            if !out.json {
                out.status("Starting integrity check...");
            }
            let outcome = integrity::check_integrity(
                &archive_dir,
                deep,
                resolve_threads(threads, &cfg),
                &ops,
                &out,
            );
            report_check_outcome(outcome, deep, &out)
        }

        // ── Encrypt ─────────────────────────────────────────────────────────
        Commands::Encrypt {
            target,
            keys,
            destination,
            remove_unencrypted,
            force,
        } => {
            utils::print_banner(&out);
            encryption::encrypt_existing_archive(
                &target,
                &keys,
                destination.as_deref(),
                remove_unencrypted,
                force,
                &ops,
                &out,
            )?;
            out.status("Encryption complete");
            Ok(0)
        }

        // ── Decrypt ─────────────────────────────────────────────────────────
        Commands::Decrypt {
            target,
            destination,
            remove_encrypted,
            force,
        } => {
            utils::print_banner(&out);
            encryption::decrypt_existing_archive(
                &target,
                destination.as_deref(),
                remove_encrypted,
                force,
                &ops,
                &out,
            )?;
            out.status("Decryption complete");
            Ok(0)
        }

        // ── Completions ─────────────────────────────────────────────────────
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            Ok(0)
        }

        // ── Config ──────────────────────────────────────────────────────────
        Commands::Config => {
            cfg.print();
            if let Some(p) = config::config_path() {
                if !p.exists() {
                    println!();
                    println!(
                        "  {} No config file yet — create {} to set defaults.",
                        "Note:".yellow(),
                        p.display().to_string().cyan()
                    );
                }
            }
            Ok(0)
        }
    }
}

/// CLI value wins over config; a configured 0 means "auto" and is
/// passed through as None so operators pick their own default.
fn resolve_threads(cli_threads: Option<usize>, cfg: &Config) -> Option<usize> {
    cli_threads.or(if cfg.defaults.threads > 0 {
        Some(cfg.defaults.threads)
    } else {
        None
    })
}

/// Map a check outcome to the messages scripted callers parse and to
/// the process exit code.
fn report_check_outcome(outcome: CheckOutcome, deep: bool, out: &OutputCtx) -> Result<i32> {
    if out.json {
        let (status, code, detail) = match &outcome {
            CheckOutcome::Ok => ("ok", 0, serde_json::Value::Null),
            CheckOutcome::ShallowFailed { part } => (
                "shallow_failed",
                3,
                serde_json::json!({ "part": part }),
            ),
            CheckOutcome::DeepFailed { paths } => (
                "deep_failed",
                3,
                serde_json::json!({ "paths": paths }),
            ),
            CheckOutcome::SetupError { error } => (
                "setup_error",
                1,
                serde_json::json!({ "error": error.to_string() }),
            ),
        };
        let j = serde_json::json!({ "status": status, "deep": deep, "detail": detail });
        out.raw(&serde_json::to_string_pretty(&j)?);
        out.raw("\n");
        return Ok(code);
    }

    match outcome {
        CheckOutcome::Ok => {
            if deep {
                out.status("Deep integrity check successful");
            } else {
                out.status("Integrity check successful");
            }
            Ok(0)
        }
        CheckOutcome::ShallowFailed { part } => {
            let name = part
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| part.display().to_string());
            out.status(&format!("Signature of file {} has changed.", name));
            out.status("Integrity check unsuccessful. Archive has been changed since creation.");
            Ok(3)
        }
        CheckOutcome::DeepFailed { paths } => {
            for path in &paths {
                out.status(&format!("Signature of {} has changed.", path));
            }
            out.status("Deep integrity check unsuccessful. Archive has been changed since creation.");
            Ok(3)
        }
        CheckOutcome::SetupError { error } => {
            out.eprintln(&format!("Integrity check could not run: {}", error));
            Ok(1)
        }
    }
}
