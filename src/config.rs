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
//! ~/.config/coldpack/config.toml — user-controlled defaults.

use std::fs;
use std::path::PathBuf;

use colored::Colorize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Worker threads for hashing and compression (0 = auto)
    pub threads: usize,
    /// Compression level 0 (fastest) to 9 (smallest)
    pub compression: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Suppress non-error output
    pub quiet: bool,
    /// Output JSON instead of human-readable text
    pub json: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            compression: 6,
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("coldpack").join("config.toml"))
}

impl Config {
    /// Load config from disk, falling back to defaults if missing.
    pub fn load() -> Self {
        if let Some(path) = config_path() {
            if path.exists() {
                match fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| toml::from_str(&text).map_err(|e| e.to_string()))
                {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!(
                            "{} Could not parse config at {}: {}",
                            "warning:".yellow(),
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
        Config::default()
    }

    /// Print current config in a readable table.
    pub fn print(&self) {
        println!("{}", "─".repeat(60).dimmed());
        println!("{}", "  Current Configuration".cyan().bold());
        println!("{}", "─".repeat(60).dimmed());

        let p = config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".into());
        println!("  {} {}", "Config file:".dimmed(), p.yellow());
        println!();

        println!("  [defaults]");
        println!(
            "    threads      = {}",
            self.defaults.threads.to_string().yellow()
        );
        println!(
            "    compression  = {}",
            self.defaults.compression.to_string().yellow()
        );

        println!();
        println!("  [output]");
        println!("    quiet        = {}", self.output.quiet.to_string().yellow());
        println!("    json         = {}", self.output.json.to_string().yellow());

        println!("{}", "─".repeat(60).dimmed());
    }
}
