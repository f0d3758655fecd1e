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
//! Output context — respects --quiet, --json, and --log-file flags.
//!
//! Diagnostics go through [`OutputCtx::println`] (suppressed by quiet);
//! the final status lines scripted callers parse go through
//! [`OutputCtx::status`], which always reaches stdout.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::utils::log_timestamp;

/// Shared output context passed through all commands.
#[derive(Clone)]
pub struct OutputCtx {
    pub json: bool,
    pub quiet: bool,
    log: Option<Arc<Mutex<File>>>,
}

impl OutputCtx {
    pub fn new(json: bool, quiet: bool, log_file: Option<&Path>) -> Result<Self> {
        let log = if let Some(path) = log_file {
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", path.display(), e))?;
            Some(Arc::new(Mutex::new(f)))
        } else {
            None
        };
        Ok(Self { json, quiet, log })
    }

    /// Context with no flags set, for library callers and tests.
    pub fn silent() -> Self {
        Self {
            json: false,
            quiet: true,
            log: None,
        }
    }

    /// Print a diagnostic line to stdout (unless quiet), and to the log file.
    pub fn println(&self, line: &str) {
        if !self.quiet {
            println!("{}", line);
        }
        self.write_log(line);
    }

    /// Always print to stderr + log file.
    pub fn eprintln(&self, line: &str) {
        eprintln!("{}", line);
        self.write_log(&format!("ERROR: {}", line));
    }

    /// A final status line: always printed to stdout, quiet or not.
    pub fn status(&self, line: &str) {
        println!("{}", line);
        self.write_log(line);
    }

    /// Print a raw string to stdout regardless of quiet mode (for JSON
    /// and listing output).
    pub fn raw(&self, s: &str) {
        print!("{}", s);
    }

    fn write_log(&self, line: &str) {
        if let Some(log) = &self.log {
            let plain = strip_ansi(line);
            let mut f = log.lock().unwrap();
            let _ = writeln!(f, "{} {}", log_timestamp(), plain);
        }
    }
}

/// Remove ANSI escape sequences for clean log output.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // consume until 'm'
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == 'm' {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
