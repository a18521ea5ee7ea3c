// SPDX-License-Identifier: MIT
//! Configuration loaded from `~/.memori/config.toml`.
//!
//! Every field has a default, so the file is optional and may be partial:
//!
//! ```toml
//! [terminal]
//! # Raw-mode read timeout in tenths of a second (1..=255).
//! read_timeout = 1
//!
//! [log]
//! # Used when MEMORI_LOG is not set. Any tracing filter directive works.
//! level = "debug"
//! # Defaults to ~/.memori/memori.log
//! file = "/tmp/memori.log"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use memori_term::terminal::DEFAULT_READ_TIMEOUT;

/// Directory under `$HOME` holding the config file and the default log.
const CONFIG_DIR: &str = ".memori";
const CONFIG_FILE: &str = "config.toml";
const LOG_FILE: &str = "memori.log";

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub terminal: TerminalConfig,
    pub log: LogConfig,
}

/// Raw-mode settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// `VTIME` in deciseconds. 0 is bumped to 1 so reads never spin.
    pub read_timeout: u8,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Log settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `MEMORI_LOG` is unset.
    pub level: String,
    /// Log file. `None` means `~/.memori/memori.log`.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Where log lines go, if anywhere.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join(LOG_FILE)))
    }
}

impl Config {
    /// Load `~/.memori/config.toml`.
    ///
    /// A missing file (or no home directory) yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        match config_dir() {
            Some(dir) => Self::load_from(&dir.join(CONFIG_FILE)),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", path.display()));
            }
        };
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML for this schema.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The raw-mode read timeout, never zero.
    #[must_use]
    pub fn read_timeout(&self) -> u8 {
        self.terminal.read_timeout.max(1)
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_DIR))
}
