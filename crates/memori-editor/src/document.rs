// SPDX-License-Identifier: MIT
//! Document — the file named on the command line.
//!
//! memori shows a single line of text: the first line of the file, with its
//! line terminator removed. An empty file has no line at all, which is what
//! makes the welcome banner appear.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use memori_term::error::{Result, TermError};

/// A file opened for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    first_line: Option<String>,
}

impl Document {
    /// Open `path` and read its first line.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::FileOpen`] if the file cannot be opened or read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let first_line = read_first_line(path).map_err(|source| TermError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            len = first_line.as_ref().map_or(0, String::len),
            "document loaded"
        );
        Ok(Self {
            path: path.to_path_buf(),
            first_line,
        })
    }

    /// Where the document was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The first line, without its terminator. `None` for an empty file.
    #[must_use]
    pub fn first_line(&self) -> Option<&str> {
        self.first_line.as_deref()
    }

    /// Give up the document, keeping only its first line.
    #[must_use]
    pub fn into_first_line(self) -> Option<String> {
        self.first_line
    }
}

fn read_first_line(path: &Path) -> io::Result<Option<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut raw = Vec::new();
    if reader.read_until(b'\n', &mut raw)? == 0 {
        return Ok(None);
    }
    while matches!(raw.last(), Some(b'\n' | b'\r')) {
        raw.pop();
    }
    Ok(Some(String::from_utf8_lossy(&raw).into_owned()))
}

// ─── Tests ──────────────────────────────────────────────────────────────────
