// SPDX-License-Identifier: MIT
//
// Error taxonomy for terminal and file failures.
//
// Every variant is fatal at the point it is detected. The binary applies a
// single policy to all of them: clear the screen, print the diagnostic with
// the underlying OS error, exit non-zero. Malformed escape sequences and
// read timeouts are not errors and never show up here.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A fatal terminal-control or file failure.
#[derive(Error, Debug)]
pub enum TermError {
    /// `tcgetattr` failed while capturing the original attributes.
    #[error("tcgetattr: {0}")]
    AttributeQuery(#[source] io::Error),

    /// `tcsetattr` failed while entering or leaving raw mode.
    #[error("tcsetattr: {0}")]
    AttributeApply(#[source] io::Error),

    /// Neither the ioctl nor the cursor-report probe produced a size.
    #[error("window size: {0}")]
    WindowSize(String),

    /// The file named on the command line could not be read.
    #[error("{}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a frame or control sequence to stdout failed.
    #[error("write: {0}")]
    Write(#[source] io::Error),

    /// Reading a byte from stdin failed for a reason other than a timeout.
    #[error("read: {0}")]
    Read(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TermError>;
