// SPDX-License-Identifier: MIT
//
// Window size discovery.
//
// Safety: `query_size` uses `unsafe` for `ioctl(TIOCGWINSZ)` and the zeroed
// `winsize` it fills. That is the standard POSIX way to ask for the terminal
// size. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// The direct route is `ioctl(TIOCGWINSZ)` on stdout. Some terminals answer
// it with zeros, and some environments reject it, so there is a fallback:
// push the cursor to the bottom-right corner, ask the terminal where the
// cursor ended up, and read the answer from stdin.
//
// The fallback is a heuristic. It moves the cursor 999 cells right and down
// and trusts the terminal to clamp at its edges. A terminal larger than
// 999×999 reports a short size, and a terminal that does not answer the
// position request makes the probe fail. Treat the result as approximate.

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::ansi;
use crate::error::{Result, TermError};
use crate::input::{ByteSource, ESC};

// ─── WindowSize ─────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells. Both are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSize {
    /// Number of rows (height in character cells).
    pub rows: u16,
    /// Number of columns (width in character cells).
    pub cols: u16,
}

impl WindowSize {
    /// A size with both dimensions positive, or `None`.
    #[must_use]
    pub const fn new(rows: u16, cols: u16) -> Option<Self> {
        if rows == 0 || cols == 0 {
            None
        } else {
            Some(Self { rows, cols })
        }
    }
}

// ─── Direct Query ───────────────────────────────────────────────────────────

/// Query the terminal size via `ioctl(TIOCGWINSZ)` on stdout.
///
/// Returns `None` if the ioctl fails or reports a zero dimension.
#[must_use]
pub fn query_size() -> Option<WindowSize> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &raw mut ws) };

    if result == -1 {
        return None;
    }
    WindowSize::new(ws.ws_row, ws.ws_col)
}

// ─── Cursor-Report Fallback ─────────────────────────────────────────────────

/// Upper bound on the cursor report we are willing to read.
///
/// `ESC [ 65535 ; 65535` is 14 bytes; anything near this long is not a
/// position report.
const REPORT_BUF_LEN: usize = 32;

/// Parse the body of a cursor position report.
///
/// `reply` is everything before the terminating `R`: `ESC [ <row> ; <col>`.
/// Both numbers must be plain positive decimals that fit in a `u16`.
#[must_use]
pub fn parse_cursor_report(reply: &[u8]) -> Option<WindowSize> {
    let body = reply.strip_prefix(&[ESC, b'['])?;
    let sep = body.iter().position(|&b| b == b';')?;
    let rows = parse_decimal(&body[..sep])?;
    let cols = parse_decimal(&body[sep + 1..])?;
    WindowSize::new(rows, cols)
}

/// Digits only: no sign, no whitespace, no empty field.
fn parse_decimal(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Read a cursor report from `input` up to and excluding the `R`.
///
/// Returns `None` if the input times out or the bound is hit first.
fn read_cursor_report(input: &mut impl ByteSource) -> Result<Option<Vec<u8>>> {
    let mut reply = Vec::with_capacity(REPORT_BUF_LEN);
    while reply.len() < REPORT_BUF_LEN - 1 {
        match input.read_byte()? {
            Some(b'R') => return Ok(Some(reply)),
            Some(byte) => reply.push(byte),
            None => break,
        }
    }
    debug!(reply = ?reply, "cursor report ended without terminator");
    Ok(None)
}

/// Determine the window size.
///
/// `direct` is the result of the direct query ([`query_size`] in
/// production). If it is `None`, the cursor-report fallback runs: the
/// corner move and position request are written to `out`, and the reply is
/// read from `input`.
///
/// # Errors
///
/// Returns [`TermError::WindowSize`] if the reply is missing, unterminated,
/// or malformed; [`TermError::Write`] or [`TermError::Read`] if the probe
/// I/O itself fails.
pub fn probe(
    direct: Option<WindowSize>,
    out: &mut impl Write,
    input: &mut impl ByteSource,
) -> Result<WindowSize> {
    if let Some(size) = direct {
        return Ok(size);
    }

    debug!("TIOCGWINSZ unavailable, probing with cursor report");
    send_probe(out).map_err(TermError::Write)?;

    let Some(reply) = read_cursor_report(input)? else {
        warn!("terminal did not answer the cursor position request");
        return Err(TermError::WindowSize("no cursor position report".into()));
    };

    parse_cursor_report(&reply).ok_or_else(|| {
        warn!(reply = ?reply, "malformed cursor report");
        TermError::WindowSize("malformed cursor position report".into())
    })
}

fn send_probe(out: &mut impl Write) -> io::Result<()> {
    ansi::cursor_to_far_corner(out)?;
    ansi::request_cursor_position(out)?;
    out.flush()
}

/// Determine the size of the terminal on stdout.
///
/// Runs the direct query, falling back to the cursor report written to
/// `out` and read back from `input` (the key decoder's source, so no reply
/// byte is lost to a second reader). Must run in raw mode when the fallback
/// is needed, so the reply is neither echoed nor held back by line
/// buffering.
///
/// # Errors
///
/// See [`probe`].
pub fn get_size(out: &mut impl Write, input: &mut impl ByteSource) -> Result<WindowSize> {
    probe(query_size(), out, input)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
