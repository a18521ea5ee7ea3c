// SPDX-License-Identifier: MIT
//
// Frame output buffering.
//
// A frame is assembled in memory and leaves the process in a single
// write() call. The terminal never sees half a frame: no cursor flashing
// through rows mid-redraw, no torn screen if the next key arrives early.

use std::io::{self, Write};
use std::mem;

use crate::error::{Result, TermError};

/// An append-only byte buffer holding one screen frame.
///
/// Grows as needed; nothing already appended is ever edited. The frame is
/// either handed out with [`take`](Self::take) or written with
/// [`flush_to`](Self::flush_to), both of which leave the buffer empty.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

/// Enough for an 80×24 screen of text plus escapes without reallocating.
const DEFAULT_CAPACITY: usize = 4096;

impl FrameBuffer {
    /// Create an empty buffer with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    /// Append `bytes` to the end of the frame.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes accumulated.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Move the accumulated frame out, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        mem::take(&mut self.buf)
    }

    /// Drop the accumulated bytes, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write the whole frame to `w` in one call, then discard it.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Write`] if the write or flush fails. The frame
    /// is discarded either way; a partially delivered frame is not retried.
    pub fn flush_to(&mut self, w: &mut impl Write) -> Result<()> {
        let frame = self.take();
        if frame.is_empty() {
            return Ok(());
        }
        w.write_all(&frame).map_err(TermError::Write)?;
        w.flush().map_err(TermError::Write)
    }
}

impl Write for FrameBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing goes through flush_to().
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
