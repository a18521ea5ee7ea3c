// SPDX-License-Identifier: MIT
//! View — composes the editor state into a full-screen frame.
//!
//! Every refresh redraws the whole viewport. The frame is assembled in a
//! [`FrameBuffer`] and written with a single call:
//!
//! ```text
//! ESC[?25l  ESC[H                 hide cursor, home
//! <row 0>   ESC[K  \r\n           content, tilde, or banner, then erase
//! ...
//! <row N-1> ESC[K                 no separator after the last row
//! ESC[<r>;<c>H  ESC[?25h          place and show the cursor
//! ```
//!
//! Row content:
//!
//! - row 0 shows the loaded line, cut to the viewport width
//! - with no line loaded, row `rows / 3` shows the centered welcome banner
//! - every other row is a `~`

use std::io::Write;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use memori_term::ansi;
use memori_term::error::{Result, TermError};
use memori_term::output::FrameBuffer;

use crate::state::EditorState;

/// Marker drawn on rows past the end of the content.
const FILLER: &[u8] = b"~";

/// Row separator. Output post-processing is off in raw mode, so `\n` alone
/// would not return the carriage.
const ROW_SEPARATOR: &[u8] = b"\r\n";

/// The welcome banner shown when there is nothing to display.
#[must_use]
pub fn banner() -> String {
    format!("Memori editor -- version {}", env!("CARGO_PKG_VERSION"))
}

/// The longest prefix of `text` that fits in `cols` display columns.
///
/// Cuts on grapheme boundaries, so a wide character or a combining sequence
/// that would straddle the edge is dropped whole.
#[must_use]
pub fn fit_width(text: &str, cols: usize) -> &str {
    let mut used = 0;
    for (start, grapheme) in text.grapheme_indices(true) {
        used += grapheme.width();
        if used > cols {
            return &text[..start];
        }
    }
    text
}

/// Builds frames for an [`EditorState`].
///
/// Holds the frame buffer between refreshes so its allocation is reused.
/// Each frame is still built from scratch and discarded once written.
#[derive(Debug)]
pub struct Renderer {
    frame: FrameBuffer,
    banner: String,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame: FrameBuffer::new(),
            banner: banner(),
        }
    }

    /// The frame built by the last [`draw`](Self::draw).
    #[must_use]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Compose one frame for `state`, replacing any unflushed frame.
    ///
    /// # Errors
    ///
    /// Appending to the in-memory frame does not fail in practice; an error
    /// would surface as [`TermError::Write`].
    pub fn draw(&mut self, state: &EditorState) -> Result<()> {
        self.frame.clear();
        self.compose(state).map_err(TermError::Write)
    }

    /// Draw a frame for `state` and write it to `w` in one call.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Write`] if writing to `w` fails.
    pub fn refresh(&mut self, state: &EditorState, w: &mut impl Write) -> Result<()> {
        self.draw(state)?;
        self.frame.flush_to(w)
    }

    fn compose(&mut self, state: &EditorState) -> std::io::Result<()> {
        let out = &mut self.frame;
        ansi::cursor_hide(out)?;
        ansi::cursor_home(out)?;

        let size = state.size();
        let cols = usize::from(size.cols);
        let banner_row = size.rows / 3;

        for row in 0..size.rows {
            match state.line() {
                Some(line) if row == 0 => out.append(fit_width(line, cols).as_bytes()),
                None if row == banner_row => draw_banner(out, &self.banner, cols),
                _ => out.append(FILLER),
            }
            ansi::erase_line(out)?;
            if row + 1 < size.rows {
                out.append(ROW_SEPARATOR);
            }
        }

        let cursor = state.cursor();
        ansi::cursor_to(out, cursor.row, cursor.col)?;
        ansi::cursor_show(out)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Center `banner` in a `cols`-wide row, with a `~` in the left margin.
fn draw_banner(out: &mut FrameBuffer, banner: &str, cols: usize) {
    let text = fit_width(banner, cols);
    let mut padding = (cols - text.width()) / 2;
    if padding > 0 {
        out.append(FILLER);
        padding -= 1;
    }
    out.append(" ".repeat(padding).as_bytes());
    out.append(text.as_bytes());
}

// ─── Tests ──────────────────────────────────────────────────────────────────
