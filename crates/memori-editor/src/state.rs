// SPDX-License-Identifier: MIT
//! Editor state — cursor, viewport, and key handling.
//!
//! The cursor lives in viewport coordinates, 0-indexed, and never leaves the
//! viewport: every movement clamps at the edges, so pressing an arrow at a
//! boundary is a no-op rather than an error.

use tracing::trace;

use memori_term::input::{ctrl, KeyEvent};
use memori_term::size::WindowSize;

/// What the control loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep running.
    Continue,
    /// Clear the screen, restore the terminal, exit 0.
    Quit,
}

/// A 0-indexed screen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub row: u16,
    pub col: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The byte that quits the editor (Ctrl-Q).
pub const QUIT_KEY: u8 = ctrl(b'q');

/// Cursor, viewport and the single displayable line.
#[derive(Debug, Clone)]
pub struct EditorState {
    cursor: CursorPosition,
    size: WindowSize,
    line: Option<String>,
}

impl EditorState {
    /// Start at the top-left corner of a `size` viewport.
    #[must_use]
    pub fn new(size: WindowSize, line: Option<String>) -> Self {
        Self {
            cursor: CursorPosition::default(),
            size,
            line,
        }
    }

    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> WindowSize {
        self.size
    }

    /// The loaded line, if the file had one.
    #[inline]
    #[must_use]
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    /// Apply one key event.
    ///
    /// | Key                   | Effect                       |
    /// |-----------------------|------------------------------|
    /// | Ctrl-Q                | quit                         |
    /// | ←/`h` →/`l` ↑/`k` ↓/`j` | one step, clamped          |
    /// | PageUp / PageDown     | one screen height, clamped   |
    /// | Home / End            | first / last column          |
    ///
    /// Everything else is ignored.
    pub fn apply(&mut self, key: KeyEvent) -> Action {
        trace!(?key, "apply");
        match key {
            KeyEvent::Char(QUIT_KEY) => return Action::Quit,
            KeyEvent::ArrowUp | KeyEvent::Char(b'k') => self.step(Direction::Up),
            KeyEvent::ArrowDown | KeyEvent::Char(b'j') => self.step(Direction::Down),
            KeyEvent::ArrowLeft | KeyEvent::Char(b'h') => self.step(Direction::Left),
            KeyEvent::ArrowRight | KeyEvent::Char(b'l') => self.step(Direction::Right),
            KeyEvent::PageUp => self.page(Direction::Up),
            KeyEvent::PageDown => self.page(Direction::Down),
            KeyEvent::Home => self.cursor.col = 0,
            KeyEvent::End => self.cursor.col = self.size.cols.saturating_sub(1),
            KeyEvent::Delete | KeyEvent::Char(_) => {}
        }
        Action::Continue
    }

    /// Move one cell, staying inside the viewport.
    fn step(&mut self, direction: Direction) {
        let c = &mut self.cursor;
        match direction {
            Direction::Up => c.row = c.row.saturating_sub(1),
            Direction::Down => {
                if c.row + 1 < self.size.rows {
                    c.row += 1;
                }
            }
            Direction::Left => c.col = c.col.saturating_sub(1),
            Direction::Right => {
                if c.col + 1 < self.size.cols {
                    c.col += 1;
                }
            }
        }
    }

    /// Repeat a vertical step once per screen row.
    fn page(&mut self, direction: Direction) {
        for _ in 0..self.size.rows {
            self.step(direction);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
