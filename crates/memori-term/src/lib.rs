// SPDX-License-Identifier: MIT
//
// memori-term — Terminal layer for memori.
//
// Everything that touches the controlling terminal lives here: the raw-mode
// session and its restoration guard, the key decoder that turns stdin bytes
// into key events, the window-size probe with its cursor-report fallback,
// and the frame buffer that lets a whole screen go out in one write.
//
// No TUI framework sits underneath. Raw termios through libc, hand-written
// ANSI sequences, and small traits at the I/O seams so the state machines
// can be tested without a TTY.

#[cfg(not(unix))]
compile_error!("memori-term drives the terminal through POSIX termios and needs a unix target");

pub mod ansi;
pub mod error;
pub mod input;
pub mod output;
pub mod size;
pub mod terminal;

pub use error::{Result, TermError};
