// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode with scoped restoration.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr) and a raw fd write in the panic hook. These are the standard
// POSIX interfaces for terminal control. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// `RawMode` captures the terminal's attributes once, switches stdin to raw
// mode, and puts the captured snapshot back when it is disabled or dropped.
// Because restoration is tied to the guard's lifetime, every way out of the
// control loop (a normal return, the quit key, an error bubbling up to
// main, a panic unwinding) passes through it. The one exception is
// `process::exit`, which skips destructors: main drops the session first.
//
// Attribute access sits behind `AttrDevice` so the enable/disable round trip
// can be exercised against an in-memory terminal in tests.

use std::fmt;
use std::io;
use std::sync::Once;

use tracing::{debug, warn};

use crate::ansi;
use crate::error::{Result, TermError};

// ─── Attributes ─────────────────────────────────────────────────────────────

/// Default raw-mode read timeout in deciseconds (~100ms).
pub const DEFAULT_READ_TIMEOUT: u8 = 1;

/// Snapshot of a terminal's control configuration.
///
/// Wraps `termios`. Two snapshots are equal when their flag words,
/// control-character arrays, line discipline and baud rates all match, so a
/// restored terminal can be checked against the captured one field by field.
#[derive(Clone, Copy)]
pub struct TerminalAttributes(libc::termios);

impl TerminalAttributes {
    /// Wrap a raw `termios`.
    #[must_use]
    pub const fn from_termios(termios: libc::termios) -> Self {
        Self(termios)
    }

    /// The wrapped `termios`.
    #[must_use]
    pub const fn as_termios(&self) -> &libc::termios {
        &self.0
    }

    /// Derive the raw-mode configuration from these attributes.
    ///
    /// Turns off echo, canonical line buffering, signal keys, extended input
    /// processing, output post-processing, XON/XOFF flow control, CR-to-NL
    /// translation, break-to-SIGINT, parity checking and 8th-bit stripping.
    /// Forces 8-bit characters. `read()` returns as soon as any byte is
    /// available, or with nothing after `read_timeout` deciseconds.
    #[must_use]
    pub fn raw_mode(&self, read_timeout: u8) -> Self {
        let mut t = self.0;
        t.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        t.c_oflag &= !libc::OPOST;
        t.c_cflag &= !libc::CSIZE;
        t.c_cflag |= libc::CS8;
        t.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        t.c_cc[libc::VMIN] = 0;
        t.c_cc[libc::VTIME] = read_timeout;
        Self(t)
    }
}

impl PartialEq for TerminalAttributes {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.0, &other.0);
        a.c_iflag == b.c_iflag
            && a.c_oflag == b.c_oflag
            && a.c_cflag == b.c_cflag
            && a.c_lflag == b.c_lflag
            && a.c_cc == b.c_cc
            && line_discipline(a) == line_discipline(b)
            && speeds(a) == speeds(b)
    }
}

impl Eq for TerminalAttributes {}

#[cfg(any(target_os = "linux", target_os = "android"))]
const fn line_discipline(t: &libc::termios) -> libc::cc_t {
    t.c_line
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
const fn line_discipline(_: &libc::termios) -> libc::cc_t {
    0
}

/// Input and output baud rates.
fn speeds(t: &libc::termios) -> (libc::speed_t, libc::speed_t) {
    unsafe { (libc::cfgetispeed(t), libc::cfgetospeed(t)) }
}

impl fmt::Debug for TerminalAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalAttributes")
            .field("c_iflag", &format_args!("{:#o}", self.0.c_iflag))
            .field("c_oflag", &format_args!("{:#o}", self.0.c_oflag))
            .field("c_cflag", &format_args!("{:#o}", self.0.c_cflag))
            .field("c_lflag", &format_args!("{:#o}", self.0.c_lflag))
            .field("vmin", &self.0.c_cc[libc::VMIN])
            .field("vtime", &self.0.c_cc[libc::VTIME])
            .finish_non_exhaustive()
    }
}

// ─── Devices ────────────────────────────────────────────────────────────────

/// Something whose terminal attributes can be read and replaced.
pub trait AttrDevice {
    /// Read the current attributes.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the attributes cannot be queried.
    fn get_attrs(&mut self) -> io::Result<TerminalAttributes>;

    /// Replace the attributes, discarding pending input first (`TCSAFLUSH`).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the attributes cannot be applied.
    fn set_attrs(&mut self, attrs: &TerminalAttributes) -> io::Result<()>;
}

impl<D: AttrDevice + ?Sized> AttrDevice for &mut D {
    fn get_attrs(&mut self) -> io::Result<TerminalAttributes> {
        (**self).get_attrs()
    }

    fn set_attrs(&mut self, attrs: &TerminalAttributes) -> io::Result<()> {
        (**self).set_attrs(attrs)
    }
}

/// The process's standard input, addressed by its file descriptor.
///
/// Used both as the attribute device for raw mode and, in [`input`], as
/// the byte source keys are decoded from.
///
/// [`input`]: crate::input
#[derive(Debug, Clone, Copy, Default)]
pub struct Stdin;

impl AttrDevice for Stdin {
    fn get_attrs(&mut self) -> io::Result<TerminalAttributes> {
        unsafe {
            let mut termios: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(TerminalAttributes(termios))
        }
    }

    fn set_attrs(&mut self, attrs: &TerminalAttributes) -> io::Result<()> {
        unsafe {
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const attrs.0) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

// ─── Panic Hook ─────────────────────────────────────────────────────────────

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that clears the screen before printing the error.
///
/// The raw-mode guard restores termios while the panic unwinds, but the
/// panic message is printed before unwinding starts. Clearing first keeps
/// the message off a half-drawn frame. The write goes straight to fd 1 so
/// a panic raised while stdout's lock is held cannot deadlock.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            unsafe {
                let _ = libc::write(
                    libc::STDOUT_FILENO,
                    ansi::CLEAR_AND_HOME.as_ptr().cast::<libc::c_void>(),
                    ansi::CLEAR_AND_HOME.len(),
                );
            }
            original(info);
        }));
    });
}

// ─── RawMode ────────────────────────────────────────────────────────────────

/// Raw-mode session with scoped restoration.
///
/// Created by [`enable`](Self::enable), which captures the original
/// attributes before changing anything. The original attributes are put
/// back by [`disable`](Self::disable) or, failing an explicit call, when
/// the session is dropped.
///
/// # Example
///
/// ```no_run
/// use memori_term::terminal::{RawMode, Stdin, DEFAULT_READ_TIMEOUT};
///
/// let session = RawMode::enable(Stdin, DEFAULT_READ_TIMEOUT)?;
/// // ... read keys, draw frames ...
/// drop(session); // terminal restored
/// # Ok::<(), memori_term::TermError>(())
/// ```
pub struct RawMode<D: AttrDevice = Stdin> {
    device: D,
    /// Attributes captured before raw mode was applied.
    original: TerminalAttributes,
    active: bool,
}

impl<D: AttrDevice> RawMode<D> {
    /// Capture the device's attributes and switch it to raw mode.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::AttributeQuery`] if the attributes cannot be
    /// read, or [`TermError::AttributeApply`] if raw mode cannot be
    /// applied. On an apply failure the original attributes are put back
    /// best-effort, since `tcsetattr` may have applied part of the change.
    pub fn enable(mut device: D, read_timeout: u8) -> Result<Self> {
        install_panic_hook();

        let original = device.get_attrs().map_err(TermError::AttributeQuery)?;
        let raw = original.raw_mode(read_timeout);

        if let Err(e) = device.set_attrs(&raw) {
            let _ = device.set_attrs(&original);
            return Err(TermError::AttributeApply(e));
        }

        debug!(read_timeout, "raw mode enabled");
        Ok(Self {
            device,
            original,
            active: true,
        })
    }

    /// Put the original attributes back.
    ///
    /// Idempotent: disabling an inactive session is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::AttributeApply`] if the attributes cannot be
    /// restored. The session stays active so a later drop tries again.
    pub fn disable(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.device
            .set_attrs(&self.original)
            .map_err(TermError::AttributeApply)?;
        self.active = false;
        debug!("terminal attributes restored");
        Ok(())
    }

    /// Whether raw mode is currently applied.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// The attributes captured at [`enable`](Self::enable).
    #[inline]
    #[must_use]
    pub const fn original(&self) -> &TerminalAttributes {
        &self.original
    }
}

impl<D: AttrDevice> Drop for RawMode<D> {
    fn drop(&mut self) {
        if let Err(e) = self.disable() {
            warn!(error = %e, "failed to restore terminal attributes");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
