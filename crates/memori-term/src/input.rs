// SPDX-License-Identifier: MIT
//
// Key decoding.
//
// Safety: reading stdin uses `unsafe` for a one-byte `libc::read` on fd 0.
// Raw mode's bounded wait (VMIN = 0, VTIME > 0) is only visible through
// `read(2)` itself: a zero-byte return is the timeout.
#![allow(unsafe_code)]
//
// Turns the raw stdin byte stream into key events. A plain byte is a
// character. An ESC byte may start a navigation-key sequence:
//
//   ESC [ A/B/C/D      arrows
//   ESC [ H/F          Home / End
//   ESC [ <digit> ~    Home, End, PageUp, PageDown, Delete
//   ESC O H/F          Home / End (application cursor mode)
//
// # Design
//
// Matching is a small state machine (`State` + `step`) over at most three
// bytes after the ESC. The decoder reads those bytes one at a time in raw
// mode's bounded-wait reads. If a read times out the ESC is reported on its
// own. Bytes are consumed in order and never pushed back, so an unrecognized
// sequence costs the bytes already read and yields a literal ESC; nothing
// is carried into the next call.
//
// The byte source is a trait so the state machine can be driven from a
// byte slice in tests.

use std::io;

use tracing::trace;

use crate::error::{Result, TermError};
use crate::terminal::Stdin;

// ─── Key Events ─────────────────────────────────────────────────────────────

/// The escape byte (0x1B).
pub const ESC: u8 = 0x1B;

/// The byte a terminal sends for Ctrl + `key`.
///
/// Ctrl strips bits 5 and 6: `ctrl(b'q')` is 0x11.
#[inline]
#[must_use]
pub const fn ctrl(key: u8) -> u8 {
    key & 0x1F
}

/// One decoded keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// A byte passed through as-is (printable, control, or a lone ESC).
    Char(u8),
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
}

// ─── Byte Sources ───────────────────────────────────────────────────────────

/// A stream of input bytes read one at a time.
pub trait ByteSource {
    /// Read the next byte.
    ///
    /// `Ok(None)` means no byte arrived within the read timeout. That is the
    /// normal idle condition, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Read`] if the underlying read fails.
    fn read_byte(&mut self) -> Result<Option<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }
}

/// Reads from the front of the slice. An exhausted slice times out.
impl ByteSource for &[u8] {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let Some((&byte, rest)) = self.split_first() else {
            return Ok(None);
        };
        *self = rest;
        Ok(Some(byte))
    }
}

/// One `read(2)` of a single byte from fd 0.
///
/// In raw mode (`VMIN = 0`) a read with nothing pending returns 0 bytes
/// after the timeout; `EAGAIN` and `EINTR` are treated the same way.
impl ByteSource for Stdin {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe { libc::read(libc::STDIN_FILENO, (&raw mut byte).cast(), 1) };
        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(TermError::Read(err)),
                }
            }
        }
    }
}

// ─── State Machine ──────────────────────────────────────────────────────────

/// Where the matcher is after the ESC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// ESC seen; the introducer byte comes next.
    Escape,
    /// ESC and introducer seen; the final (or digit) byte comes next.
    Introducer(u8),
    /// `ESC [ <digit>` seen; a `~` must follow.
    Tilde(u8),
}

/// Outcome of feeding one byte to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    More(State),
    Done(KeyEvent),
}

/// A lone ESC, the answer for anything unrecognized.
const LITERAL_ESC: KeyEvent = KeyEvent::Char(ESC);

fn step(state: State, byte: u8) -> Step {
    match (state, byte) {
        (State::Escape, intro) => Step::More(State::Introducer(intro)),

        (State::Introducer(b'['), digit @ b'0'..=b'9') => Step::More(State::Tilde(digit)),
        (State::Introducer(b'['), b'A') => Step::Done(KeyEvent::ArrowUp),
        (State::Introducer(b'['), b'B') => Step::Done(KeyEvent::ArrowDown),
        (State::Introducer(b'['), b'C') => Step::Done(KeyEvent::ArrowRight),
        (State::Introducer(b'['), b'D') => Step::Done(KeyEvent::ArrowLeft),
        (State::Introducer(b'[' | b'O'), b'H') => Step::Done(KeyEvent::Home),
        (State::Introducer(b'[' | b'O'), b'F') => Step::Done(KeyEvent::End),
        (State::Introducer(_), _) => Step::Done(LITERAL_ESC),

        (State::Tilde(digit), b'~') => Step::Done(tilde_key(digit)),
        (State::Tilde(_), _) => Step::Done(LITERAL_ESC),
    }
}

/// Map the digit of `ESC [ <digit> ~`.
const fn tilde_key(digit: u8) -> KeyEvent {
    match digit {
        b'1' | b'7' => KeyEvent::Home,
        b'4' | b'8' => KeyEvent::End,
        b'2' | b'5' => KeyEvent::PageUp,
        b'6' => KeyEvent::PageDown,
        b'3' => KeyEvent::Delete,
        _ => LITERAL_ESC,
    }
}

/// Match a complete byte sequence against the key table.
///
/// Returns `None` when `seq` is empty or stops before the matcher reaches a
/// decision. Bytes past the decision point are ignored. Unrecognized
/// sequences decode to a literal ESC.
///
/// ```
/// use memori_term::input::{decode_sequence, KeyEvent};
///
/// assert_eq!(decode_sequence(b"\x1b[A"), Some(KeyEvent::ArrowUp));
/// assert_eq!(decode_sequence(b"\x1b[3~"), Some(KeyEvent::Delete));
/// assert_eq!(decode_sequence(b"q"), Some(KeyEvent::Char(b'q')));
/// assert_eq!(decode_sequence(b"\x1b["), None);
/// ```
#[must_use]
pub fn decode_sequence(seq: &[u8]) -> Option<KeyEvent> {
    let (&first, rest) = seq.split_first()?;
    if first != ESC {
        return Some(KeyEvent::Char(first));
    }
    let mut state = State::Escape;
    for &byte in rest {
        match step(state, byte) {
            Step::More(next) => state = next,
            Step::Done(key) => return Some(key),
        }
    }
    None
}

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Longest sequence the matcher reads after the ESC.
const MAX_LOOKAHEAD: usize = 3;

/// Reads bytes from a [`ByteSource`] and yields one [`KeyEvent`] per call.
///
/// # Example
///
/// ```
/// use memori_term::input::{KeyDecoder, KeyEvent};
///
/// let mut decoder = KeyDecoder::new(&b"\x1b[Bx"[..]);
/// assert_eq!(decoder.next_key()?, KeyEvent::ArrowDown);
/// assert_eq!(decoder.next_key()?, KeyEvent::Char(b'x'));
/// # Ok::<(), memori_term::TermError>(())
/// ```
#[derive(Debug)]
pub struct KeyDecoder<S> {
    source: S,
}

impl<S: ByteSource> KeyDecoder<S> {
    /// Decode keys from `source`.
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// The underlying byte source.
    ///
    /// The window-size probe reads the terminal's cursor report through it.
    pub const fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Wait for the next keypress and decode it.
    ///
    /// Read timeouts before the first byte are retried, so this only returns
    /// once a key arrives. Timeouts inside an escape sequence end it: the
    /// ESC is returned as [`KeyEvent::Char`].
    ///
    /// # Errors
    ///
    /// Returns [`TermError::Read`] if reading stdin fails.
    pub fn next_key(&mut self) -> Result<KeyEvent> {
        let first = loop {
            if let Some(byte) = self.source.read_byte()? {
                break byte;
            }
        };
        if first != ESC {
            return Ok(KeyEvent::Char(first));
        }

        let mut seen = [0u8; MAX_LOOKAHEAD];
        let mut state = State::Escape;
        for len in 1..=MAX_LOOKAHEAD {
            let Some(byte) = self.source.read_byte()? else {
                trace!("escape sequence timed out");
                return Ok(LITERAL_ESC);
            };
            seen[len - 1] = byte;
            match step(state, byte) {
                Step::More(next) => state = next,
                Step::Done(key) => {
                    if key == LITERAL_ESC {
                        trace!(sequence = ?&seen[..len], "unrecognized escape sequence");
                    }
                    return Ok(key);
                }
            }
        }
        // Every path through `step` decides within MAX_LOOKAHEAD bytes.
        Ok(LITERAL_ESC)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Decode one key from `bytes`; return it with the unconsumed tail.
    fn decode(bytes: &[u8]) -> (KeyEvent, &[u8]) {
        let mut input = bytes;
        let key = KeyDecoder::new(&mut input).next_key().unwrap();
        (key, input)
    }

    /// Decode every key in `bytes`.
    fn decode_all(bytes: &[u8]) -> Vec<KeyEvent> {
        let mut input = bytes;
        let mut decoder = KeyDecoder::new(&mut input);
        let mut keys = Vec::new();
        while !decoder.source_mut().is_empty() {
            keys.push(decoder.next_key().unwrap());
        }
        keys
    }

    /// Yields a scripted mix of timeouts and bytes.
    struct Scripted(std::collections::VecDeque<Option<u8>>);

    impl ByteSource for Scripted {
        fn read_byte(&mut self) -> Result<Option<u8>> {
            Ok(self.0.pop_front().flatten())
        }
    }

    struct Failing;

    impl ByteSource for Failing {
        fn read_byte(&mut self) -> Result<Option<u8>> {
            Err(TermError::Read(io::Error::other("EIO")))
        }
    }

    // ── Plain bytes ─────────────────────────────────────────────────

    #[test]
    fn printable_byte_is_literal() {
        assert_eq!(decode(b"a"), (KeyEvent::Char(b'a'), &b""[..]));
    }

    #[test]
    fn every_non_escape_byte_is_literal() {
        for byte in (0u8..=255).filter(|&b| b != ESC) {
            let input = [byte, b'[', b'A'];
            let (key, rest) = decode(&input);
            assert_eq!(key, KeyEvent::Char(byte));
            assert_eq!(rest, b"[A");
        }
    }

    #[test]
    fn ctrl_maps_letters_to_control_bytes() {
        assert_eq!(ctrl(b'q'), 0x11);
        assert_eq!(ctrl(b'a'), 0x01);
        assert_eq!(ctrl(b'Q'), 0x11);
    }

    #[test]
    fn ctrl_q_decodes_as_its_byte() {
        assert_eq!(decode(&[ctrl(b'q')]).0, KeyEvent::Char(ctrl(b'q')));
    }

    // ── Table entries ───────────────────────────────────────────────

    #[test]
    fn csi_letter_table() {
        let table: [(&[u8], KeyEvent); 6] = [
            (b"\x1b[A", KeyEvent::ArrowUp),
            (b"\x1b[B", KeyEvent::ArrowDown),
            (b"\x1b[C", KeyEvent::ArrowRight),
            (b"\x1b[D", KeyEvent::ArrowLeft),
            (b"\x1b[H", KeyEvent::Home),
            (b"\x1b[F", KeyEvent::End),
        ];
        for (seq, want) in table {
            let mut bytes = seq.to_vec();
            bytes.push(b'z');
            assert_eq!(decode(&bytes), (want, &b"z"[..]), "{seq:?}");
        }
    }

    #[test]
    fn csi_tilde_table() {
        let table: [(&[u8], KeyEvent); 8] = [
            (b"\x1b[1~", KeyEvent::Home),
            (b"\x1b[7~", KeyEvent::Home),
            (b"\x1b[4~", KeyEvent::End),
            (b"\x1b[8~", KeyEvent::End),
            (b"\x1b[2~", KeyEvent::PageUp),
            (b"\x1b[5~", KeyEvent::PageUp),
            (b"\x1b[6~", KeyEvent::PageDown),
            (b"\x1b[3~", KeyEvent::Delete),
        ];
        for (seq, want) in table {
            let mut bytes = seq.to_vec();
            bytes.push(b'z');
            assert_eq!(decode(&bytes), (want, &b"z"[..]), "{seq:?}");
        }
    }

    #[test]
    fn ss3_table() {
        assert_eq!(decode(b"\x1bOHz"), (KeyEvent::Home, &b"z"[..]));
        assert_eq!(decode(b"\x1bOFz"), (KeyEvent::End, &b"z"[..]));
    }

    // ── Degraded sequences ──────────────────────────────────────────

    #[test]
    fn lone_escape_times_out() {
        assert_eq!(decode(b"\x1b"), (KeyEvent::Char(ESC), &b""[..]));
    }

    #[test]
    fn escape_bracket_then_timeout() {
        assert_eq!(decode(b"\x1b["), (KeyEvent::Char(ESC), &b""[..]));
    }

    #[test]
    fn digit_without_tilde_times_out() {
        assert_eq!(decode(b"\x1b[3"), (KeyEvent::Char(ESC), &b""[..]));
    }

    #[test]
    fn digit_with_wrong_terminator_consumes_four_bytes() {
        assert_eq!(decode(b"\x1b[3Xq"), (KeyEvent::Char(ESC), &b"q"[..]));
    }

    #[test]
    fn unmapped_digit_is_literal_escape() {
        assert_eq!(decode(b"\x1b[9~q"), (KeyEvent::Char(ESC), &b"q"[..]));
        assert_eq!(decode(b"\x1b[0~q"), (KeyEvent::Char(ESC), &b"q"[..]));
    }

    #[test]
    fn unmapped_csi_letter_is_literal_escape() {
        assert_eq!(decode(b"\x1b[Zq"), (KeyEvent::Char(ESC), &b"q"[..]));
    }

    #[test]
    fn unmapped_ss3_letter_is_literal_escape() {
        // ESC O A is an arrow in some terminals, but not one we map.
        assert_eq!(decode(b"\x1bOAq"), (KeyEvent::Char(ESC), &b"q"[..]));
    }

    #[test]
    fn unknown_introducer_consumes_two_bytes() {
        assert_eq!(decode(b"\x1bxyq"), (KeyEvent::Char(ESC), &b"q"[..]));
    }

    #[test]
    fn long_garbage_is_bounded() {
        let (key, rest) = decode(b"\x1b[1;5A");
        assert_eq!(key, KeyEvent::Char(ESC));
        assert_eq!(rest, b"5A");
    }

    #[test]
    fn double_escape_does_not_recurse() {
        // The second ESC is the introducer byte, consumed with the first.
        assert_eq!(decode(b"\x1b\x1b[A"), (KeyEvent::Char(ESC), &b"A"[..]));
    }

    // ── Streams ─────────────────────────────────────────────────────

    #[test]
    fn mixed_stream() {
        assert_eq!(
            decode_all(b"j\x1b[Ak\x1b[6~\x1bOF"),
            vec![
                KeyEvent::Char(b'j'),
                KeyEvent::ArrowUp,
                KeyEvent::Char(b'k'),
                KeyEvent::PageDown,
                KeyEvent::End,
            ]
        );
    }

    #[test]
    fn timeouts_before_first_byte_are_retried() {
        let mut decoder = KeyDecoder::new(Scripted(
            [None, None, None, Some(b'x')].into_iter().collect(),
        ));
        assert_eq!(decoder.next_key().unwrap(), KeyEvent::Char(b'x'));
    }

    #[test]
    fn timeout_mid_sequence_yields_escape() {
        let mut decoder = KeyDecoder::new(Scripted(
            [Some(ESC), Some(b'['), None, Some(b'A')].into_iter().collect(),
        ));
        assert_eq!(decoder.next_key().unwrap(), KeyEvent::Char(ESC));
        // The stray final byte arrives as its own key.
        assert_eq!(decoder.next_key().unwrap(), KeyEvent::Char(b'A'));
    }

    #[test]
    fn read_error_propagates() {
        let mut decoder = KeyDecoder::new(Failing);
        assert!(matches!(decoder.next_key(), Err(TermError::Read(_))));
    }

    // ── Pure matcher ────────────────────────────────────────────────

    #[test]
    fn decode_sequence_matches_decoder() {
        for seq in [&b"\x1b[A"[..], b"\x1b[5~", b"\x1bOH", b"\x1b[Z", b"x"] {
            assert_eq!(decode_sequence(seq), Some(decode(seq).0), "{seq:?}");
        }
    }

    #[test]
    fn decode_sequence_incomplete() {
        assert_eq!(decode_sequence(b""), None);
        assert_eq!(decode_sequence(b"\x1b"), None);
        assert_eq!(decode_sequence(b"\x1bO"), None);
        assert_eq!(decode_sequence(b"\x1b[4"), None);
    }

    #[test]
    fn step_decides_within_lookahead() {
        for a in 0u8..=255 {
            for b in 0u8..=255 {
                match step(step_more(step(State::Escape, a)), b) {
                    Step::Done(_) => {}
                    Step::More(state) => {
                        assert!(matches!(step(state, b'~'), Step::Done(_)));
                        assert!(matches!(step(state, a), Step::Done(_)));
                    }
                }
            }
        }
    }

    fn step_more(step: Step) -> State {
        match step {
            Step::More(state) => state,
            Step::Done(key) => panic!("decided too early: {key:?}"),
        }
    }
}
