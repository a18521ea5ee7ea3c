// SPDX-License-Identifier: MIT
//
// memori — a minimal raw-mode terminal text viewer.
//
// This is the main binary that wires the two library crates together:
//
//   memori-term   → raw mode, key decoding, window size, frame buffer
//   memori-editor → cursor state, the loaded line, the view
//
// Each iteration of the control loop redraws the whole screen, then blocks
// (in bounded raw-mode reads) for one key:
//
//   state → Renderer::refresh → one write to stdout
//   stdin → KeyDecoder::next_key → EditorState::apply → Continue | Quit
//
// The quit key restores the terminal explicitly. On every other way out of
// `run` the raw-mode guard restores it when dropped, before main reports
// anything or exits.

mod config;

use std::env;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Mutex;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use memori_editor::document::Document;
use memori_editor::state::{Action, EditorState};
use memori_editor::view::Renderer;
use memori_term::ansi;
use memori_term::input::{ByteSource, KeyDecoder};
use memori_term::size;
use memori_term::terminal::{AttrDevice, RawMode, Stdin};
use memori_term::{Result, TermError};

use crate::config::{Config, LogConfig};

/// Environment variable holding a tracing filter, e.g. `memori=debug`.
const LOG_ENV: &str = "MEMORI_LOG";

// ─── Command line ───────────────────────────────────────────────────────────

/// What the command line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    /// Show a file.
    Open(PathBuf),
    /// Print usage.
    Help,
    /// Print the version.
    Version,
}

fn usage() -> String {
    format!(
        "memori {}\n\
         \n\
         Usage: memori <file>\n\
         \n\
         Options:\n\
         \x20 -h, --help     Print this help\n\
         \x20 -V, --version  Print the version\n\
         \n\
         Keys: arrows or hjkl move, PageUp/PageDown, Home/End, Ctrl-Q quits.",
        env!("CARGO_PKG_VERSION")
    )
}

/// Interpret the arguments after the program name.
///
/// Only the first argument counts: a flag, or the file to show.
/// No file at all is a request for usage.
fn parse_args(args: impl IntoIterator<Item = OsString>) -> Command {
    let Some(arg) = args.into_iter().next() else {
        return Command::Help;
    };
    match arg.to_str() {
        Some("-h" | "--help") => Command::Help,
        Some("-V" | "--version") => Command::Version,
        _ => Command::Open(PathBuf::from(arg)),
    }
}

// ─── Logging ────────────────────────────────────────────────────────────────

/// Send tracing output to the log file. Stdout belongs to the frame, so if
/// the file cannot be opened logging stays off.
fn init_logging(config: &LogConfig) {
    let Some(path) = config.file_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ─── Control loop ───────────────────────────────────────────────────────────

/// Show `path` until the quit key.
///
/// On an error the session guard is dropped on the way out, so the terminal
/// is back in its original mode by the time the caller sees the result.
fn run(path: &Path, config: &Config) -> Result<()> {
    let document = Document::open(path)?;

    let session = RawMode::enable(Stdin, config.read_timeout())?;
    let mut keys = KeyDecoder::new(Stdin);

    let mut stdout = io::stdout();
    let size = size::get_size(&mut stdout.lock(), keys.source_mut())?;
    info!(rows = size.rows, cols = size.cols, "window size");

    let state = EditorState::new(size, document.into_first_line());
    control_loop(session, state, &mut keys, &mut stdout)
}

/// Redraw, read a key, apply it; until the quit key.
///
/// Quitting clears the screen and restores the terminal explicitly, so a
/// failed restore is reported like any other terminal error.
fn control_loop<D: AttrDevice>(
    mut session: RawMode<D>,
    mut state: EditorState,
    keys: &mut KeyDecoder<impl ByteSource>,
    out: &mut impl Write,
) -> Result<()> {
    let mut renderer = Renderer::new();
    loop {
        renderer.refresh(&state, out)?;
        if state.apply(keys.next_key()?) == Action::Quit {
            break;
        }
    }

    clear_screen(out).map_err(TermError::Write)?;
    session.disable()?;
    info!("quit");
    Ok(())
}

fn clear_screen(out: &mut impl Write) -> io::Result<()> {
    ansi::clear_and_home(out)?;
    out.flush()
}

/// Fatal policy: clear the screen, report on stderr, exit 1.
fn die(err: &TermError) -> ! {
    let _ = clear_screen(&mut io::stdout());
    error!(error = %err, "fatal");
    eprintln!("memori: {err}");
    process::exit(1);
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let path = match parse_args(env::args_os().skip(1)) {
        Command::Open(path) => path,
        Command::Help => {
            println!("{}", usage());
            return;
        }
        Command::Version => {
            println!("memori {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    let (config, config_err) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.log);
    if let Some(e) = config_err {
        warn!("ignoring config: {e:#}");
    }
    info!(path = %path.display(), "memori starting");

    if let Err(e) = run(&path, &config) {
        die(&e);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use memori_term::input::ctrl;
    use memori_term::size::WindowSize;
    use memori_term::terminal::TerminalAttributes;
    use pretty_assertions::assert_eq;

    const FRAME_START: &[u8] = b"\x1b[?25l\x1b[H";

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn no_arguments_is_help() {
        assert_eq!(parse_args(args(&[])), Command::Help);
    }

    #[test]
    fn help_flags() {
        assert_eq!(parse_args(args(&["-h"])), Command::Help);
        assert_eq!(parse_args(args(&["--help"])), Command::Help);
    }

    #[test]
    fn version_flags() {
        assert_eq!(parse_args(args(&["-V"])), Command::Version);
        assert_eq!(parse_args(args(&["--version"])), Command::Version);
    }

    #[test]
    fn path_argument() {
        assert_eq!(
            parse_args(args(&["notes.txt"])),
            Command::Open(PathBuf::from("notes.txt"))
        );
    }

    #[test]
    fn extra_arguments_ignored() {
        assert_eq!(
            parse_args(args(&["a.txt", "b.txt"])),
            Command::Open(PathBuf::from("a.txt"))
        );
    }

    #[test]
    fn usage_mentions_invocation_and_quit_key() {
        let text = usage();
        assert!(text.contains("Usage: memori <file>"));
        assert!(text.contains("Ctrl-Q"));
    }

    #[test]
    fn clear_screen_writes_clear_and_home() {
        let mut out = Vec::new();
        clear_screen(&mut out).unwrap();
        assert_eq!(out, ansi::CLEAR_AND_HOME);
    }

    #[test]
    fn missing_file_fails_before_touching_the_terminal() {
        let path = env::temp_dir().join("memori-main-definitely-missing.txt");
        let err = run(&path, &Config::default()).unwrap_err();
        assert!(matches!(err, TermError::FileOpen { .. }));
    }

    // ── Control loop ────────────────────────────────────────────────

    #[allow(unsafe_code)]
    fn cooked() -> TerminalAttributes {
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        t.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG;
        t.c_cc[libc::VMIN] = 1;
        TerminalAttributes::from_termios(t)
    }

    /// In-memory terminal. With `refuse_restore` set, every attribute write
    /// after the switch to raw mode fails.
    struct FakeTty {
        current: TerminalAttributes,
        sets: usize,
        refuse_restore: bool,
    }

    impl FakeTty {
        fn new(refuse_restore: bool) -> Self {
            Self {
                current: cooked(),
                sets: 0,
                refuse_restore,
            }
        }
    }

    impl AttrDevice for FakeTty {
        fn get_attrs(&mut self) -> io::Result<TerminalAttributes> {
            Ok(self.current)
        }

        fn set_attrs(&mut self, attrs: &TerminalAttributes) -> io::Result<()> {
            if self.refuse_restore && self.sets > 0 {
                return Err(io::Error::other("tcsetattr refused"));
            }
            self.sets += 1;
            self.current = *attrs;
            Ok(())
        }
    }

    /// Run the control loop on a 3x10 viewport until `input` quits.
    fn view(tty: &mut FakeTty, input: &[u8]) -> (Result<()>, Vec<u8>) {
        let session = RawMode::enable(tty, 1).unwrap();
        let state = EditorState::new(WindowSize::new(3, 10).unwrap(), None);
        let mut keys = KeyDecoder::new(input);
        let mut out = Vec::new();
        let result = control_loop(session, state, &mut keys, &mut out);
        (result, out)
    }

    #[test]
    fn quit_clears_screen_and_restores_terminal() {
        let mut tty = FakeTty::new(false);
        let (result, out) = view(&mut tty, &[ctrl(b'q')]);
        assert!(result.is_ok());
        assert!(out.starts_with(FRAME_START));
        assert!(out.ends_with(ansi::CLEAR_AND_HOME));
        assert_eq!(tty.current, cooked());
        assert_eq!(tty.sets, 2);
    }

    #[test]
    fn failed_restore_on_quit_is_an_error() {
        let mut tty = FakeTty::new(true);
        let (result, out) = view(&mut tty, &[ctrl(b'q')]);
        assert!(matches!(result, Err(TermError::AttributeApply(_))));
        assert!(out.ends_with(ansi::CLEAR_AND_HOME));
        assert_eq!(tty.current, cooked().raw_mode(1));
    }

    #[test]
    fn keys_before_quit_redraw_each_time() {
        let mut tty = FakeTty::new(false);
        let (result, out) = view(&mut tty, b"jl\x11");
        assert!(result.is_ok());
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("\x1b[?25l\x1b[H").count(), 3);
        assert!(text.contains("\x1b[2;2H"));
    }
}
