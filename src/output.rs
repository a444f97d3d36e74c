//! Colored status lines
//!
//! All termcolor operations use `let _ =` to deliberately ignore errors.
//! Colored output is decorative; if stdout/stderr is unavailable (broken pipe,
//! no TTY) the program carries on without it.

use std::fmt;
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Which stream a status line goes to, and how it is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Plain progress, stdout
    Status,
    /// Green check mark, stdout
    Success,
    /// Yellow marker, stderr
    Warning,
    /// Red marker, stderr
    Failure,
}

impl Level {
    fn marker(self) -> Option<(Color, &'static str)> {
        match self {
            Self::Status => None,
            Self::Success => Some((Color::Green, "✓ ")),
            Self::Warning => Some((Color::Yellow, "⚠️  ")),
            Self::Failure => Some((Color::Red, "❌ ")),
        }
    }

    fn writer(self) -> BufferWriter {
        match self {
            Self::Status | Self::Success => BufferWriter::stdout(ColorChoice::Auto),
            Self::Warning | Self::Failure => BufferWriter::stderr(ColorChoice::Auto),
        }
    }
}

/// Write one line at `level`. Backs the `status!`, `success!`, `warn!` and
/// `error!` macros.
pub fn emit(level: Level, message: fmt::Arguments<'_>) {
    let bufwtr = level.writer();
    let mut buffer = bufwtr.buffer();
    if let Some((color, marker)) = level.marker() {
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)));
        let _ = write!(&mut buffer, "{marker}");
        let _ = buffer.reset();
    }
    let _ = writeln!(&mut buffer, "{message}");
    let _ = bufwtr.print(&buffer);
}

/// Print a warning with a yellow marker to stderr
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Warning, format_args!($($arg)*))
    };
}

/// Print an error with a red marker to stderr
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Failure, format_args!($($arg)*))
    };
}

/// Print a success message with a green check mark to stdout
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Success, format_args!($($arg)*))
    };
}

/// Print a plain progress line to stdout
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        $crate::output::emit($crate::output::Level::Status, format_args!($($arg)*))
    };
}
