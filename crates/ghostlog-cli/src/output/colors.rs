//! ANSI styling for ghostlog's terminal output.
//!
//! Styling is decided per stream: report output goes to stdout, errors to
//! stderr, and each is only styled when it is a terminal and `NO_COLOR` is
//! unset.

use std::io::{self, IsTerminal};

/// Styles used by ghostlog output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Success,
    Warning,
    Failure,
    Muted,
    Emphasis,
}

impl Style {
    fn code(self) -> &'static str {
        match self {
            Style::Success => "32",
            Style::Warning => "33",
            Style::Failure => "31",
            Style::Muted => "2",
            Style::Emphasis => "1",
        }
    }
}

/// Which stream the text is written to
#[derive(Debug, Clone, Copy)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Styling for one output stream
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    /// Style `stream` when it is a terminal and NO_COLOR is unset
    pub fn for_stream(stream: Stream) -> Self {
        let is_terminal = match stream {
            Stream::Stdout => io::stdout().is_terminal(),
            Stream::Stderr => io::stderr().is_terminal(),
        };
        Self::new(is_terminal && std::env::var_os("NO_COLOR").is_none())
    }

    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn paint(&self, style: Style, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", style.code(), text)
        } else {
            text.to_string()
        }
    }

    /// A count that only draws attention when it is non-zero
    pub fn count(&self, value: usize, when_nonzero: Style) -> String {
        let style = if value == 0 { Style::Muted } else { when_nonzero };
        self.paint(style, &value.to_string())
    }
}
