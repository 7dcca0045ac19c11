//! Error message formatting with actionable suggestions.
//!
//! Provides user-friendly error formatting that includes context,
//! suggestions for fixes, and relevant file locations when available.

use ghostlog_core::error::GhostlogError;
use super::colors::{Palette, Stream, Style};
use std::error::Error;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    palette: Palette,
}

impl ErrorFormatter {
    /// Create a new error formatter
    pub fn new() -> Self {
        Self {
            palette: Palette::for_stream(Stream::Stderr),
        }
    }

    /// Format an error with context and suggestions
    pub fn format_error(&self, error: &GhostlogError) -> String {
        let mut output = String::new();

        // Main error message
        output.push_str(&self.palette.paint(Style::Failure, "error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let GhostlogError::ConfigParse { line, column, .. } = error {
            if *line > 0 {
                output.push_str(&self.format_location("ghostlog.toml", *line, *column));
                output.push('\n');
            }
        }

        // Add suggestion if available
        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.palette.paint(Style::Muted, "help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        // Add source chain if available
        let mut source = error.source();
        while let Some(err) = source {
            output.push('\n');
            output.push_str(&self.palette.paint(Style::Muted, "caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            source = err.source();
        }

        output
    }

    /// Format file location context
    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!(
            "{} {}:{}:{}",
            self.palette.paint(Style::Muted, "-->"),
            file,
            line,
            column
        )
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
