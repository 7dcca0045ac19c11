//! Terminal output formatting and utilities.
//!
//! This module provides consistent output formatting across all commands,
//! including colors and error messages.

pub mod colors;
pub mod errors;

use colors::{Palette, Stream, Style};

/// Output handler for consistent terminal formatting
pub struct OutputHandler {
    palette: Palette,
}

impl OutputHandler {
    /// Create a new output handler
    pub fn new() -> Self {
        Self::with_palette(Palette::for_stream(Stream::Stdout))
    }

    pub fn with_palette(palette: Palette) -> Self {
        Self { palette }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        println!("{}", self.palette.paint(Style::Muted, message));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        println!("{} {}", self.palette.paint(Style::Success, "✓"), message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        println!("{} {}", self.palette.paint(Style::Warning, "⚠"), message);
    }

    /// Print a labelled value
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("{}", self.field_line(label, &value.to_string()));
    }

    /// Print a labelled count, highlighted with `when_nonzero` unless zero
    pub fn count(&self, label: &str, value: usize, when_nonzero: Style) {
        println!(
            "{}",
            self.field_line(label, &self.palette.count(value, when_nonzero))
        );
    }

    fn field_line(&self, label: &str, value: &str) -> String {
        format!(
            "  {} {}",
            self.palette.paint(Style::Muted, &format!("{:<14}", label)),
            value
        )
    }

    /// Emphasized heading
    pub fn heading(&self, text: &str) {
        println!("{}", self.palette.paint(Style::Emphasis, text));
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_line_alignment() {
        let output = OutputHandler::with_palette(Palette::new(false));
        assert_eq!(output.field_line("deleted", "3"), "  deleted        3");
    }
}
