//! Colour and layout helpers for CLI output.

use std::fmt;

use owo_colors::{colors::css, OwoColorize};

/// Terminals narrower than this fall back to the stacked layout.
const NARROW_COLUMNS: u16 = 60;

/// Whether the terminal is too narrow for aligned tables.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(w, _)| w.0 < NARROW_COLUMNS)
}

fn colour_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Semantic colours for status output.
///
/// Every method degrades to the plain string when stdout has no colour
/// support, so piped output stays clean.
pub trait Colorize: fmt::Display {
    /// Green, for successful outcomes.
    fn success(&self) -> String {
        tint(self.to_string(), |text| text.fg::<css::Green>().to_string())
    }

    /// Amber, for findings that need attention.
    fn warning(&self) -> String {
        tint(self.to_string(), |text| text.fg::<css::Orange>().to_string())
    }

    /// Blue, for neutral annotations.
    fn info(&self) -> String {
        tint(self.to_string(), |text| {
            text.fg::<css::LightBlue>().to_string()
        })
    }

    /// Dimmed, for hints and secondary detail.
    fn dim(&self) -> String {
        tint(self.to_string(), |text| text.dimmed().to_string())
    }
}

impl<T: fmt::Display + ?Sized> Colorize for T {}

fn tint(plain: String, paint: fn(&str) -> String) -> String {
    if colour_enabled() {
        paint(&plain)
    } else {
        plain
    }
}
