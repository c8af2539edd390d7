//! Terminal capability detection and colouring

use helpdesk::domain::{State, Urgency};
use owo_colors::{OwoColorize, colors::css};

/// Whether stdout should be coloured.
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Terminal width, if stdout is a terminal.
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Whether the terminal is too narrow for tables (< 80 columns).
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 80)
}

/// Extension trait for colouring output.
pub trait Colorize {
    /// Green.
    fn success(&self) -> String;
    /// Amber.
    fn warning(&self) -> String;
    /// Red.
    fn danger(&self) -> String;
    /// Blue.
    fn info(&self) -> String;
    /// Dimmed.
    fn dim(&self) -> String;
}

impl Colorize for str {
    fn success(&self) -> String {
        if supports_color() {
            self.fg::<css::Green>().to_string()
        } else {
            self.to_string()
        }
    }

    fn warning(&self) -> String {
        if supports_color() {
            self.fg::<css::Orange>().to_string()
        } else {
            self.to_string()
        }
    }

    fn danger(&self) -> String {
        if supports_color() {
            self.fg::<css::Red>().bold().to_string()
        } else {
            self.to_string()
        }
    }

    fn info(&self) -> String {
        if supports_color() {
            self.fg::<css::LightBlue>().to_string()
        } else {
            self.to_string()
        }
    }

    fn dim(&self) -> String {
        if supports_color() {
            self.dimmed().to_string()
        } else {
            self.to_string()
        }
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn danger(&self) -> String {
        self.as_str().danger()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}

/// A ticket state, coloured by how much attention it needs.
pub fn state(state: State) -> String {
    match state {
        State::New | State::Reopened => state.as_str().warning(),
        State::Assigned | State::InProgress => state.as_str().info(),
        State::Resolved => state.as_str().success(),
    }
}

/// An urgency, or a dash for service requests.
pub fn urgency(urgency: Option<Urgency>) -> String {
    match urgency {
        Some(Urgency::Critical) => Urgency::Critical.as_str().danger(),
        Some(Urgency::Important) => Urgency::Important.as_str().warning(),
        Some(Urgency::Minor) => Urgency::Minor.as_str().to_string(),
        None => "–".dim(),
    }
}
