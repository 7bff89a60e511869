use clap::builder::styling::{AnsiColor, Style};
use std::fmt::Display;
use std::path::Path;

/// Terminal styles for the two kinds of user-facing line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub success: Style,
    pub error: Style,
}

impl Palette {
    pub fn ansi() -> Self {
        Self {
            success: AnsiColor::Green.on_default(),
            error: AnsiColor::Red.on_default().bold(),
        }
    }

    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
        }
    }

    /// Plain when `NO_COLOR` is set to a non-empty value
    pub fn from_env() -> Self {
        match std::env::var_os("NO_COLOR") {
            Some(value) if !value.is_empty() => Self::plain(),
            _ => Self::ansi(),
        }
    }

    pub fn success(&self, text: impl Display) -> String {
        paint(self.success, text)
    }

    pub fn error(&self, text: impl Display) -> String {
        paint(self.error, text)
    }

    /// Print `Error: <message>` to stderr and exit with status 1
    pub fn fail(&self, message: impl Display) -> ! {
        eprintln!("{}", self.error(format_args!("Error: {message}")));
        std::process::exit(1)
    }
}

fn paint(style: Style, text: impl Display) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

/// The single line printed on success
pub fn completion_line(count: usize, output_dir: &Path) -> String {
    format!("{} images extracted to {}", count, output_dir.display())
}
