//! Color mode detection for CLI output.
//!
//! Honors `NO_COLOR` (https://no-color.org/) and only colorizes a terminal
//! in `auto` mode.

use std::io::IsTerminal;
use std::str::FromStr;

/// Value of the `--color` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Always,
    Never,
    #[default]
    Auto,
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "Unknown color mode '{}'. Use 'always', 'never', or 'auto'.",
                other
            )),
        }
    }
}

impl ColorMode {
    /// Whether output should carry ANSI colors.
    pub fn is_enabled(&self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }
}

/// Current terminal width, 80 when unknown.
pub fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80)
}
