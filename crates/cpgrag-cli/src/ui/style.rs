//! Message styling for CLI output.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Recovered failure, reduced context | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |
//! | `[skip]` | Stage skipped | Dim |

use owo_colors::OwoColorize;

use cpgrag_core::NeighborhoodStatus;

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Ok,
    Err,
    Warn,
    Info,
    Hint,
    Skip,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
            Self::Skip => "[skip]",
        }
    }
}

/// Styling interface for CLI output.
///
/// Every method returns plain text when colors are disabled, so output
/// captured by tests and pipes is stable.
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    /// Check if colors are enabled.
    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a message with a type prefix, e.g. `[ok] Indexed 120 methods`.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
                MessageType::Skip => prefix.dimmed().to_string(),
            };
            format!("{} {}", colored_prefix, text)
        } else {
            format!("{} {}", prefix, text)
        }
    }

    /// Detail line under a message, indented by five spaces.
    pub fn message_detail(&self, label: &str, value: &str) -> String {
        format!("     {}: {}", label, value)
    }

    /// Section header such as `ANSWER`.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Error with optional cause and hint lines.
    ///
    /// ```text
    /// [err] Failed to index methods
    ///       Cause: Ollama unreachable at http://localhost:11434
    ///       Hint: Start the server with `ollama serve`
    /// ```
    pub fn error_with_context(&self, msg: &str, cause: Option<&str>, hint: Option<&str>) -> String {
        let mut output = self.message(MessageType::Err, msg);

        if let Some(cause_text) = cause {
            output.push('\n');
            output.push_str(&format!("      Cause: {}", cause_text));
        }

        if let Some(hint_text) = hint {
            output.push('\n');
            output.push_str(&format!("      Hint: {}", hint_text));
        }

        output
    }

    /// Format a key-value pair, key dimmed.
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Method name, bold.
    pub fn method(&self, name: &str) -> String {
        if self.colors_enabled() {
            name.bold().to_string()
        } else {
            name.to_string()
        }
    }

    /// File path, cyan.
    pub fn file_path(&self, path: &str) -> String {
        if self.colors_enabled() {
            path.cyan().to_string()
        } else {
            path.to_string()
        }
    }

    /// Cosine distance colored by closeness.
    ///
    /// - < 0.3: green
    /// - < 0.6: yellow
    /// - otherwise: red
    pub fn distance(&self, value: f32) -> String {
        let formatted = super::format::format_distance(value);
        if !self.colors_enabled() {
            return formatted;
        }
        if value < 0.3 {
            formatted.green().to_string()
        } else if value < 0.6 {
            formatted.yellow().to_string()
        } else {
            formatted.red().to_string()
        }
    }

    /// Graph lookup outcome label.
    pub fn lookup(&self, status: &NeighborhoodStatus) -> String {
        let label = status.label();
        if !self.colors_enabled() {
            return label.to_string();
        }
        match status {
            NeighborhoodStatus::Found => label.green().to_string(),
            NeighborhoodStatus::NotFound => label.yellow().to_string(),
            NeighborhoodStatus::Failed { .. } => label.red().to_string(),
            NeighborhoodStatus::Skipped => label.dimmed().to_string(),
        }
    }

    /// Dimmed auxiliary text.
    pub fn dim(&self, text: &str) -> String {
        if self.colors_enabled() {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Style {
        Style::new(ColorMode::Never)
    }

    #[test]
    fn test_message_type_prefix() {
        assert_eq!(MessageType::Ok.prefix(), "[ok]");
        assert_eq!(MessageType::Err.prefix(), "[err]");
        assert_eq!(MessageType::Warn.prefix(), "[warn]");
        assert_eq!(MessageType::Skip.prefix(), "[skip]");
    }

    #[test]
    fn test_message_no_color() {
        assert_eq!(plain().message(MessageType::Ok, "Indexed"), "[ok] Indexed");
        assert_eq!(plain().message(MessageType::Warn, "Graph off"), "[warn] Graph off");
    }

    #[test]
    fn test_error_with_context() {
        let output = plain().error_with_context(
            "Failed to index methods",
            Some("connection refused"),
            Some("Start the server with `ollama serve`"),
        );
        assert_eq!(
            output,
            "[err] Failed to index methods\n      Cause: connection refused\n      Hint: Start the server with `ollama serve`"
        );
    }

    #[test]
    fn test_plain_helpers() {
        let style = plain();
        assert_eq!(style.key_value("Project", "medsam"), "Project: medsam");
        assert_eq!(style.message_detail("Indexed", "12"), "     Indexed: 12");
        assert_eq!(style.distance(0.12345), "0.123");
        assert_eq!(style.lookup(&NeighborhoodStatus::Found), NeighborhoodStatus::Found.label());
    }

    #[test]
    fn test_colored_output_has_escape_codes() {
        let style = Style::new(ColorMode::Always);
        assert!(style.message(MessageType::Err, "x").contains('\u{1b}'));
        assert!(style.distance(0.9).contains("0.900"));
    }
}
