//! Progress indicators for the slow stages.
//!
//! Embedding, graph lookups and generation each take seconds against local
//! servers, so interactive runs show a spinner. Spinners are hidden when
//! stdout is not a TTY, with `--quiet`, and with `--json`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: animated spinners
    Interactive,
    /// Non-TTY or `--quiet`: final messages only
    Quiet,
    /// `--json`: nothing but the report on stdout
    Silent,
}

impl ProgressMode {
    /// Detect the appropriate mode from environment and flags.
    pub fn detect(quiet: bool, json: bool) -> Self {
        if json {
            Self::Silent
        } else if quiet || !atty::is(atty::Stream::Stdout) {
            Self::Quiet
        } else {
            Self::Interactive
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Spinner tick characters (Braille-based).
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// A spinner wrapping indicatif; hidden outside interactive mode.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Start a spinner.
    ///
    /// ```ignore
    /// let progress = Progress::spinner("Embedding question...", mode);
    /// let report = engine.ask(&options)?;
    /// progress.finish_clear();
    /// ```
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars(SPINNER_CHARS)
                    .template("{spinner:.cyan} {msg} ({elapsed})")
                    .expect("valid template"),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }

    /// Finish and clear the spinner line.
    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}
