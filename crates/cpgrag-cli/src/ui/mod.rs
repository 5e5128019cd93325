//! # CLI UI Module
//!
//! Styling and formatting layer for cpgrag CLI output.
//!
//! Human output is meant to be scanned: prefixed status lines, a candidate
//! table, then the answer. `--json` prints the full report instead and
//! suppresses everything else on stdout. Colors follow `--color` and
//! `NO_COLOR`.
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Small text formatters (durations, distances, truncation)
//! - `table`: Candidate and backend tables with comfy-table
//! - `progress`: Spinners for the slow stages

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};
