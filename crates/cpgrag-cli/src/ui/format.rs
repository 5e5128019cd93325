//! Formatting utilities for CLI output.

use chrono::{DateTime, Local, Utc};

/// Truncate to at most `max_chars` characters, ending in `...` when cut.
///
/// ```text
/// truncate_str("validate_input", 20) == "validate_input"
/// truncate_str("a_very_long_method_name", 10) == "a_very_..."
/// ```
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let kept: String = s.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

/// Keep the end of a path, which is the part that identifies the file.
pub fn truncate_path(path: &str, max_chars: usize) -> String {
    let count = path.chars().count();
    if count <= max_chars {
        return path.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let tail: String = path.chars().skip(count - (max_chars - 3)).collect();
    format!("...{}", tail)
}

/// Collapse all whitespace runs to single spaces.
pub fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Milliseconds as `850ms` or `2.4s`.
pub fn format_millis(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

/// Cosine distance with three decimals.
pub fn format_distance(distance: f32) -> String {
    format!("{:.3}", distance)
}

/// Timestamp in the local timezone.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Comma-separated list capped at `max` items.
pub fn join_capped(items: &[String], max: usize) -> String {
    let shown = items.iter().take(max).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > max {
        format!("{} (+{} more)", shown, items.len() - max)
    } else {
        shown
    }
}
