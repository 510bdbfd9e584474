//! Compact output rendering helpers for CLI surfaces.
//!
//! Keeps command result output bounded and readable while preserving signal.

/// Chars of decision text shown in one-line summaries.
pub const SUMMARY_TEXT_CHARS: usize = 120;
/// Tags shown before the rest are elided.
pub const SUMMARY_TAG_COUNT: usize = 2;

/// Bound `input` to `max_chars` characters, marking a cut with `…`. Cuts
/// land on char boundaries, never inside a multi-byte sequence.
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    let kept: String = input.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}
