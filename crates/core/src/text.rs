//! Small string helpers shared by the caches and the content processor.

/// Ellipsis appended to truncated text.
pub const ELLIPSIS: &str = "...";

/// Keeps the first `max_chars` characters, appending [`ELLIPSIS`] if anything was cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// The first `max_chars` characters of `text`, without a marker.
pub fn prefix_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
