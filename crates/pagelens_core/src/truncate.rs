pub const TRUNCATION_MARKER: &str = "...";

/// Cuts `content` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}{TRUNCATION_MARKER}", &content[..end]),
        None => content.to_string(),
    }
}
