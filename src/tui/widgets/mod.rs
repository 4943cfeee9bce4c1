pub mod decks;
pub mod result;
pub mod study;

/// Shortens `s` to at most `max_len` characters, ending in "..." when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
