//! UTF-8-safe string truncation utilities
//!
//! Safe string slicing that respects UTF-8 character boundaries, preventing
//! panics when working with multi-byte characters (accented letters, emoji,
//! box-drawing symbols) anywhere keyword or URL text gets trimmed for
//! display or length checks.

/// Safely truncate a string to a maximum number of characters (not bytes).
///
/// # Examples
/// ```
/// # use keyword_harvest_pipeline::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Find a safe byte index for truncation, preferring word boundaries.
///
/// Searches backwards from the `max_chars`-th character for a boundary
/// character (whitespace or a character in `boundary_chars`). Falls back to
/// the `max_chars`-th character boundary if none is found.
///
/// # Examples
/// ```
/// # use keyword_harvest_pipeline::utils::string_utils::safe_truncate_boundary;
/// let text = "Hello, wonderful world of Unicode!";
/// let idx = safe_truncate_boundary(text, 20, " ,;:");
/// assert_eq!(&text[..idx], "Hello, wonderful");
/// ```
#[must_use]
pub fn safe_truncate_boundary(s: &str, max_chars: usize, boundary_chars: &str) -> usize {
    let max_byte_idx = s
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len());

    s[..max_byte_idx]
        .rfind(|c: char| c.is_whitespace() || boundary_chars.contains(c))
        .unwrap_or(max_byte_idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundary_with_multibyte() {
        let text = "caf\u{e9}caf\u{e9}caf\u{e9}";
        assert_eq!(safe_truncate_chars(text, 4), "caf\u{e9}");
    }

    #[test]
    fn shorter_than_max_is_unchanged() {
        assert_eq!(safe_truncate_chars("hi", 100), "hi");
    }

    #[test]
    fn boundary_falls_back_without_match() {
        let idx = safe_truncate_boundary("abcdefgh", 4, "");
        assert_eq!(idx, 4);
    }
}
