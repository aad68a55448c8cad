//! Track query text utilities

/// Normalize track text into a plain search query.
///
/// Non-alphanumeric and non-ASCII characters become spaces; leading and
/// trailing whitespace is trimmed. Interior runs of spaces are left alone,
/// search engines tolerate them.
pub fn clean_string(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_ascii_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Turn free text into a filesystem-safe slug (alphanumeric and underscores).
pub fn filename_slug(text: &str) -> String {
    clean_string(text).replace(' ', "_")
}

/// Remove duplicate lines while preserving first-seen order.
pub fn dedupe_preserving_order(lines: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    lines
        .iter()
        .filter(|line| seen.insert(line.as_str()))
        .cloned()
        .collect()
}
