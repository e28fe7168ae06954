//! Common utilities and helper functions
//!
//! Keyword text handling shared by the HTTP surface, the CLI and the client.

pub mod error;

/// Comparison key for keywords: lowercase with all whitespace removed
///
/// The keyword tool echoes hint keywords back without spaces and in its own
/// casing, so "Harry Potter" and "harrypotter" name the same term.
pub fn keyword_key(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case- and whitespace-insensitive keyword equality
pub fn keyword_eq(a: &str, b: &str) -> bool {
    keyword_key(a) == keyword_key(b)
}

/// Trim each keyword and drop the ones that end up empty
///
/// Order and duplicates are preserved.
pub fn clean_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .filter_map(|k| {
            let trimmed = k.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Split newline-separated input into cleaned keywords
pub fn split_keyword_lines(text: &str) -> Vec<String> {
    clean_keywords(text.lines())
}
