//! Quote text normalization.
//!
//! Players rebuild quotes from word chunks, so comparison happens on a
//! cleaned form: lowercase, no punctuation, single spaces between words.

/// Clean quote text for tiling and comparison.
///
/// Lowercases, drops every character that is neither a word character
/// (alphanumeric or `_`) nor whitespace, and collapses whitespace runs to
/// a single space. The result has no leading or trailing whitespace.
///
/// ```
/// use quotable::puzzle::text::clean_text;
///
/// assert_eq!(clean_text("Don't panic -- ever!"), "dont panic ever");
/// ```
pub fn clean_text(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split cleaned text into words.
pub fn words(cleaned: &str) -> Vec<&str> {
    cleaned.split_whitespace().collect()
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `words` into `parts` consecutive chunks, each rendered with a
/// trailing space.
///
/// Every chunk gets `len / parts` words and the first `len % parts` chunks
/// get one extra. Chunks that receive no words are empty strings.
pub fn distribute_words(words: &[&str], parts: usize) -> Vec<String> {
    if parts == 0 {
        return Vec::new();
    }
    let per_part = words.len() / parts;
    let extra = words.len() % parts;

    let mut chunks = Vec::with_capacity(parts);
    let mut cursor = 0;
    for index in 0..parts {
        let take = per_part + usize::from(index < extra);
        let slice = &words[cursor..cursor + take];
        cursor += take;
        if slice.is_empty() {
            chunks.push(String::new());
        } else {
            let mut chunk = slice.join(" ");
            chunk.push(' ');
            chunks.push(chunk);
        }
    }
    chunks
}
