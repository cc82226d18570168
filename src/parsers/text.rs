use std::collections::HashMap;

/// Words ignored when picking out topic terms
const STOPWORDS: &[&str] = &[
    "about", "after", "also", "because", "been", "before", "being", "between", "both", "could",
    "does", "each", "even", "from", "have", "here", "into", "just", "like", "made", "make",
    "many", "more", "most", "much", "must", "only", "other", "over", "same", "should", "some",
    "such", "than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "under", "very", "want", "were", "what", "when", "where", "which", "while",
    "will", "with", "would", "your", "yours",
];

/// Collapses every run of whitespace into a single space and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a token counts as a word
///
/// Tokens of two characters or fewer, pure digits and pure punctuation are
/// rejected.
pub fn is_countable_word(token: &str) -> bool {
    if token.chars().count() <= 2 {
        return false;
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    token.chars().any(char::is_alphanumeric)
}

/// Counts the words of a text using [`is_countable_word`]
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().filter(|t| is_countable_word(t)).count()
}

/// Canonical form of a text used for embedding and as the cache key
///
/// Lowercased, whitespace collapsed, truncated to `max_chars` characters.
pub fn normalize_for_embedding(text: &str, max_chars: usize) -> String {
    let normalized = normalize_whitespace(&text.to_lowercase());
    truncate_chars(&normalized, max_chars)
}

/// Truncates on a character boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end().to_string(),
        None => text.to_string(),
    }
}

/// Lowercased alphabetic terms of at least four letters that are not stopwords
pub fn significant_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|t| t.chars().count() >= 4)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Term frequencies of [`significant_terms`]
pub fn term_frequencies(text: &str) -> HashMap<String, usize> {
    let mut frequencies = HashMap::new();
    for term in significant_terms(text) {
        *frequencies.entry(term).or_insert(0) += 1;
    }
    frequencies
}

/// Sorts `(term, count)` pairs by descending count, then alphabetically
pub fn rank_terms(frequencies: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut ranked: Vec<(String, usize)> = frequencies.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
