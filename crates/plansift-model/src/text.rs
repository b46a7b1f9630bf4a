//! Text normalization helpers.
//!
//! Grounding is defined over whitespace-normalized text: runs of whitespace
//! collapse to a single space and the ends are trimmed. Case is preserved.

/// Collapse whitespace runs to single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-normalized view of a source text, for repeated substring checks.
#[derive(Debug, Clone)]
pub struct GroundingIndex {
    normalized: String,
}

impl GroundingIndex {
    pub fn new(source: &str) -> Self {
        Self {
            normalized: normalize_whitespace(source),
        }
    }

    /// True when `span` is non-empty and its normalized form occurs in the source.
    pub fn contains(&self, span: &str) -> bool {
        let span = normalize_whitespace(span);
        !span.is_empty() && self.normalized.contains(&span)
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

/// Words that carry no subject matter on their own.
pub const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "being", "but", "by", "can", "could",
    "did", "do", "does", "for", "from", "had", "has", "have", "if", "in", "into", "is", "it's",
    "of", "on", "or", "so", "than", "that", "the", "then", "there", "these", "this", "those",
    "to", "too", "up", "was", "were", "will", "with", "would", "about", "also", "just", "more",
    "some", "any", "all", "not", "no", "yes", "very", "should", "must", "may", "might", "need",
    "needs", "want", "wants", "get", "got", "via", "per", "out", "over", "still", "now",
];

pub const PRONOUNS: &[&str] = &[
    "i", "me", "my", "we", "us", "our", "ours", "you", "your", "he", "him", "his", "she", "her",
    "it", "its", "they", "them", "their", "theirs", "someone", "somebody", "everyone", "anyone",
    "we're", "they're", "you're", "i'm", "one",
];

/// Placeholder nouns that do not name anything concrete.
pub const GENERIC_WORDS: &[&str] = &[
    "discussion", "discussed", "update", "updates", "item", "items", "thing", "things", "stuff",
    "something", "misc", "miscellaneous", "notes", "note", "general", "other", "tbd", "etc",
    "topic", "topics", "issue", "issues", "point", "points", "various", "follow", "sync",
    "meeting", "idea", "ideas", "plan", "change", "changes", "work", "team",
];

/// Lower-cased word tokens (letters, digits, apostrophes and inner hyphens).
pub fn word_tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '-'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn is_filler(word: &str) -> bool {
    STOPWORDS.contains(&word) || PRONOUNS.contains(&word) || GENERIC_WORDS.contains(&word)
}

/// Tokens that name something: not stopwords, pronouns, or generic placeholders.
pub fn content_tokens(s: &str) -> Vec<String> {
    word_tokens(s)
        .into_iter()
        .filter(|w| (w.len() >= 3 || w.chars().any(|c| c.is_ascii_digit())) && !is_filler(w))
        .collect()
}

/// True when `s` references at least one concrete noun-ish token.
pub fn has_concrete_content(s: &str) -> bool {
    !content_tokens(s).is_empty()
}

/// Number of non-whitespace characters.
pub fn visible_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

/// Truncate to at most `max` chars, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Truncate at a word boundary, appending `...` when anything was cut.
pub fn smart_truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(3);
    let head: String = s.chars().take(budget).collect();
    let cut = match head.rfind(' ') {
        Some(idx) if idx > budget / 2 => &head[..idx],
        _ => head.as_str(),
    };
    let cut = cut.trim_end_matches(|c: char| c == ',' || c == ';' || c == ':' || c == ' ');
    format!("{cut}...")
}

/// Upper-case the first character.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Token-set Jaccard similarity over `content_tokens`.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    use std::collections::BTreeSet;

    let a: BTreeSet<String> = content_tokens(a).into_iter().collect();
    let b: BTreeSet<String> = content_tokens(b).into_iter().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    inter / union
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_runs() {
        assert_eq!(normalize_whitespace("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn grounding_spans_lines() {
        let index = GroundingIndex::new("We are looking at a\n   4-week delay.");
        assert!(index.contains("a 4-week   delay"));
        assert!(!index.contains("5-week delay"));
        assert!(!index.contains("   "));
    }

    #[test]
    fn pronoun_only_text_is_not_concrete() {
        assert!(!has_concrete_content("Discussion They"));
        assert!(!has_concrete_content("we should do it"));
        assert!(has_concrete_content("export API"));
        assert!(has_concrete_content("Q3"));
    }

    #[test]
    fn smart_truncate_cuts_on_word_boundary() {
        let out = smart_truncate("alpha beta gamma delta epsilon", 16);
        assert_eq!(out, "alpha beta...");
        assert_eq!(smart_truncate("short", 16), "short");
    }

    #[test]
    fn jaccard_uses_content_tokens() {
        let sim = token_jaccard("Launch the billing API", "billing API launch");
        assert!((sim - 1.0).abs() < 1e-9);
        assert_eq!(token_jaccard("the", "billing"), 0.0);
    }
}
