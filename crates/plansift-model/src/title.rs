//! Title post-processing.

use crate::text::{capitalize_first, has_concrete_content, normalize_whitespace, smart_truncate};
use crate::EvidenceSpan;

/// Pure cosmetic cleanup of a candidate title.
///
/// Implementations must not invent text: output is built from the title or the
/// evidence it is given.
pub trait TitleNormalizer {
    fn normalize(&self, title: &str, evidence: &[EvidenceSpan]) -> String;
}

pub const DEFAULT_TITLE_MAX_CHARS: usize = 80;

crate::static_regex!(fn type_prefix = r"(?i)^\s*(?:update|idea|risk|bug|fix|re|note|fyi|todo|action item)(?:\s*:|\s+[-–])\s*");

crate::static_regex!(fn leading_filler = r"(?i)^(?:we(?:'re| are) (?:looking at|seeing|facing|planning to|going to)|it looks like|looks like|there (?:is|are|'s)|we need to|we should|need to)\s+");

crate::static_regex!(fn emphasis_open = r"(^|\s)[*_]+");

crate::static_regex!(fn emphasis_close = r"[*_]+($|[\s.,;:!?)])");

crate::static_regex!(fn leading_article = r"(?i)^(?:a|an|the)\s+");

/// Strips type prefixes and fillers, re-derives vacuous titles from evidence,
/// and truncates at a word boundary.
#[derive(Debug, Clone)]
pub struct DefaultTitleNormalizer {
    pub max_chars: usize,
}

impl Default for DefaultTitleNormalizer {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }
}

fn strip_repeated(mut s: String, re: &regex::Regex) -> String {
    while let Some(m) = re.find(&s) {
        if m.end() == 0 {
            break;
        }
        s = s[m.end()..].to_string();
    }
    s
}

/// Drop markdown emphasis markers at word edges. Inner underscores (`user_id`)
/// stay.
fn strip_emphasis(s: &str) -> String {
    let s = emphasis_open().replace_all(s, "${1}");
    emphasis_close().replace_all(&s, "${1}").into_owned()
}

fn clean(s: &str) -> String {
    let s = normalize_whitespace(&strip_emphasis(s));
    let s = strip_repeated(s, type_prefix());
    let s = strip_repeated(s, leading_filler());
    let s = strip_repeated(s, leading_article());
    s.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '-' | ' '))
        .trim()
        .to_string()
}

/// First clause of an evidence text.
fn lead_clause(text: &str) -> &str {
    let end = text
        .find(|c: char| matches!(c, ';' | ','))
        .or_else(|| text.find(". "))
        .unwrap_or(text.len());
    &text[..end]
}

impl TitleNormalizer for DefaultTitleNormalizer {
    fn normalize(&self, title: &str, evidence: &[EvidenceSpan]) -> String {
        let mut out = clean(title);

        if !has_concrete_content(&out) {
            let derived = evidence
                .iter()
                .map(|span| clean(lead_clause(&span.text)))
                .find(|clause| has_concrete_content(clause));
            if let Some(derived) = derived {
                out = derived;
            }
        }

        if out.is_empty() {
            out = normalize_whitespace(title);
        }
        smart_truncate(&capitalize_first(&out), self.max_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(title: &str, evidence: &str) -> String {
        DefaultTitleNormalizer::default().normalize(title, &[EvidenceSpan::new(1, 1, evidence)])
    }

    #[test]
    fn vacuous_title_is_rederived_from_evidence() {
        let out = norm(
            "Update: Discussion They",
            "We are looking at a 4-week delay due to infrastructure work",
        );
        assert_eq!(out, "4-week delay due to infrastructure work");
    }

    #[test]
    fn strips_prefixes_and_fillers() {
        assert_eq!(norm("Idea: the bulk export.", ""), "Bulk export");
        assert_eq!(norm("Re: FYI: looks like SSO is flaky", ""), "SSO is flaky");
    }

    #[test]
    fn strips_emphasis_markers() {
        assert_eq!(
            norm("**Billing** The invoice launch slipped two weeks to Q4", ""),
            "Billing The invoice launch slipped two weeks to Q4"
        );
        assert_eq!(norm("__Update:__ *search* rollout moved", ""), "Search rollout moved");
        assert_eq!(norm("Log user_id on failed payments", ""), "Log user_id on failed payments");
    }

    #[test]
    fn keeps_concrete_titles() {
        assert_eq!(norm("Export API for finance", "unrelated"), "Export API for finance");
        assert_eq!(norm("Re-architect billing", ""), "Re-architect billing");
    }

    #[test]
    fn truncates_long_titles() {
        let long = "Migrate ".to_string() + &"service ".repeat(20);
        let out = DefaultTitleNormalizer { max_chars: 30 }.normalize(&long, &[]);
        assert!(out.chars().count() <= 30);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn never_returns_empty_for_nonempty_input() {
        assert_eq!(norm("They", "it"), "They");
    }
}
