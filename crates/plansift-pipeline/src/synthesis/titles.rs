//! Deterministic titles and payloads for candidates.
//!
//! Titles are cut out of the triggering sentence: the object of the trigger
//! verb, or the clause around the trigger, capped at a fixed word count. When
//! nothing concrete can be cut out, a per-type template over the section
//! heading is used instead.

use plansift_model::text::{has_concrete_content, normalize_whitespace};
use plansift_model::{PlanShift, Severity, SuggestionPayload, SuggestionType};
use regex::Match;

use crate::lexicon::{
    consequence, descope, desire_object, execution_verb, explicit_ask, explicit_duration,
    failure, has_conditional, logging_or_user_ids, minor_outcome, pii, pull_in, risk_vocab,
    severe_outcome, shift_verb, strong_conditional, time_token,
};
use plansift_model::markers::date_marker;

/// Titles longer than this many words are cut.
pub const MAX_TITLE_WORDS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTitle {
    pub text: String,
    /// Cut from the sentence rather than templated.
    pub extracted: bool,
}

impl DerivedTitle {
    fn extracted(text: String) -> Self {
        Self {
            text,
            extracted: true,
        }
    }

    fn templated(text: String) -> Self {
        Self {
            text,
            extracted: false,
        }
    }
}

fn is_clause_break(c: char) -> bool {
    matches!(c, ',' | ';' | ':' | '(' | ')' | '—' | '–')
}

fn trim_clause(s: &str) -> &str {
    s.trim()
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .trim()
}

/// The clause of `text` that contains `[start, end)`.
pub fn clause_around(text: &str, start: usize, end: usize) -> &str {
    let left = text[..start]
        .rfind(is_clause_break)
        .map(|i| i + text[i..].chars().next().map(char::len_utf8).unwrap_or(1))
        .unwrap_or(0);
    let right = text[end..]
        .find(is_clause_break)
        .map(|i| end + i)
        .unwrap_or(text.len());
    trim_clause(&text[left..right])
}

/// Text from `start` to the next clause break.
fn clause_from(text: &str, start: usize) -> &str {
    let right = text[start..]
        .find(is_clause_break)
        .map(|i| start + i)
        .unwrap_or(text.len());
    trim_clause(&text[start..right])
}

/// Keep at most `n` words.
pub fn truncate_words(s: &str, n: usize) -> String {
    normalize_whitespace(s)
        .split(' ')
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_lead<'a>(s: &'a str, leads: &[&str]) -> &'a str {
    for lead in leads {
        if let Some(head) = s.get(..lead.len()) {
            if head.eq_ignore_ascii_case(lead) {
                return s[lead.len()..].trim_start();
            }
        }
    }
    s
}

fn around(text: &str, m: Match<'_>) -> String {
    truncate_words(clause_around(text, m.start(), m.end()), MAX_TITLE_WORDS)
}

/// Object of a request: "asks for a monthly CSV export" -> "a monthly CSV export".
pub fn request_object(sentence: &str) -> Option<String> {
    let caps = desire_object()
        .captures(sentence)
        .or_else(|| explicit_ask().captures(sentence))?;
    let object = caps.name("object")?;
    let object = clause_from(sentence, object.start());
    let object = strip_lead(object, &["to have ", "to get ", "to see ", "to "]);
    let object = truncate_words(object, MAX_TITLE_WORDS);
    has_concrete_content(&object).then_some(object)
}

fn idea_title(sentence: &str) -> Option<String> {
    if let Some(object) = request_object(sentence) {
        return Some(object);
    }
    let m = execution_verb().find(sentence)?;
    Some(truncate_words(clause_from(sentence, m.start()), MAX_TITLE_WORDS))
}

fn plan_title(sentence: &str) -> Option<String> {
    let m = shift_verb()
        .find(sentence)
        .or_else(|| descope().find(sentence))?;
    Some(around(sentence, m))
}

fn risk_title(sentence: &str) -> Option<String> {
    if let Some(m) = strong_conditional().find(sentence) {
        let clause = clause_around(sentence, m.start(), m.end());
        let clause = strip_lead(clause, &["if ", "unless "]);
        return Some(truncate_words(clause, MAX_TITLE_WORDS));
    }
    let m = risk_vocab()
        .find(sentence)
        .or_else(|| consequence().find(sentence))?;
    Some(around(sentence, m))
}

fn bug_title(sentence: &str) -> Option<String> {
    let m = failure().find(sentence)?;
    Some(around(sentence, m))
}

/// Per-type template over the section heading.
pub fn template_title(kind: SuggestionType, heading: &str) -> String {
    let heading = normalize_whitespace(heading);
    let subject = if heading.is_empty() { "this note" } else { heading.as_str() };
    match kind {
        SuggestionType::Idea => format!("Idea for {subject}"),
        SuggestionType::ProjectUpdate => format!("Plan update for {subject}"),
        SuggestionType::Risk => format!("Risk in {subject}"),
        SuggestionType::Bug => format!("Bug in {subject}"),
    }
}

/// Title for a candidate seeded by a sentence.
pub fn sentence_title(kind: SuggestionType, sentence: &str, heading: &str) -> DerivedTitle {
    let derived = match kind {
        SuggestionType::Idea => idea_title(sentence),
        SuggestionType::ProjectUpdate => plan_title(sentence),
        SuggestionType::Risk => risk_title(sentence),
        SuggestionType::Bug => bug_title(sentence),
    };
    match derived {
        Some(title) if has_concrete_content(&title) => DerivedTitle::extracted(title),
        _ => DerivedTitle::templated(template_title(kind, heading)),
    }
}

fn plan_direction(sentence: &str) -> Option<PlanShift> {
    if descope().is_match(sentence) {
        Some(PlanShift::Rescope)
    } else if pull_in().is_match(sentence) {
        Some(PlanShift::PullIn)
    } else if shift_verb().is_match(sentence) {
        Some(PlanShift::Delay)
    } else {
        None
    }
}

fn timeline_delta(sentence: &str) -> Option<String> {
    explicit_duration()
        .find(sentence)
        .or_else(|| date_marker().find(sentence))
        .or_else(|| time_token().find(sentence))
        .map(|m| m.as_str().to_string())
}

fn severity(sentence: &str) -> Severity {
    if severe_outcome().is_match(sentence)
        || (pii().is_match(sentence) && logging_or_user_ids().is_match(sentence))
    {
        Severity::High
    } else if minor_outcome().is_match(sentence) {
        Severity::Low
    } else {
        Severity::Medium
    }
}

/// Split a conditional risk into (condition, consequence) at the first clause
/// break after the conditional.
fn split_condition(sentence: &str) -> (String, Option<String>) {
    let trimmed = trim_clause(sentence);
    let conditional = strong_conditional().find(trimmed).is_some() || has_conditional(trimmed);
    if conditional {
        if let Some(i) = trimmed.find(',') {
            let condition = trim_clause(&trimmed[..i]);
            let rest = trim_clause(&trimmed[i + 1..]);
            if !rest.is_empty() && has_concrete_content(rest) {
                return (condition.to_string(), Some(rest.to_string()));
            }
        }
    }
    (trimmed.to_string(), None)
}

/// Type-specific payload for a candidate grounded in `sentence`.
pub fn build_payload(kind: SuggestionType, sentence: &str) -> SuggestionPayload {
    let text = normalize_whitespace(sentence);
    match kind {
        SuggestionType::Idea => SuggestionPayload::Idea { description: text },
        SuggestionType::ProjectUpdate => SuggestionPayload::ProjectUpdate {
            direction: plan_direction(&text),
            timeline_delta: timeline_delta(&text),
            change_summary: text,
        },
        SuggestionType::Risk => {
            let (condition, consequence) = split_condition(&text);
            SuggestionPayload::Risk {
                severity: severity(&text),
                condition,
                consequence,
            }
        }
        SuggestionType::Bug => SuggestionPayload::Bug {
            severity: severity(&text),
            symptom: text,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_title_is_the_trigger_clause() {
        let t = sentence_title(
            SuggestionType::ProjectUpdate,
            "We're looking at a 4-week delay because the vendor changed the handshake protocol.",
            "Partner",
        );
        assert!(t.extracted);
        assert_eq!(
            t.text,
            "We're looking at a 4-week delay because the vendor changed the handshake"
        );
    }

    #[test]
    fn risk_title_drops_the_conditional() {
        let t = sentence_title(
            SuggestionType::Risk,
            "If we can't prove GDPR compliance by the audit, the partnership is dead in the water.",
            "Partner",
        );
        assert_eq!(t.text, "we can't prove GDPR compliance by the audit");
    }

    #[test]
    fn idea_title_is_the_request_object() {
        let t = sentence_title(SuggestionType::Idea, "They need to build the export API.", "");
        assert_eq!(t.text, "build the export API");

        let t = sentence_title(
            SuggestionType::Idea,
            "Finance asks for a monthly CSV export, ideally by region.",
            "",
        );
        assert_eq!(t.text, "a monthly CSV export");
    }

    #[test]
    fn template_when_nothing_concrete() {
        let t = sentence_title(SuggestionType::Idea, "We should do it.", "Checkout");
        assert!(!t.extracted);
        assert_eq!(t.text, "Idea for Checkout");
        assert_eq!(template_title(SuggestionType::Risk, ""), "Risk in this note");
    }

    #[test]
    fn payloads_carry_type_fields() {
        match build_payload(SuggestionType::ProjectUpdate, "Launch pushed two weeks to Q4") {
            SuggestionPayload::ProjectUpdate {
                direction,
                timeline_delta,
                ..
            } => {
                assert_eq!(direction, Some(PlanShift::Delay));
                assert_eq!(timeline_delta.as_deref(), Some("two weeks"));
            }
            other => panic!("unexpected payload {other:?}"),
        }

        match build_payload(
            SuggestionType::Risk,
            "If we can't prove GDPR compliance, the partnership is dead in the water.",
        ) {
            SuggestionPayload::Risk {
                condition,
                consequence,
                severity,
            } => {
                assert_eq!(condition, "If we can't prove GDPR compliance");
                assert_eq!(consequence.as_deref(), Some("the partnership is dead in the water"));
                assert_eq!(severity, Severity::High);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }
}
