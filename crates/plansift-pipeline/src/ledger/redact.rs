//! Free-text handling for the ledger.
//!
//! In `redacted` mode, text is scrubbed of emails, card numbers, SSNs and phone
//! numbers and cut to a short preview before it is stored. In `full_text` mode
//! it is stored as-is.

use plansift_model::static_regex;
use plansift_model::text::{normalize_whitespace, truncate_chars};
use plansift_model::Verbosity;

/// Characters kept from any free text in `redacted` mode.
pub const PREVIEW_CHARS: usize = 120;

static_regex!(fn email = r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b");

static_regex!(fn card_number = r"\b\d(?:[ -]?\d){12,18}\b");

static_regex!(fn ssn = r"\b\d{3}-\d{2}-\d{4}\b");

static_regex!(fn phone = r"(?:\+\d{1,2}[\s.-]?)?(?:\(\d{3}\)|\b\d{3})[\s.-]?\d{3}[\s.-]?\d{4}\b");

/// Replace PII-shaped substrings with placeholders. Cards and SSNs go before
/// phones so their digits are not half-matched as a phone number.
pub fn redact(text: &str) -> String {
    let text = email().replace_all(text, "[EMAIL]");
    let text = card_number().replace_all(&text, "[CARD]");
    let text = ssn().replace_all(&text, "[SSN]");
    phone().replace_all(&text, "[PHONE]").into_owned()
}

#[derive(Debug, Clone, Copy)]
pub struct Redactor {
    verbosity: Verbosity,
}

impl Redactor {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// What the ledger may keep of `text`.
    pub fn store(&self, text: &str) -> Option<String> {
        match self.verbosity {
            Verbosity::Off => None,
            Verbosity::Redacted => {
                let scrubbed = redact(&normalize_whitespace(text));
                Some(truncate_chars(&scrubbed, PREVIEW_CHARS))
            }
            Verbosity::FullText => Some(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_pii() {
        let out = redact(
            "Mail jo@example.com or call (555) 123-4567; \
             card 4111 1111 1111 1111, ssn 123-45-6789.",
        );
        assert_eq!(
            out,
            "Mail [EMAIL] or call [PHONE]; card [CARD], ssn [SSN]."
        );
    }

    #[test]
    fn leaves_plain_numbers() {
        let plain = "Launch slipped 4 weeks to Q3 2025";
        assert_eq!(redact(plain), plain);
    }

    #[test]
    fn store_by_verbosity() {
        let long = "word ".repeat(100);
        assert_eq!(Redactor::new(Verbosity::Off).store("x"), None);
        assert_eq!(
            Redactor::new(Verbosity::Redacted).store(&long).map(|s| s.chars().count()),
            Some(PREVIEW_CHARS)
        );
        assert_eq!(
            Redactor::new(Verbosity::FullText).store("a  b").as_deref(),
            Some("a  b")
        );
    }
}
