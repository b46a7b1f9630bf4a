//! Run-scoped identifiers.
//!
//! Ids are handed out by an `IdGenerator` that the caller creates per run and
//! threads through every stage. There is no module-level counter: two runs over
//! the same note produce the same ids.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identity of a section (including topic-isolated sub-sections).
    SectionId
);

string_id!(
    /// Identity of a suggestion candidate.
    SuggestionId
);

/// Monotonic id source for one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    sections: u64,
    suggestions: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_section_id(&mut self) -> SectionId {
        self.sections += 1;
        SectionId(format!("sec-{}", self.sections))
    }

    pub fn next_suggestion_id(&mut self) -> SuggestionId {
        self.suggestions += 1;
        SuggestionId(format!("sug-{}", self.suggestions))
    }

    pub fn sections_issued(&self) -> u64 {
        self.sections
    }

    pub fn suggestions_issued(&self) -> u64 {
        self.suggestions
    }

    pub fn reset(&mut self) {
        self.sections = 0;
        self.suggestions = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_reset() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_section_id().as_str(), "sec-1");
        assert_eq!(ids.next_section_id().as_str(), "sec-2");
        assert_eq!(ids.next_suggestion_id().as_str(), "sug-1");

        ids.reset();
        assert_eq!(ids.next_section_id().as_str(), "sec-1");
        assert_eq!(ids.suggestions_issued(), 0);
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = SectionId::new("sec-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"sec-7\"");
    }
}
