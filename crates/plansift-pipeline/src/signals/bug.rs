use plansift_model::SuggestionType;

use super::{Detection, SignalExtractor, SignalType};
use crate::lexicon::{failure, has_speculation};

const CONFIDENCE: f64 = 0.70;

/// An observed failure. Speculative failure language is a risk, not a bug.
#[derive(Debug, Clone, Copy, Default)]
pub struct BugExtractor;

impl SignalExtractor for BugExtractor {
    fn signal_type(&self) -> SignalType {
        SignalType::Bug
    }

    fn proposed_type(&self) -> SuggestionType {
        SuggestionType::Bug
    }

    fn detect(&self, text: &str) -> Option<Detection> {
        if !failure().is_match(text) || has_speculation(text) {
            return None;
        }
        Some(Detection::new(CONFIDENCE, "observed_failure"))
    }
}
