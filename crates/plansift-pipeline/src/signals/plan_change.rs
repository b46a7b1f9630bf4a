use plansift_model::SuggestionType;

use super::{Detection, SignalExtractor, SignalType};
use crate::lexicon::{has_conditional, has_time_token, shift_verb};

const CONFIDENCE: f64 = 0.75;

/// A committed schedule change: a shift verb next to a time or milestone token.
///
/// Conditional phrasing ("we might slip Q3") is a risk, not a change, and is
/// left to the scope-risk extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanChangeExtractor;

impl SignalExtractor for PlanChangeExtractor {
    fn signal_type(&self) -> SignalType {
        SignalType::PlanChange
    }

    fn proposed_type(&self) -> SuggestionType {
        SuggestionType::ProjectUpdate
    }

    fn detect(&self, text: &str) -> Option<Detection> {
        if !shift_verb().is_match(text) || !has_time_token(text) {
            return None;
        }
        if has_conditional(text) {
            return None;
        }
        Some(Detection::new(CONFIDENCE, "shift_with_time"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_committed_shifts() {
        let x = PlanChangeExtractor;
        assert!(x.detect("Launch pushed to Q4").is_some());
        assert!(x.detect("We're looking at a 4-week delay on the handshake work").is_some());
        assert!(x.detect("GA moved to May 14").is_some());
        assert!(x.detect("Beta was pulled in by a sprint").is_some());
    }

    #[test]
    fn needs_both_halves() {
        let x = PlanChangeExtractor;
        assert!(x.detect("Launch is on Q4").is_none());
        assert!(x.detect("The review got delayed").is_none());
    }

    #[test]
    fn conditional_vetoes() {
        let x = PlanChangeExtractor;
        assert!(x.detect("If the vendor is late we might push the launch to Q4").is_none());
        assert!(x.detect("Launch could slip a week").is_none());
    }
}
