use plansift_model::SuggestionType;

use super::{Detection, SignalExtractor, SignalType};
use crate::lexicon::{demand_amplifier, desire, desire_negation, external_actor};

const BASE_CONFIDENCE: f64 = 0.65;
const AMPLIFIER_BONUS: f64 = 0.10;

/// An external actor asking for something: "customers want bulk export".
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDemandExtractor;

impl SignalExtractor for FeatureDemandExtractor {
    fn signal_type(&self) -> SignalType {
        SignalType::FeatureDemand
    }

    fn proposed_type(&self) -> SuggestionType {
        SuggestionType::Idea
    }

    fn detect(&self, text: &str) -> Option<Detection> {
        if !(external_actor().is_match(text) && desire().is_match(text)) {
            return None;
        }
        if desire_negation().is_match(text) {
            return None;
        }
        if demand_amplifier().is_match(text) {
            Some(Detection::new(BASE_CONFIDENCE + AMPLIFIER_BONUS, "actor_desire_amplified"))
        } else {
            Some(Detection::new(BASE_CONFIDENCE, "actor_desire"))
        }
    }
}
