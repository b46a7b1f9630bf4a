use plansift_model::SuggestionType;

use super::{Detection, SignalExtractor, SignalType};
use crate::lexicon::{
    consequence, desire, external_actor, has_conditional, is_schedule_slip, logging_or_user_ids,
    pii, risk_vocab, strong_conditional, subjective_prefix,
};

const STRONG_CONDITIONAL: f64 = 0.80;
const CONDITIONAL_CONSEQUENCE: f64 = 0.70;
const VOCABULARY: f64 = 0.70;
const PII_IN_LOGS: f64 = 0.85;

/// Scope and delivery risks, on three independent paths:
///
/// - A: a strong actionable conditional ("if we can't ...", "might need to be ...");
/// - B: a bare conditional plus a consequence (release, compliance, partnership, ...);
/// - C: risk vocabulary (risk, PII, GDPR, security, blocker, ...).
///
/// A sentence that opens with a subjective observation ("some concern that ...")
/// describes a feeling and fires on no path. Path C also stands down for schedule
/// slips and for feature requests, which belong to the plan-change and
/// feature-demand extractors. When several paths fire, the highest wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeRiskExtractor;

impl ScopeRiskExtractor {
    fn vocabulary_path(text: &str) -> Option<Detection> {
        if !risk_vocab().is_match(text) {
            return None;
        }
        if is_schedule_slip(text) {
            return None;
        }
        if external_actor().is_match(text) && desire().is_match(text) {
            return None;
        }
        if pii().is_match(text) && logging_or_user_ids().is_match(text) {
            Some(Detection::new(PII_IN_LOGS, "pii_in_logs"))
        } else {
            Some(Detection::new(VOCABULARY, "risk_vocabulary"))
        }
    }
}

impl SignalExtractor for ScopeRiskExtractor {
    fn signal_type(&self) -> SignalType {
        SignalType::ScopeRisk
    }

    fn proposed_type(&self) -> SuggestionType {
        SuggestionType::Risk
    }

    fn detect(&self, text: &str) -> Option<Detection> {
        if subjective_prefix().is_match(text) {
            return None;
        }

        let mut candidates = Vec::with_capacity(3);
        if strong_conditional().is_match(text) {
            candidates.push(Detection::new(STRONG_CONDITIONAL, "strong_conditional"));
        }
        if has_conditional(text) && consequence().is_match(text) {
            candidates.push(Detection::new(CONDITIONAL_CONSEQUENCE, "conditional_consequence"));
        }
        candidates.extend(Self::vocabulary_path(text));

        // Highest confidence wins; ties keep path order.
        candidates
            .into_iter()
            .reduce(|best, next| if next.confidence > best.confidence { next } else { best })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn strong_conditional_path() {
        let d = ScopeRiskExtractor
            .detect("If we can't prove GDPR compliance, the partnership is dead in the water")
            .unwrap();
        assert_eq!(d.rule, "strong_conditional");
        assert_relative_eq!(d.confidence, 0.8);
    }

    #[test]
    fn conditional_with_consequence_path() {
        let d = ScopeRiskExtractor
            .detect("The release may depend on the data residency review")
            .unwrap();
        assert_eq!(d.rule, "conditional_consequence");
    }

    #[test]
    fn pii_in_logs_is_elevated() {
        let d = ScopeRiskExtractor
            .detect("We are writing PII into request logging with raw user IDs")
            .unwrap();
        assert_relative_eq!(d.confidence, 0.85);
        let pii = ScopeRiskExtractor.detect("PII handling needs a review").unwrap();
        assert_eq!(pii.rule, "risk_vocabulary");
    }

    #[test]
    fn subjective_prefix_suppresses_all_paths() {
        assert!(ScopeRiskExtractor
            .detect("Some concern that if we can't ship the partnership is at risk")
            .is_none());
    }

    #[test]
    fn vocabulary_path_yields_to_other_extractors() {
        // schedule slip
        assert!(ScopeRiskExtractor
            .detect("Security review slipped two weeks")
            .is_none());
        // feature request
        assert!(ScopeRiskExtractor
            .detect("Customers want SOC2 compliance reports")
            .is_none());
    }
}
