//! Scoring and the overall threshold.
//!
//! `overall` is the mean of actionability, type confidence and synthesis
//! confidence (see `ScoreBreakdown`). Below `t_overall_min` a candidate is
//! dropped, except a `project_update` from a plan-change section: that one is
//! flagged `needs_clarification` instead.

use plansift_model::{PipelineConfig, ScoreBreakdown, Suggestion, SuggestionType};

use crate::classifier::ClassifiedSection;

pub const BELOW_THRESHOLD_FLAG: &str = "score_below_threshold";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDecision {
    Keep,
    /// Kept, but flagged with this reason.
    Flag(&'static str),
    Drop,
}

#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    t_overall_min: f64,
}

/// Plan-change updates are never threshold-dropped.
pub fn is_protected(candidate: &Suggestion, section: &ClassifiedSection) -> bool {
    candidate.suggestion_type() == SuggestionType::ProjectUpdate && section.is_plan_change()
}

impl Scorer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            t_overall_min: config.t_overall_min,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.t_overall_min
    }

    /// Recompute `candidate.scores` against its section and decide.
    pub fn score(&self, candidate: &mut Suggestion, section: &ClassifiedSection) -> ScoreDecision {
        candidate.scores = ScoreBreakdown::new(
            section.actionability.actionable_signal,
            candidate.scores.type_confidence(),
            candidate.scores.synthesis_confidence(),
        );
        let overall = candidate.scores.overall();

        let decision = if overall >= self.t_overall_min {
            ScoreDecision::Keep
        } else if is_protected(candidate, section) {
            ScoreDecision::Flag(BELOW_THRESHOLD_FLAG)
        } else {
            ScoreDecision::Drop
        };
        tracing::debug!(
            candidate_id = %candidate.id,
            overall,
            threshold = self.t_overall_min,
            ?decision,
            "candidate scored"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SectionClassifier;
    use approx::assert_relative_eq;
    use plansift_model::{
        split_sentences, EvidenceSpan, IdGenerator, MarkdownSectionProvider, NoteInput, Provenance,
        SectionProvider, SuggestionId, SuggestionPayload,
    };

    fn classified(text: &str) -> ClassifiedSection {
        let section = MarkdownSectionProvider
            .sections(&NoteInput::new("n1", text), &mut IdGenerator::new())
            .unwrap()
            .remove(0);
        let sentences = split_sentences(&section);
        SectionClassifier::new(&PipelineConfig::default()).classify(section, &sentences)
    }

    fn candidate(
        section: &ClassifiedSection,
        payload: SuggestionPayload,
        t: f64,
        s: f64,
    ) -> Suggestion {
        let mut c = Suggestion::candidate(
            SuggestionId::new("sug-1"),
            "n1",
            section.section.id.clone(),
            "Review moved",
            payload,
            vec![EvidenceSpan::new(2, 2, "The review moved to the afternoon.")],
            Provenance::Signal,
        );
        c.scores = ScoreBreakdown::new(0.0, t, s);
        c
    }

    #[test]
    fn plan_change_update_is_flagged_not_dropped() {
        let section = classified("# Review\nThe review moved to the afternoon.");
        assert!(section.is_plan_change());
        let scorer = Scorer::new(&PipelineConfig::default());

        let mut update = candidate(
            &section,
            SuggestionPayload::ProjectUpdate {
                change_summary: "The review moved to the afternoon.".into(),
                direction: None,
                timeline_delta: None,
            },
            0.1,
            0.1,
        );
        assert_eq!(scorer.score(&mut update, &section), ScoreDecision::Flag(BELOW_THRESHOLD_FLAG));
        assert_relative_eq!(
            update.scores.actionability(),
            section.actionability.actionable_signal
        );

        let mut idea = candidate(
            &section,
            SuggestionPayload::Idea {
                description: "The review moved to the afternoon.".into(),
            },
            0.1,
            0.1,
        );
        assert_eq!(scorer.score(&mut idea, &section), ScoreDecision::Drop);
    }

    #[test]
    fn strong_candidates_are_kept() {
        let section =
            classified("# Exports\nFinance needs a monthly invoice export before the renewal.");
        let scorer = Scorer::new(&PipelineConfig::default());
        let mut idea = candidate(
            &section,
            SuggestionPayload::Idea {
                description: "Finance needs a monthly invoice export".into(),
            },
            0.9,
            0.85,
        );
        assert_eq!(scorer.score(&mut idea, &section), ScoreDecision::Keep);
    }
}
