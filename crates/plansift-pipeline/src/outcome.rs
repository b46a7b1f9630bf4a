//! Stage/reason pairs for everything that does not reach the output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a section or candidate stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropStage {
    Classification,
    TopicIsolation,
    Synthesis,
    Validation,
    Scoring,
    PostCheck,
    Dedup,
    Cap,
    Finalize,
}

impl DropStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            DropStage::Classification => "CLASSIFICATION",
            DropStage::TopicIsolation => "TOPIC_ISOLATION",
            DropStage::Synthesis => "SYNTHESIS",
            DropStage::Validation => "VALIDATION",
            DropStage::Scoring => "SCORING",
            DropStage::PostCheck => "POST_CHECK",
            DropStage::Dedup => "DEDUP",
            DropStage::Cap => "CAP",
            DropStage::Finalize => "FINALIZE",
        }
    }
}

impl fmt::Display for DropStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DropReason {
    // Section-level.
    LowRelevance,
    NotActionable,
    SplitIntoSubsections,

    // Synthesis filter chain.
    NextStepsSection,
    ProcessNoise,
    SpecSection,
    StrategyHeading,
    DiscussionDetails,
    ConsolidatedIntoSection,

    // Validation gates.
    VacuousContent,
    InsufficientEvidence,
    EvidenceNotGrounded,
    HeadingOnly,

    // Scoring, routing and output shaping.
    ScoreBelowThreshold,
    DuplicateFingerprint,
    MaxSuggestionsExceeded,

    InternalError,
}

impl DropReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            DropReason::LowRelevance => "LOW_RELEVANCE",
            DropReason::NotActionable => "NOT_ACTIONABLE",
            DropReason::SplitIntoSubsections => "SPLIT_INTO_SUBSECTIONS",
            DropReason::NextStepsSection => "NEXT_STEPS_SECTION",
            DropReason::ProcessNoise => "PROCESS_NOISE",
            DropReason::SpecSection => "SPEC_SECTION",
            DropReason::StrategyHeading => "STRATEGY_HEADING",
            DropReason::DiscussionDetails => "DISCUSSION_DETAILS",
            DropReason::ConsolidatedIntoSection => "CONSOLIDATED_INTO_SECTION",
            DropReason::VacuousContent => "VACUOUS_CONTENT",
            DropReason::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
            DropReason::EvidenceNotGrounded => "EVIDENCE_NOT_GROUNDED",
            DropReason::HeadingOnly => "HEADING_ONLY",
            DropReason::ScoreBelowThreshold => "SCORE_BELOW_THRESHOLD",
            DropReason::DuplicateFingerprint => "DUPLICATE_FINGERPRINT",
            DropReason::MaxSuggestionsExceeded => "MAX_SUGGESTIONS_EXCEEDED",
            DropReason::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_display() {
        for reason in [
            DropReason::LowRelevance,
            DropReason::SplitIntoSubsections,
            DropReason::DuplicateFingerprint,
            DropReason::InternalError,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{reason}\""));
        }
        let json = serde_json::to_string(&DropStage::PostCheck).unwrap();
        assert_eq!(json, "\"POST_CHECK\"");
    }
}
