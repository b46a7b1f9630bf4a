//! Signal extractors.
//!
//! Each extractor scans sentences for one phenomenon and is independent of the
//! others. An extractor is built from three pattern classes: inclusion patterns
//! that must match, suppression patterns that veto a match, and amplifiers that
//! raise confidence. Results of all extractors are concatenated, never merged;
//! cross-type dedup is the synthesizer's job.

mod bug;
mod feature_demand;
mod plan_change;
mod scope_risk;

pub use bug::BugExtractor;
pub use feature_demand::FeatureDemandExtractor;
pub use plan_change::PlanChangeExtractor;
pub use scope_risk::ScopeRiskExtractor;

use plansift_model::{Sentence, SuggestionType};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    FeatureDemand,
    PlanChange,
    ScopeRisk,
    Bug,
}

impl SignalType {
    pub const fn as_str(self) -> &'static str {
        match self {
            SignalType::FeatureDemand => "FEATURE_DEMAND",
            SignalType::PlanChange => "PLAN_CHANGE",
            SignalType::ScopeRisk => "SCOPE_RISK",
            SignalType::Bug => "BUG",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, confidence-scored hint extracted from one sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub proposed_type: SuggestionType,
    pub confidence: f64,
    pub source_sentence: String,
    pub sentence_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    /// Which inclusion path fired.
    pub rule: &'static str,
}

/// Result of matching one sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: f64,
    pub rule: &'static str,
}

impl Detection {
    pub fn new(confidence: f64, rule: &'static str) -> Self {
        Self { confidence, rule }
    }
}

pub trait SignalExtractor {
    fn signal_type(&self) -> SignalType;

    fn proposed_type(&self) -> SuggestionType;

    /// Match one sentence. At most one detection per sentence.
    fn detect(&self, text: &str) -> Option<Detection>;

    fn extract(&self, sentences: &[Sentence]) -> Vec<Signal> {
        sentences
            .iter()
            .filter_map(|sentence| {
                let detection = self.detect(&sentence.text)?;
                Some(Signal {
                    signal_type: self.signal_type(),
                    proposed_type: self.proposed_type(),
                    confidence: detection.confidence.clamp(0.0, 1.0),
                    source_sentence: sentence.text.clone(),
                    sentence_index: sentence.index,
                    start_line: sentence.start_line,
                    end_line: sentence.end_line,
                    rule: detection.rule,
                })
            })
            .collect()
    }
}

/// The four built-in extractors.
pub fn default_extractors() -> Vec<Box<dyn SignalExtractor>> {
    vec![
        Box::new(FeatureDemandExtractor),
        Box::new(PlanChangeExtractor),
        Box::new(ScopeRiskExtractor),
        Box::new(BugExtractor),
    ]
}

/// Run every extractor and concatenate, in extractor order.
pub fn extract_all(extractors: &[Box<dyn SignalExtractor>], sentences: &[Sentence]) -> Vec<Signal> {
    extractors
        .iter()
        .flat_map(|extractor| extractor.extract(sentences))
        .collect()
}
