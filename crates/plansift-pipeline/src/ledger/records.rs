//! Plain, serializable ledger records.
//!
//! A `DebugRun` is nested structs, vectors and ordered maps only, so it can be
//! written out as JSON and read back without any pipeline types being live.

use plansift_model::{
    PipelineConfig, RoutingIntent, ScoreBreakdown, SectionFeatures, SectionId, SuggestionId,
    SuggestionStatus, SuggestionType, Verbosity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classifier::{Actionability, IntentLabel, IntentScores};
use crate::outcome::{DropReason, DropStage};
use crate::signals::SignalType;
use crate::validation::ValidatorResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub note_id: String,
    pub run_id: String,
    pub generator_version: String,
    /// `sha256:<hex>` of the raw note text.
    pub content_hash: String,
    /// RFC 3339.
    pub created_at: String,
    pub verbosity: Verbosity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub char_count: usize,
    pub line_count: usize,
    pub section_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropRecord {
    pub stage: DropStage,
    pub reason: DropReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalDebug {
    pub signal_type: SignalType,
    pub proposed_type: SuggestionType,
    pub confidence: f64,
    pub sentence_index: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDebug {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Where a candidate stopped, or that it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateFate {
    Pending,
    Emitted,
    Dropped {
        stage: DropStage,
        reason: DropReason,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        detail: String,
    },
}

impl CandidateFate {
    pub fn is_pending(&self) -> bool {
        matches!(self, CandidateFate::Pending)
    }

    pub fn drop_record(&self) -> Option<DropRecord> {
        match self {
            CandidateFate::Dropped { stage, reason, .. } => Some(DropRecord {
                stage: *stage,
                reason: *reason,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDebug {
    pub candidate_id: SuggestionId,
    pub suggestion_type: SuggestionType,
    pub provenance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fingerprint: String,
    pub evidence: Vec<EvidenceDebug>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidatorResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreBreakdown>,
    pub status: SuggestionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clarification_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingIntent>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    pub emitted: bool,
    pub fate: CandidateFate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDebug {
    pub section_id: SectionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub heading_level: u8,
    pub start_line: usize,
    pub end_line: usize,
    pub features: SectionFeatures,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_label: Option<IntentLabel>,
    pub top_score: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cues: BTreeMap<IntentLabel, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actionability: Option<Actionability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<SuggestionType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signals: Vec<SignalDebug>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<DropRecord>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub drop_detail: String,
    /// Set by `finalize`: at least one candidate of this section was emitted.
    #[serde(default)]
    pub emitted: bool,
    pub emitted_count: usize,
    pub candidates: Vec<CandidateDebug>,
}

impl SectionDebug {
    pub fn is_split(&self) -> bool {
        self.drop
            .is_some_and(|d| d.reason == DropReason::SplitIntoSubsections)
    }

    /// Ids listed under the `subsection_ids` metadata key.
    pub fn subsection_ids(&self) -> Vec<SectionId> {
        self.metadata
            .get(SUBSECTION_IDS_KEY)
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(SectionId::new)
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub const SUBSECTION_IDS_KEY: &str = "subsection_ids";
pub const FALLBACK_SKIP_KEY: &str = "fallback_skip";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub micros: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub invariant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<SuggestionId>,
    pub detail: String,
}

/// The audit read-model of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugRun {
    pub meta: RunMeta,
    pub config: PipelineConfig,
    pub note_summary: NoteSummary,
    pub sections: Vec<SectionDebug>,
    pub timings: Vec<StageTiming>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invariant_violations: Vec<InvariantViolation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl DebugRun {
    pub fn section(&self, id: &SectionId) -> Option<&SectionDebug> {
        self.sections.iter().find(|s| &s.section_id == id)
    }

    pub fn candidates(&self) -> impl Iterator<Item = &CandidateDebug> {
        self.sections.iter().flat_map(|s| s.candidates.iter())
    }

    pub fn emitted_ids(&self) -> Vec<SuggestionId> {
        self.candidates()
            .filter(|c| c.emitted)
            .map(|c| c.candidate_id.clone())
            .collect()
    }

    /// Candidate counts keyed by `EMITTED` or `STAGE/REASON`.
    pub fn summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for candidate in self.candidates() {
            let key = match &candidate.fate {
                CandidateFate::Emitted => "EMITTED".to_string(),
                CandidateFate::Pending => "PENDING".to_string(),
                CandidateFate::Dropped { stage, reason, .. } => format!("{stage}/{reason}"),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }

    /// Section drop counts keyed by `STAGE/REASON`.
    pub fn section_summary(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for section in &self.sections {
            if let Some(drop) = section.drop {
                *counts
                    .entry(format!("{}/{}", drop.stage, drop.reason))
                    .or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
