//! Suggestions and their parts.
//!
//! A `Suggestion` starts life as a candidate in the synthesizer and is refined by
//! the validator, scorer and router. Refinement only adds: scores are replaced by
//! a recomputed breakdown, routing is set once, and clarification reasons
//! accumulate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::digest::suggestion_fingerprint;
use crate::{SectionId, Sentence, SuggestionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionType {
    Idea,
    ProjectUpdate,
    Risk,
    Bug,
}

impl SuggestionType {
    pub const ALL: [SuggestionType; 4] = [
        SuggestionType::Idea,
        SuggestionType::ProjectUpdate,
        SuggestionType::Risk,
        SuggestionType::Bug,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            SuggestionType::Idea => "idea",
            SuggestionType::ProjectUpdate => "project_update",
            SuggestionType::Risk => "risk",
            SuggestionType::Bug => "bug",
        }
    }
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verbatim excerpt of the note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

impl EvidenceSpan {
    pub fn new(start_line: usize, end_line: usize, text: impl Into<String>) -> Self {
        Self {
            start_line,
            end_line,
            text: text.into(),
        }
    }

    pub fn from_sentence(sentence: &Sentence) -> Self {
        Self::new(sentence.start_line, sentence.end_line, sentence.text.clone())
    }
}

/// Sub-scores and their aggregate.
///
/// `overall` is always the arithmetic mean of the three sub-scores, each clamped
/// to [0, 1]. The mean is monotonic in every input and treats them symmetrically,
/// so no single sub-score can carry a candidate over the threshold alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    actionability: f64,
    type_confidence: f64,
    synthesis_confidence: f64,
    overall: f64,
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

impl ScoreBreakdown {
    pub fn new(actionability: f64, type_confidence: f64, synthesis_confidence: f64) -> Self {
        let actionability = clamp_unit(actionability);
        let type_confidence = clamp_unit(type_confidence);
        let synthesis_confidence = clamp_unit(synthesis_confidence);
        Self {
            actionability,
            type_confidence,
            synthesis_confidence,
            overall: (actionability + type_confidence + synthesis_confidence) / 3.0,
        }
    }

    pub fn actionability(&self) -> f64 {
        self.actionability
    }

    pub fn type_confidence(&self) -> f64 {
        self.type_confidence
    }

    pub fn synthesis_confidence(&self) -> f64 {
        self.synthesis_confidence
    }

    pub fn overall(&self) -> f64 {
        self.overall
    }
}

impl Default for ScoreBreakdown {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingIntent {
    #[default]
    CreateNew,
    AttachToExisting { plan_item_id: String, similarity: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    #[default]
    Ready,
    NeedsClarification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanShift {
    Delay,
    PullIn,
    Rescope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

/// Type-specific body of a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionPayload {
    Idea {
        description: String,
    },
    ProjectUpdate {
        change_summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<PlanShift>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeline_delta: Option<String>,
    },
    Risk {
        condition: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        consequence: Option<String>,
        severity: Severity,
    },
    Bug {
        symptom: String,
        severity: Severity,
    },
}

impl SuggestionPayload {
    pub fn suggestion_type(&self) -> SuggestionType {
        match self {
            SuggestionPayload::Idea { .. } => SuggestionType::Idea,
            SuggestionPayload::ProjectUpdate { .. } => SuggestionType::ProjectUpdate,
            SuggestionPayload::Risk { .. } => SuggestionType::Risk,
            SuggestionPayload::Bug { .. } => SuggestionType::Bug,
        }
    }

    /// The main free-text field, whatever the type.
    pub fn body(&self) -> &str {
        match self {
            SuggestionPayload::Idea { description } => description,
            SuggestionPayload::ProjectUpdate { change_summary, .. } => change_summary,
            SuggestionPayload::Risk { condition, .. } => condition,
            SuggestionPayload::Bug { symptom, .. } => symptom,
        }
    }
}

/// How a candidate came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "b-signal")]
    Signal,
    #[serde(rename = "dense-paragraph")]
    DenseParagraph,
    #[serde(rename = "consolidated-section")]
    ConsolidatedSection,
    #[serde(rename = "explicit-ask")]
    ExplicitAsk,
    #[serde(rename = "plan-change-fallback")]
    PlanChangeFallback,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Provenance::Signal => "b-signal",
            Provenance::DenseParagraph => "dense-paragraph",
            Provenance::ConsolidatedSection => "consolidated-section",
            Provenance::ExplicitAsk => "explicit-ask",
            Provenance::PlanChangeFallback => "plan-change-fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub note_id: String,
    pub section_id: SectionId,
    pub title: String,
    pub payload: SuggestionPayload,
    pub evidence: Vec<EvidenceSpan>,
    pub scores: ScoreBreakdown,
    #[serde(default)]
    pub routing: RoutingIntent,
    pub fingerprint: String,
    #[serde(default)]
    pub status: SuggestionStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clarification_reasons: Vec<String>,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Suggestion {
    /// A fresh candidate. Scores start at zero and routing at `create_new`.
    pub fn candidate(
        id: SuggestionId,
        note_id: impl Into<String>,
        section_id: SectionId,
        title: impl Into<String>,
        payload: SuggestionPayload,
        evidence: Vec<EvidenceSpan>,
        provenance: Provenance,
    ) -> Self {
        let note_id = note_id.into();
        let title = title.into();
        let fingerprint = suggestion_fingerprint(
            &note_id,
            section_id.as_str(),
            payload.suggestion_type().as_str(),
            &title,
        );
        Self {
            id,
            note_id,
            section_id,
            title,
            payload,
            evidence,
            scores: ScoreBreakdown::default(),
            routing: RoutingIntent::CreateNew,
            fingerprint,
            status: SuggestionStatus::Ready,
            clarification_reasons: Vec::new(),
            provenance,
            metadata: BTreeMap::new(),
        }
    }

    pub fn suggestion_type(&self) -> SuggestionType {
        self.payload.suggestion_type()
    }

    pub fn body(&self) -> &str {
        self.payload.body()
    }

    pub fn needs_clarification(&self) -> bool {
        self.status == SuggestionStatus::NeedsClarification
    }

    /// Move to `needs_clarification`, recording why. Repeated reasons are kept once.
    pub fn flag_needs_clarification(&mut self, reason: impl Into<String>) {
        self.status = SuggestionStatus::NeedsClarification;
        let reason = reason.into();
        if !self.clarification_reasons.contains(&reason) {
            self.clarification_reasons.push(reason);
        }
    }

    /// Replace the title and recompute the fingerprint that depends on it.
    pub fn retitle(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.fingerprint = suggestion_fingerprint(
            &self.note_id,
            self.section_id.as_str(),
            self.suggestion_type().as_str(),
            &self.title,
        );
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
