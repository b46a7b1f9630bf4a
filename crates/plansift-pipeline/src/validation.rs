//! Ordered hard gates over candidates.
//!
//! A failed gate is a value, not an error: it yields a `ValidatorResult` with
//! `passed: false` and, for hard failures, one `DropReason`. The first hard
//! failure stops the remaining gates. A soft failure is recorded and the
//! candidate goes on to scoring, where it is flagged `needs_clarification`.
//!
//! `GateError` is reserved for states that should be impossible (a candidate
//! with no evidence, a section that cannot be found). The pipeline drops only
//! the affected candidate as `INTERNAL_ERROR`.

use plansift_model::text::{has_concrete_content, normalize_whitespace, visible_len, GroundingIndex};
use plansift_model::{Section, SectionId, Suggestion, SuggestionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::outcome::DropReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    AntiVacuity,
    EvidenceSanity,
    HeadingOnly,
}

impl GateName {
    pub const fn as_str(self) -> &'static str {
        match self {
            GateName::AntiVacuity => "anti_vacuity",
            GateName::EvidenceSanity => "evidence_sanity",
            GateName::HeadingOnly => "heading_only",
        }
    }
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorResult {
    pub validator: GateName,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("section {0} not found for candidate")]
    MissingSection(SectionId),

    #[error("candidate {0} carries no evidence")]
    NoEvidence(SuggestionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Pass,
    /// Recorded as failed; the candidate continues.
    Soft(String),
    /// Recorded as failed; the candidate is dropped.
    Fail { reason: String, drop: DropReason },
}

/// What a gate sees besides the candidate.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub section: &'a Section,
    pub section_index: &'a GroundingIndex,
    pub note_index: &'a GroundingIndex,
    pub min_evidence_chars: usize,
    /// Plan-change updates must never vanish, so content gates only flag them.
    pub lenient: bool,
}

impl GateContext<'_> {
    fn fail(&self, reason: String, drop: DropReason) -> GateVerdict {
        if self.lenient {
            GateVerdict::Soft(reason)
        } else {
            GateVerdict::Fail { reason, drop }
        }
    }
}

pub trait Gate {
    fn name(&self) -> GateName;

    fn check(
        &self,
        candidate: &Suggestion,
        ctx: &GateContext<'_>,
    ) -> Result<GateVerdict, GateError>;
}

/// Title and body must name something concrete, and the evidence must be long
/// enough to stand on.
#[derive(Debug, Default, Clone, Copy)]
pub struct AntiVacuity;

impl Gate for AntiVacuity {
    fn name(&self) -> GateName {
        GateName::AntiVacuity
    }

    fn check(
        &self,
        candidate: &Suggestion,
        ctx: &GateContext<'_>,
    ) -> Result<GateVerdict, GateError> {
        if !has_concrete_content(&candidate.title) {
            return Ok(ctx.fail(
                "title has no concrete content".to_string(),
                DropReason::VacuousContent,
            ));
        }
        if !has_concrete_content(candidate.body()) {
            return Ok(ctx.fail(
                "body has no concrete content".to_string(),
                DropReason::VacuousContent,
            ));
        }
        let evidence_chars: usize = candidate.evidence.iter().map(|e| visible_len(&e.text)).sum();
        if evidence_chars < ctx.min_evidence_chars {
            return Ok(ctx.fail(
                format!(
                    "evidence has {evidence_chars} visible chars, need {}",
                    ctx.min_evidence_chars
                ),
                DropReason::InsufficientEvidence,
            ));
        }
        Ok(GateVerdict::Pass)
    }
}

/// Evidence must be an excerpt of the note, and should be an excerpt of its own
/// section. The first is a hard failure; the second only flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvidenceSanity;

impl Gate for EvidenceSanity {
    fn name(&self) -> GateName {
        GateName::EvidenceSanity
    }

    fn check(
        &self,
        candidate: &Suggestion,
        ctx: &GateContext<'_>,
    ) -> Result<GateVerdict, GateError> {
        if candidate.evidence.is_empty() {
            return Err(GateError::NoEvidence(candidate.id.clone()));
        }
        for span in candidate.evidence.iter().filter(|s| !s.text.trim().is_empty()) {
            if !ctx.note_index.contains(&span.text) {
                return Ok(GateVerdict::Fail {
                    reason: format!(
                        "evidence at lines {}-{} is not in the note",
                        span.start_line, span.end_line
                    ),
                    drop: DropReason::EvidenceNotGrounded,
                });
            }
            if !ctx.section_index.contains(&span.text) {
                return Ok(GateVerdict::Soft("evidence_outside_section".to_string()));
            }
        }
        Ok(GateVerdict::Pass)
    }
}

fn heading_key(s: &str) -> String {
    normalize_whitespace(s)
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// A candidate whose only evidence is the section heading says nothing the
/// heading did not.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingOnly;

impl Gate for HeadingOnly {
    fn name(&self) -> GateName {
        GateName::HeadingOnly
    }

    fn check(
        &self,
        candidate: &Suggestion,
        ctx: &GateContext<'_>,
    ) -> Result<GateVerdict, GateError> {
        let heading = heading_key(&ctx.section.heading);
        if heading.is_empty() {
            return Ok(GateVerdict::Pass);
        }
        let only_heading = !candidate.evidence.is_empty()
            && candidate
                .evidence
                .iter()
                .all(|span| heading_key(&span.text) == heading);
        if only_heading {
            return Ok(ctx.fail(
                "evidence is the section heading".to_string(),
                DropReason::HeadingOnly,
            ));
        }
        Ok(GateVerdict::Pass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Passed {
        results: Vec<ValidatorResult>,
        /// Soft failure reasons, in gate order.
        soft: Vec<String>,
    },
    Rejected {
        results: Vec<ValidatorResult>,
        drop: DropReason,
        detail: String,
    },
    Errored {
        results: Vec<ValidatorResult>,
        error: GateError,
    },
}

impl ValidationOutcome {
    pub fn results(&self) -> &[ValidatorResult] {
        match self {
            ValidationOutcome::Passed { results, .. }
            | ValidationOutcome::Rejected { results, .. }
            | ValidationOutcome::Errored { results, .. } => results,
        }
    }
}

pub struct Validator {
    gates: Vec<Box<dyn Gate>>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.gates.iter().map(|g| g.name()))
            .finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::standard()
    }
}

impl Validator {
    /// anti-vacuity, evidence sanity, heading-only.
    pub fn standard() -> Self {
        Self {
            gates: vec![
                Box::new(AntiVacuity),
                Box::new(EvidenceSanity),
                Box::new(HeadingOnly),
            ],
        }
    }

    pub fn validate(&self, candidate: &Suggestion, ctx: &GateContext<'_>) -> ValidationOutcome {
        let mut results = Vec::with_capacity(self.gates.len());
        let mut soft = Vec::new();

        for gate in &self.gates {
            let verdict = match gate.check(candidate, ctx) {
                Ok(verdict) => verdict,
                Err(error) => {
                    results.push(ValidatorResult {
                        validator: gate.name(),
                        passed: false,
                        reason: Some(error.to_string()),
                    });
                    return ValidationOutcome::Errored { results, error };
                }
            };
            match verdict {
                GateVerdict::Pass => results.push(ValidatorResult {
                    validator: gate.name(),
                    passed: true,
                    reason: None,
                }),
                GateVerdict::Soft(reason) => {
                    results.push(ValidatorResult {
                        validator: gate.name(),
                        passed: false,
                        reason: Some(reason.clone()),
                    });
                    soft.push(reason);
                }
                GateVerdict::Fail { reason, drop } => {
                    results.push(ValidatorResult {
                        validator: gate.name(),
                        passed: false,
                        reason: Some(reason.clone()),
                    });
                    return ValidationOutcome::Rejected {
                        results,
                        drop,
                        detail: reason,
                    };
                }
            }
        }
        ValidationOutcome::Passed { results, soft }
    }
}
