//! Fragment consolidation.
//!
//! A bulleted list of small asks under one heading reads better as one idea
//! than as five. When a section yields three or more `idea` candidates and
//! nothing in it talks about dates or slips, they are folded into one
//! candidate titled after the heading.

use plansift_model::text::{has_concrete_content, smart_truncate};
use plansift_model::{
    EvidenceSpan, IdGenerator, Provenance, ScoreBreakdown, Suggestion, SuggestionPayload,
    SuggestionType, TitleNormalizer,
};

use super::{synthesis_confidence, SectionUnit};
use crate::lexicon::{descope, has_time_token, shift_verb};
use crate::signals::{Signal, SignalType};

pub const MIN_FRAGMENTS: usize = 3;
pub const MAX_HEADING_LEVEL: u8 = 3;
pub const MIN_BULLETS: usize = 3;
/// Evidence texts joined into the consolidated body.
pub const MAX_JOINED_SPANS: usize = 4;
pub const MAX_BODY_CHARS: usize = 320;

pub const CONSOLIDATED_FROM_KEY: &str = "consolidated_from";

#[derive(Debug, Clone, PartialEq)]
pub struct Consolidation {
    /// Candidates going forward.
    pub candidates: Vec<Suggestion>,
    /// Candidates folded into `consolidated`.
    pub merged: Vec<Suggestion>,
    pub consolidated: Option<Suggestion>,
}

impl Consolidation {
    fn unchanged(candidates: Vec<Suggestion>) -> Self {
        Self {
            candidates,
            merged: Vec::new(),
            consolidated: None,
        }
    }
}

fn has_timeline_language(text: &str) -> bool {
    shift_verb().is_match(text) || descope().is_match(text) || has_time_token(text)
}

/// Why `candidates` may not be folded, or `None` when they may.
pub fn blocker(
    candidates: &[Suggestion],
    unit: &SectionUnit,
    signals: &[Signal],
) -> Option<&'static str> {
    let section = unit.section();
    if candidates.len() < MIN_FRAGMENTS {
        return Some("too_few_fragments");
    }
    if candidates
        .iter()
        .any(|c| c.provenance == Provenance::ConsolidatedSection)
    {
        return Some("already_consolidated");
    }
    if candidates
        .iter()
        .any(|c| c.suggestion_type() != SuggestionType::Idea)
    {
        return Some("mixed_types");
    }
    if section.heading_level > MAX_HEADING_LEVEL {
        return Some("deep_nesting");
    }
    if section.features.bullet_count < MIN_BULLETS {
        return Some("too_few_bullets");
    }
    if signals.iter().any(|s| s.signal_type == SignalType::PlanChange)
        || candidates
            .iter()
            .flat_map(|c| c.evidence.iter())
            .any(|e| has_timeline_language(&e.text))
    {
        return Some("timeline_language");
    }
    None
}

/// Fold qualifying `idea` fragments into one candidate.
///
/// Consolidating a single already-consolidated candidate returns it unchanged.
pub fn consolidate(
    candidates: Vec<Suggestion>,
    unit: &SectionUnit,
    signals: &[Signal],
    titles: &dyn TitleNormalizer,
    ids: &mut IdGenerator,
) -> Consolidation {
    if let Some(reason) = blocker(&candidates, unit, signals) {
        if candidates.len() >= MIN_FRAGMENTS {
            tracing::debug!(section_id = %unit.id(), reason, "fragments not consolidated");
        }
        return Consolidation::unchanged(candidates);
    }

    let section = unit.section();
    let evidence: Vec<EvidenceSpan> = candidates
        .iter()
        .flat_map(|c| c.evidence.iter().cloned())
        .collect();

    let joined = evidence
        .iter()
        .take(MAX_JOINED_SPANS)
        .map(|e| e.text.trim().trim_end_matches(['.', ';']).to_string())
        .collect::<Vec<_>>()
        .join("; ");
    let description = smart_truncate(&joined, MAX_BODY_CHARS);

    let heading_title = titles.normalize(&section.heading, &[]);
    let title = if has_concrete_content(&heading_title) {
        heading_title
    } else {
        let context = section
            .context_heading
            .as_deref()
            .map(|h| titles.normalize(h, &[]))
            .filter(|h| has_concrete_content(h));
        match context {
            Some(context) => context,
            None => candidates[0].title.clone(),
        }
    };

    let type_confidence = candidates
        .iter()
        .map(|c| c.scores.type_confidence())
        .fold(0.0, f64::max);
    let merged_ids = candidates
        .iter()
        .map(|c| c.id.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut consolidated = Suggestion::candidate(
        ids.next_suggestion_id(),
        candidates[0].note_id.clone(),
        section.id.clone(),
        title,
        SuggestionPayload::Idea { description },
        evidence,
        Provenance::ConsolidatedSection,
    )
    .with_metadata(CONSOLIDATED_FROM_KEY, merged_ids);
    consolidated.scores = ScoreBreakdown::new(
        unit.classified.actionability.actionable_signal,
        type_confidence,
        synthesis_confidence(Provenance::ConsolidatedSection, true),
    );

    tracing::debug!(
        section_id = %section.id,
        merged = candidates.len(),
        candidate_id = %consolidated.id,
        "fragments consolidated"
    );

    Consolidation {
        candidates: vec![consolidated.clone()],
        merged: candidates,
        consolidated: Some(consolidated),
    }
}
