//! Fallbacks for sections that produced no candidate.
//!
//! Tried in order, first hit wins:
//!
//! 1. explicit ask: a request clause ("asks for X", "would like X") in a section
//!    without usable topic anchors becomes one `idea`;
//! 2. long discussion: skip, recording why;
//! 3. spec-like plan-change section: skip, recording why;
//! 4. dense paragraph: a short bullet-free section yields one candidate of its
//!    suggested type from the sentence with the strongest cue;
//! 5. plan-change placeholder: a `project_update` flagged `needs_clarification`,
//!    so a plan-change section never goes silent.
//!
//! Explicit-ask and dense-paragraph candidates still go through the filter
//! chain. The placeholder does not.

use plansift_model::text::has_concrete_content;
use plansift_model::{IdGenerator, Provenance, Sentence, Suggestion, SuggestionType};

use super::filters::FilterContext;
use super::titles::{request_object, sentence_title, template_title, DerivedTitle};
use super::{SectionUnit, Seed, Synthesizer};
use crate::ledger::PipelineObserver;
use crate::lexicon::{
    descope, execution_verb, has_time_token, obligation, shift_verb, timeline_word,
};
use crate::outcome::DropStage;

pub const DENSE_MAX_SENTENCES: usize = 5;

pub const PLACEHOLDER_FLAG: &str = "plan_change_placeholder";

pub const SKIP_LONG_DISCUSSION: &str = "long_discussion_section";
pub const SKIP_SPEC_SECTION: &str = "spec_section";
pub const SKIP_EMPTY_BODY: &str = "empty_section_body";

#[derive(Debug, Clone, PartialEq)]
pub enum FallbackOutcome {
    Candidate(Suggestion),
    /// Nothing is emitted on purpose; the reason is recorded on the section.
    Skip(&'static str),
    Nothing,
}

fn first_best<'s>(sentences: &'s [Sentence], weight: impl Fn(&str) -> u8) -> Option<&'s Sentence> {
    let mut best: Option<(&Sentence, u8)> = None;
    for sentence in sentences {
        let w = weight(&sentence.text);
        if w == 0 {
            continue;
        }
        match best {
            Some((_, b)) if b >= w => {}
            _ => best = Some((sentence, w)),
        }
    }
    best.map(|(s, _)| s)
}

fn idea_weight(text: &str) -> u8 {
    if execution_verb().is_match(text) {
        2
    } else if obligation().is_match(text) {
        1
    } else {
        0
    }
}

fn plan_weight(text: &str) -> u8 {
    if shift_verb().is_match(text) || descope().is_match(text) {
        2
    } else if timeline_word().is_match(text) || has_time_token(text) {
        1
    } else {
        0
    }
}

/// Sentence a plan-change placeholder is grounded in: the strongest schedule
/// cue, else the longest sentence.
fn placeholder_sentence(sentences: &[Sentence]) -> Option<&Sentence> {
    first_best(sentences, plan_weight).or_else(|| {
        sentences.iter().fold(None, |best: Option<&Sentence>, s| match best {
            Some(b) if b.text.len() >= s.text.len() => Some(b),
            _ => Some(s),
        })
    })
}

impl Synthesizer<'_> {
    /// Report a fallback candidate and run it through the filter chain.
    fn offer(
        &self,
        candidate: Suggestion,
        ctx: &FilterContext<'_>,
        obs: &mut dyn PipelineObserver,
    ) -> Option<Suggestion> {
        obs.on_candidate_created(&candidate);
        if let Some(filter) = self.filters.first_rejection(&candidate, ctx) {
            tracing::debug!(
                candidate_id = %candidate.id,
                filter = filter.name,
                "fallback candidate filtered"
            );
            obs.on_candidate_dropped(
                &candidate.id,
                DropStage::Synthesis,
                filter.reason,
                filter.name,
            );
            return None;
        }
        Some(candidate)
    }

    fn explicit_ask(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        ids: &mut IdGenerator,
    ) -> Option<Suggestion> {
        if unit.usable_anchors > 0 {
            return None;
        }
        let (sentence, object) = unit
            .sentences
            .iter()
            .find_map(|s| request_object(&s.text).map(|object| (s, object)))?;
        Some(self.seed(
            note_id,
            unit,
            Seed {
                kind: SuggestionType::Idea,
                sentence,
                title: DerivedTitle {
                    text: object,
                    extracted: true,
                },
                provenance: Provenance::ExplicitAsk,
                type_confidence: unit.classified.type_score(SuggestionType::Idea),
            },
            ids,
        ))
    }

    fn dense_paragraph(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        ctx: &FilterContext<'_>,
        ids: &mut IdGenerator,
    ) -> Option<Suggestion> {
        let features = &unit.section().features;
        if unit.sentences.is_empty()
            || unit.sentences.len() > DENSE_MAX_SENTENCES
            || features.bullet_count > 0
            || features.numbered_count > 0
        {
            return None;
        }
        let kind = unit.classified.suggested_type?;
        let sentence = match kind {
            SuggestionType::Idea => first_best(&unit.sentences, idea_weight)?,
            SuggestionType::ProjectUpdate if !ctx.spec_section => {
                first_best(&unit.sentences, plan_weight)?
            }
            _ => return None,
        };
        Some(self.seed(
            note_id,
            unit,
            Seed {
                kind,
                sentence,
                title: sentence_title(kind, &sentence.text, &unit.section().heading),
                provenance: Provenance::DenseParagraph,
                type_confidence: unit.classified.type_confidence,
            },
            ids,
        ))
    }

    /// The `project_update` placeholder for a plan-change section.
    pub fn plan_change_placeholder(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        ids: &mut IdGenerator,
    ) -> FallbackOutcome {
        if !unit.section().has_body() {
            return FallbackOutcome::Skip(SKIP_EMPTY_BODY);
        }
        let Some(sentence) = placeholder_sentence(&unit.sentences) else {
            return FallbackOutcome::Skip(SKIP_EMPTY_BODY);
        };
        let heading = &unit.section().heading;
        let title = if has_concrete_content(heading) {
            DerivedTitle {
                text: template_title(SuggestionType::ProjectUpdate, heading),
                extracted: false,
            }
        } else {
            sentence_title(SuggestionType::ProjectUpdate, &sentence.text, heading)
        };
        let mut candidate = self.seed(
            note_id,
            unit,
            Seed {
                kind: SuggestionType::ProjectUpdate,
                sentence,
                title,
                provenance: Provenance::PlanChangeFallback,
                type_confidence: unit.classified.type_score(SuggestionType::ProjectUpdate),
            },
            ids,
        );
        candidate.flag_needs_clarification(PLACEHOLDER_FLAG);
        FallbackOutcome::Candidate(candidate)
    }

    /// Run the fallback ladder for a section with no candidates.
    pub(crate) fn fallback(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        ctx: &FilterContext<'_>,
        ids: &mut IdGenerator,
        obs: &mut dyn PipelineObserver,
    ) -> FallbackOutcome {
        let plan_change = unit.classified.is_plan_change();

        if let Some(candidate) = self.explicit_ask(note_id, unit, ids) {
            if let Some(kept) = self.offer(candidate, ctx, obs) {
                return FallbackOutcome::Candidate(kept);
            }
        }
        if ctx.long_discussion {
            return FallbackOutcome::Skip(SKIP_LONG_DISCUSSION);
        }
        if ctx.spec_section && plan_change {
            return FallbackOutcome::Skip(SKIP_SPEC_SECTION);
        }
        if let Some(candidate) = self.dense_paragraph(note_id, unit, ctx, ids) {
            if let Some(kept) = self.offer(candidate, ctx, obs) {
                return FallbackOutcome::Candidate(kept);
            }
        }
        if plan_change {
            let outcome = self.plan_change_placeholder(note_id, unit, ids);
            if let FallbackOutcome::Candidate(candidate) = &outcome {
                obs.on_candidate_created(candidate);
            }
            return outcome;
        }
        FallbackOutcome::Nothing
    }
}
