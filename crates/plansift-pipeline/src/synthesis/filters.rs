//! The named candidate filter chain.
//!
//! Each filter is a pure predicate over a signal-seeded candidate and its
//! section. Filters run in chain order and the first rejection wins, so the
//! order below is part of the behavior:
//!
//! 1. `next_steps_guard`
//! 2. `process_noise`
//! 3. `spec_section`
//! 4. `strategy_heading_guard`
//! 5. `discussion_details_guard`

use plansift_model::{Suggestion, SuggestionType};

use super::SectionUnit;
use crate::lexicon::{
    delivery_assignment, desire, discussion_heading, execution_verb, external_actor,
    has_time_token, next_steps_heading, process_owner, spec_vocab, status_cue, strategy_heading,
};
use crate::outcome::DropReason;

/// Sentences at which a section reads as a long discussion.
const LONG_SECTION_SENTENCES: usize = 8;
/// Body length at which a section reads as a long discussion.
const LONG_SECTION_CHARS: usize = 900;
/// A discussion-headed prose section this long is treated as discussion.
const DISCUSSION_PROSE_SENTENCES: usize = 4;

/// Section facts computed once per section and shared by every filter.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub unit: &'a SectionUnit,
    pub spec_section: bool,
    pub long_discussion: bool,
}

impl<'a> FilterContext<'a> {
    pub fn new(unit: &'a SectionUnit) -> Self {
        Self {
            unit,
            spec_section: is_spec_section(unit),
            long_discussion: is_long_discussion(unit),
        }
    }

    fn heading_matches(&self, re: &regex::Regex) -> bool {
        let section = self.unit.section();
        re.is_match(&section.heading)
            || section
                .context_heading
                .as_deref()
                .is_some_and(|h| re.is_match(h))
    }
}

/// A section whose heading and body read as a scoring / eligibility / weighting
/// specification, with no timeline or status language.
pub fn is_spec_section(unit: &SectionUnit) -> bool {
    let section = unit.section();
    let body_hits = spec_vocab().find_iter(&section.body).count();
    let heading_hit = spec_vocab().is_match(&section.heading);
    let reads_as_spec = (heading_hit && body_hits >= 1) || body_hits >= 3;
    reads_as_spec && !has_time_token(&section.body) && !status_cue().is_match(&section.body)
}

/// A long, discussion-style section.
pub fn is_long_discussion(unit: &SectionUnit) -> bool {
    let section = unit.section();
    let sentences = unit.sentences.len();
    if sentences >= LONG_SECTION_SENTENCES || section.features.char_count >= LONG_SECTION_CHARS {
        return true;
    }
    discussion_heading().is_match(&section.heading)
        && section.features.bullet_count == 0
        && sentences >= DISCUSSION_PROSE_SENTENCES
}

fn evidence_text(candidate: &Suggestion) -> &str {
    candidate
        .evidence
        .first()
        .map(|span| span.text.as_str())
        .unwrap_or_default()
}

type Predicate = fn(&Suggestion, &FilterContext<'_>) -> bool;

pub struct CandidateFilter {
    pub name: &'static str,
    pub reason: DropReason,
    predicate: Predicate,
}

impl CandidateFilter {
    pub fn new(name: &'static str, reason: DropReason, predicate: Predicate) -> Self {
        Self {
            name,
            reason,
            predicate,
        }
    }

    pub fn rejects(&self, candidate: &Suggestion, ctx: &FilterContext<'_>) -> bool {
        (self.predicate)(candidate, ctx)
    }
}

impl std::fmt::Debug for CandidateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateFilter")
            .field("name", &self.name)
            .field("reason", &self.reason)
            .finish()
    }
}

/// Action lists are follow-ups, not new work. Dated plan changes listed there
/// still count.
fn next_steps_guard(candidate: &Suggestion, ctx: &FilterContext<'_>) -> bool {
    candidate.suggestion_type() != SuggestionType::ProjectUpdate
        && ctx.heading_matches(next_steps_heading())
}

/// "Unclear who owns sign-off" is about process, not product work, unless an
/// explicit delivery assignment is present.
fn process_noise(candidate: &Suggestion, _ctx: &FilterContext<'_>) -> bool {
    let text = evidence_text(candidate);
    process_owner().is_match(text) && !delivery_assignment().is_match(text)
}

/// A scoring/eligibility spec is not a plan change.
fn spec_section(candidate: &Suggestion, ctx: &FilterContext<'_>) -> bool {
    ctx.spec_section && candidate.suggestion_type() == SuggestionType::ProjectUpdate
}

/// Under a strategy heading, ideas and updates need concrete execution or a date.
fn strategy_heading_guard(candidate: &Suggestion, ctx: &FilterContext<'_>) -> bool {
    if !matches!(
        candidate.suggestion_type(),
        SuggestionType::Idea | SuggestionType::ProjectUpdate
    ) {
        return false;
    }
    if !ctx.heading_matches(strategy_heading()) {
        return false;
    }
    let text = evidence_text(candidate);
    !execution_verb().is_match(text) && !has_time_token(text)
}

/// In long discussion sections, unamplified feature chatter is background.
fn discussion_details_guard(candidate: &Suggestion, ctx: &FilterContext<'_>) -> bool {
    if !ctx.long_discussion || candidate.suggestion_type() != SuggestionType::Idea {
        return false;
    }
    if !ctx.heading_matches(discussion_heading()) {
        return false;
    }
    let amplified = candidate
        .metadata
        .get("rule")
        .is_some_and(|rule| rule == "actor_desire_amplified");
    let text = evidence_text(candidate);
    let demand = external_actor().is_match(text) && desire().is_match(text);
    !amplified && !(demand && execution_verb().is_match(text))
}

#[derive(Debug)]
pub struct FilterChain {
    filters: Vec<CandidateFilter>,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl FilterChain {
    pub fn standard() -> Self {
        Self {
            filters: vec![
                CandidateFilter::new(
                    "next_steps_guard",
                    DropReason::NextStepsSection,
                    next_steps_guard,
                ),
                CandidateFilter::new("process_noise", DropReason::ProcessNoise, process_noise),
                CandidateFilter::new("spec_section", DropReason::SpecSection, spec_section),
                CandidateFilter::new(
                    "strategy_heading_guard",
                    DropReason::StrategyHeading,
                    strategy_heading_guard,
                ),
                CandidateFilter::new(
                    "discussion_details_guard",
                    DropReason::DiscussionDetails,
                    discussion_details_guard,
                ),
            ],
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name).collect()
    }

    /// The first filter that rejects `candidate`, if any.
    pub fn first_rejection(
        &self,
        candidate: &Suggestion,
        ctx: &FilterContext<'_>,
    ) -> Option<&CandidateFilter> {
        self.filters.iter().find(|f| f.rejects(candidate, ctx))
    }
}
