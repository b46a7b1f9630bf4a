//! Candidate synthesis.
//!
//! Per actionable section, in order:
//!
//! 1. one candidate per distinct (sentence, proposed type) signal pair, keeping
//!    the most confident signal;
//! 2. the named filter chain (`filters`);
//! 3. fragment consolidation (`consolidate`);
//! 4. fallbacks, only when nothing survived (`fallback`).
//!
//! Topic isolation (`topic`) runs earlier, before classification of the
//! sub-sections, and is driven by the pipeline.

pub mod consolidate;
pub mod fallback;
pub mod filters;
pub mod titles;
pub mod topic;

use plansift_model::{
    EvidenceSpan, IdGenerator, Provenance, ScoreBreakdown, Section, SectionId, Sentence,
    Suggestion, SuggestionType, TitleNormalizer,
};
use std::collections::BTreeMap;

use crate::classifier::ClassifiedSection;
use crate::ledger::{PipelineObserver, FALLBACK_SKIP_KEY};
use crate::outcome::{DropReason, DropStage};
use crate::signals::Signal;

use fallback::FallbackOutcome;
use filters::{FilterChain, FilterContext};
use titles::{build_payload, sentence_title, DerivedTitle};

/// A classified section with its sentences, the unit synthesis works on.
#[derive(Debug, Clone)]
pub struct SectionUnit {
    pub classified: ClassifiedSection,
    pub sentences: Vec<Sentence>,
    /// Topic anchors with a concrete label.
    pub usable_anchors: usize,
}

impl SectionUnit {
    pub fn new(classified: ClassifiedSection, sentences: Vec<Sentence>) -> Self {
        let usable_anchors = topic::usable_anchor_count(&classified.section);
        Self {
            classified,
            sentences,
            usable_anchors,
        }
    }

    pub fn section(&self) -> &Section {
        &self.classified.section
    }

    pub fn id(&self) -> &SectionId {
        &self.classified.section.id
    }
}

/// How much the synthesizer trusts a candidate it built, before title quality.
pub fn base_confidence(provenance: Provenance) -> f64 {
    match provenance {
        Provenance::Signal => 0.8,
        Provenance::ConsolidatedSection => 0.7,
        Provenance::ExplicitAsk => 0.65,
        Provenance::DenseParagraph => 0.55,
        Provenance::PlanChangeFallback => 0.3,
    }
}

/// Synthesis confidence: the provenance base, nudged up for a title cut from
/// the text and down for a templated one.
pub fn synthesis_confidence(provenance: Provenance, extracted_title: bool) -> f64 {
    let nudge = if extracted_title { 0.05 } else { -0.05 };
    (base_confidence(provenance) + nudge).clamp(0.0, 1.0)
}

/// Inputs for building one sentence-grounded candidate.
#[derive(Debug, Clone)]
pub struct Seed<'s> {
    pub kind: SuggestionType,
    pub sentence: &'s Sentence,
    pub title: DerivedTitle,
    pub provenance: Provenance,
    pub type_confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOutcome {
    pub candidates: Vec<Suggestion>,
    /// Set when the fallback ladder skipped the section on purpose.
    pub fallback_skip: Option<&'static str>,
}

pub struct Synthesizer<'a> {
    titles: &'a dyn TitleNormalizer,
    filters: FilterChain,
}

impl std::fmt::Debug for Synthesizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("filters", &self.filters.names())
            .finish()
    }
}

/// Keep the most confident signal per (sentence, proposed type). Ties keep the
/// first signal in extractor order.
fn strongest_signals(signals: &[Signal]) -> Vec<&Signal> {
    let mut best: BTreeMap<(usize, SuggestionType), &Signal> = BTreeMap::new();
    for signal in signals {
        let key = (signal.sentence_index, signal.proposed_type);
        match best.get(&key) {
            Some(kept) if kept.confidence >= signal.confidence => {}
            _ => {
                best.insert(key, signal);
            }
        }
    }
    best.into_values().collect()
}

impl<'a> Synthesizer<'a> {
    pub fn new(titles: &'a dyn TitleNormalizer) -> Self {
        Self {
            titles,
            filters: FilterChain::standard(),
        }
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    pub fn titles(&self) -> &dyn TitleNormalizer {
        self.titles
    }

    /// Build a candidate grounded in one sentence.
    pub fn seed(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        seed: Seed<'_>,
        ids: &mut IdGenerator,
    ) -> Suggestion {
        let evidence = vec![EvidenceSpan::from_sentence(seed.sentence)];
        let title = self.titles.normalize(&seed.title.text, &evidence);
        let payload = build_payload(seed.kind, &seed.sentence.text);
        let mut candidate = Suggestion::candidate(
            ids.next_suggestion_id(),
            note_id,
            unit.id().clone(),
            title,
            payload,
            evidence,
            seed.provenance,
        )
        .with_metadata("sentence_index", seed.sentence.index.to_string());
        candidate.scores = ScoreBreakdown::new(
            unit.classified.actionability.actionable_signal,
            seed.type_confidence,
            synthesis_confidence(seed.provenance, seed.title.extracted),
        );
        candidate
    }

    /// Synthesize the candidates of one section.
    pub fn synthesize(
        &self,
        note_id: &str,
        unit: &SectionUnit,
        signals: &[Signal],
        ids: &mut IdGenerator,
        obs: &mut dyn PipelineObserver,
    ) -> SynthesisOutcome {
        let ctx = FilterContext::new(unit);
        let heading = &unit.section().heading;
        let mut candidates = Vec::new();

        for signal in strongest_signals(signals) {
            let Some(sentence) = unit
                .sentences
                .iter()
                .find(|s| s.index == signal.sentence_index)
            else {
                tracing::warn!(
                    section_id = %unit.id(),
                    sentence_index = signal.sentence_index,
                    "signal points at an unknown sentence"
                );
                continue;
            };
            let kind = signal.proposed_type;
            let candidate = self
                .seed(
                    note_id,
                    unit,
                    Seed {
                        kind,
                        sentence,
                        title: sentence_title(kind, &sentence.text, heading),
                        provenance: Provenance::Signal,
                        type_confidence: signal.confidence.max(unit.classified.type_score(kind)),
                    },
                    ids,
                )
                .with_metadata("signal_type", signal.signal_type.as_str())
                .with_metadata("rule", signal.rule);
            obs.on_candidate_created(&candidate);

            if let Some(filter) = self.filters.first_rejection(&candidate, &ctx) {
                tracing::debug!(
                    section_id = %unit.id(),
                    candidate_id = %candidate.id,
                    filter = filter.name,
                    "candidate filtered"
                );
                obs.on_candidate_dropped(
                    &candidate.id,
                    DropStage::Synthesis,
                    filter.reason,
                    filter.name,
                );
                continue;
            }
            candidates.push(candidate);
        }

        let consolidation = consolidate::consolidate(candidates, unit, signals, self.titles, ids);
        if let Some(consolidated) = &consolidation.consolidated {
            obs.on_candidate_created(consolidated);
            for merged in &consolidation.merged {
                obs.on_candidate_dropped(
                    &merged.id,
                    DropStage::Synthesis,
                    DropReason::ConsolidatedIntoSection,
                    consolidated.id.as_str(),
                );
            }
        }
        let mut candidates = consolidation.candidates;

        let mut fallback_skip = None;
        if candidates.is_empty() {
            match self.fallback(note_id, unit, &ctx, ids, obs) {
                FallbackOutcome::Candidate(candidate) => {
                    tracing::debug!(
                        section_id = %unit.id(),
                        candidate_id = %candidate.id,
                        provenance = %candidate.provenance,
                        "fallback candidate"
                    );
                    candidates.push(candidate);
                }
                FallbackOutcome::Skip(reason) => {
                    tracing::debug!(section_id = %unit.id(), reason, "fallback skipped");
                    obs.on_section_metadata(unit.id(), FALLBACK_SKIP_KEY, reason);
                    fallback_skip = Some(reason);
                }
                FallbackOutcome::Nothing => {}
            }
        }

        SynthesisOutcome {
            candidates,
            fallback_skip,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::classifier::SectionClassifier;
    use plansift_model::{
        split_sentences, DefaultTitleNormalizer, MarkdownSectionProvider, NoteInput,
        PipelineConfig, SectionProvider,
    };

    /// First section of `text`, classified with the default config.
    pub fn unit(text: &str) -> SectionUnit {
        let section = MarkdownSectionProvider
            .sections(&NoteInput::new("n1", text), &mut IdGenerator::new())
            .unwrap()
            .remove(0);
        let sentences = split_sentences(&section);
        let classified =
            SectionClassifier::new(&PipelineConfig::default()).classify(section, &sentences);
        SectionUnit::new(classified, sentences)
    }

    /// A signal-provenance candidate of `kind` grounded in sentence `index`.
    pub fn signal_candidate(unit: &SectionUnit, kind: SuggestionType, index: usize) -> Suggestion {
        let normalizer = DefaultTitleNormalizer::default();
        let synth = Synthesizer::new(&normalizer);
        let sentence = &unit.sentences[index];
        let mut ids = IdGenerator::new();
        for _ in 0..index {
            ids.next_suggestion_id();
        }
        synth.seed(
            "n1",
            unit,
            Seed {
                kind,
                sentence,
                title: sentence_title(kind, &sentence.text, &unit.section().heading),
                provenance: Provenance::Signal,
                type_confidence: 0.7,
            },
            &mut ids,
        )
    }
}
