//! The `SuggestionPipeline` orchestrator.

use plansift_model::text::GroundingIndex;
use plansift_model::{
    split_sentences, DefaultTitleNormalizer, ExistingPlanItem, IdGenerator,
    MarkdownSectionProvider, NoteInput, PipelineConfig, PipelineError, Section, SectionId,
    SectionProvider, Sentence, Suggestion, SuggestionId, TitleNormalizer,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

use crate::classifier::{ClassifiedSection, SectionClassifier};
use crate::ledger::{DebugLedger, DebugRun, NoopObserver, PipelineObserver, FALLBACK_SKIP_KEY};
use crate::outcome::{DropReason, DropStage};
use crate::routing::{apply_cap, route, Deduper};
use crate::scoring::{is_protected, ScoreDecision, Scorer};
use crate::signals::{default_extractors, extract_all, Signal, SignalExtractor};
use crate::synthesis::fallback::FallbackOutcome;
use crate::synthesis::topic::isolate_topics;
use crate::synthesis::{SectionUnit, Synthesizer};
use crate::validation::{GateContext, GateError, ValidationOutcome, Validator};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub suggestions: Vec<Suggestion>,
    /// Present when verbosity is not `off`.
    pub debug: Option<DebugRun>,
}

/// A run that did not complete. Carries the audit record when a ledger was active.
#[derive(Debug, Error)]
#[error("pipeline run failed")]
pub struct PipelineFailure {
    #[source]
    pub error: PipelineError,
    pub debug: Option<DebugRun>,
}

pub struct SuggestionPipeline {
    config: PipelineConfig,
    provider: Box<dyn SectionProvider>,
    titles: Box<dyn TitleNormalizer>,
    extractors: Vec<Box<dyn SignalExtractor>>,
    validator: Validator,
}

impl fmt::Debug for SuggestionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuggestionPipeline")
            .field("config", &self.config)
            .field("extractors", &self.extractors.len())
            .field("validator", &self.validator)
            .finish()
    }
}

impl Default for SuggestionPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl SuggestionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            provider: Box::new(MarkdownSectionProvider),
            titles: Box::new(DefaultTitleNormalizer::default()),
            extractors: default_extractors(),
            validator: Validator::standard(),
        }
    }

    pub fn with_section_provider(mut self, provider: impl SectionProvider + 'static) -> Self {
        self.provider = Box::new(provider);
        self
    }

    pub fn with_title_normalizer(mut self, titles: impl TitleNormalizer + 'static) -> Self {
        self.titles = Box::new(titles);
        self
    }

    pub fn with_extractors(mut self, extractors: Vec<Box<dyn SignalExtractor>>) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one note. With verbosity other than `off` the output carries a
    /// finalized `DebugRun`, also on failure.
    pub fn run(
        &self,
        note: &NoteInput,
        existing: &[ExistingPlanItem],
    ) -> Result<PipelineOutput, PipelineFailure> {
        if let Err(error) = self.check_inputs(note) {
            return Err(PipelineFailure { error, debug: None });
        }

        if !self.config.effective_verbosity().is_enabled() {
            return match self.execute(note, existing, &mut NoopObserver) {
                Ok(suggestions) => Ok(PipelineOutput {
                    suggestions,
                    debug: None,
                }),
                Err(error) => Err(PipelineFailure { error, debug: None }),
            };
        }

        let mut ledger = DebugLedger::new(note, &self.config);
        match self.execute(note, existing, &mut ledger) {
            Ok(suggestions) => {
                let emitted: Vec<SuggestionId> = suggestions.iter().map(|s| s.id.clone()).collect();
                Ok(PipelineOutput {
                    suggestions,
                    debug: Some(ledger.finalize(&emitted)),
                })
            }
            Err(error) => {
                ledger.on_failure(&error);
                Err(PipelineFailure {
                    error,
                    debug: Some(ledger.finalize(&[])),
                })
            }
        }
    }

    /// Process one note, reporting to a caller-supplied observer.
    pub fn run_with_observer(
        &self,
        note: &NoteInput,
        existing: &[ExistingPlanItem],
        obs: &mut dyn PipelineObserver,
    ) -> Result<Vec<Suggestion>, PipelineError> {
        self.check_inputs(note)?;
        let result = self.execute(note, existing, obs);
        if let Err(error) = &result {
            obs.on_failure(error);
        }
        result
    }

    fn check_inputs(&self, note: &NoteInput) -> Result<(), PipelineError> {
        self.config.validate()?;
        note.validate(self.config.max_note_chars)?;
        if self.config.use_external_classifiers {
            tracing::warn!(
                "external classifiers requested but none is configured; \
                 using rule-based classification"
            );
        }
        if self.config.embeddings_enabled {
            tracing::warn!(
                "embeddings requested but none is configured; using token-overlap routing"
            );
        }
        Ok(())
    }

    fn execute(
        &self,
        note: &NoteInput,
        existing: &[ExistingPlanItem],
        obs: &mut dyn PipelineObserver,
    ) -> Result<Vec<Suggestion>, PipelineError> {
        let mut ids = IdGenerator::new();
        let classifier = SectionClassifier::new(&self.config);
        let synthesizer = Synthesizer::new(self.titles.as_ref());

        // Sectioning.
        let started = Instant::now();
        let sections = self.provider.sections(note, &mut ids)?;
        for section in &sections {
            obs.on_section(section);
        }
        let section_count = sections.len();
        obs.on_stage_timing("sectioning", started.elapsed());

        // Classification and topic isolation.
        let started = Instant::now();
        let mut units: Vec<SectionUnit> = Vec::new();
        let mut split_parents: BTreeSet<SectionId> = BTreeSet::new();
        for section in sections {
            let sentences = split_sentences(&section);
            let classified = classifier.classify(section, &sentences);
            obs.on_classified(&classified);
            if !admit(&classified, obs) {
                continue;
            }
            let Some(children) = isolate_topics(&classified.section, &mut ids) else {
                units.push(SectionUnit::new(classified, sentences));
                continue;
            };
            let topics: Vec<(ClassifiedSection, Vec<Sentence>)> = children
                .into_iter()
                .map(|child| {
                    let sentences = split_sentences(&child);
                    (classifier.classify(child, &sentences), sentences)
                })
                .collect();
            // A plan change is only split when some topic still carries it.
            if classified.is_plan_change() && !topics.iter().any(|(t, _)| t.is_plan_change()) {
                tracing::debug!(
                    section_id = %classified.section.id,
                    "plan-change section kept whole, no topic carries the change"
                );
                units.push(SectionUnit::new(classified, sentences));
                continue;
            }

            tracing::debug!(
                section_id = %classified.section.id,
                topics = topics.len(),
                "section split into topics"
            );
            let children: Vec<Section> = topics.iter().map(|(t, _)| t.section.clone()).collect();
            obs.on_split(&classified.section.id, &children);
            split_parents.insert(classified.section.id.clone());
            for (topic, sentences) in topics {
                obs.on_section(&topic.section);
                obs.on_classified(&topic);
                if admit(&topic, obs) {
                    units.push(SectionUnit::new(topic, sentences));
                }
            }
        }
        obs.on_stage_timing("classification", started.elapsed());

        // Signals.
        let started = Instant::now();
        let signals: Vec<Vec<Signal>> = units
            .iter()
            .map(|unit| {
                let found = extract_all(&self.extractors, &unit.sentences);
                obs.on_signals(unit.id(), &found);
                found
            })
            .collect();
        obs.on_stage_timing("signals", started.elapsed());

        // Synthesis.
        let started = Instant::now();
        let mut candidates: Vec<Suggestion> = Vec::new();
        let mut skipped: BTreeSet<usize> = BTreeSet::new();
        for (i, unit) in units.iter().enumerate() {
            let outcome = synthesizer.synthesize(&note.note_id, unit, &signals[i], &mut ids, obs);
            if outcome.fallback_skip.is_some() {
                skipped.insert(i);
            }
            candidates.extend(outcome.candidates);
        }
        obs.on_stage_timing("synthesis", started.elapsed());

        let stages = Stages::new(self, note, &units);

        // Validation.
        let started = Instant::now();
        let validated: Vec<(usize, Suggestion, Vec<String>)> = candidates
            .into_iter()
            .filter_map(|candidate| stages.validate(candidate, obs))
            .collect();
        obs.on_stage_timing("validation", started.elapsed());

        // Scoring.
        let started = Instant::now();
        let mut scored: Vec<(usize, Suggestion)> = validated
            .into_iter()
            .filter_map(|(i, candidate, soft)| {
                stages
                    .score(i, candidate, soft, obs)
                    .map(|candidate| (i, candidate))
            })
            .collect();
        obs.on_stage_timing("scoring", started.elapsed());

        // Post-check: split-parent exclusivity, plan-change non-silence, routing.
        let started = Instant::now();
        scored.retain(|(_, candidate)| {
            if !split_parents.contains(&candidate.section_id) {
                return true;
            }
            tracing::warn!(
                candidate_id = %candidate.id,
                section_id = %candidate.section_id,
                "candidate sourced from a split section"
            );
            obs.on_candidate_dropped(
                &candidate.id,
                DropStage::PostCheck,
                DropReason::SplitIntoSubsections,
                "split parents never emit",
            );
            false
        });

        for (i, unit) in units.iter().enumerate() {
            if !unit.classified.is_plan_change()
                || skipped.contains(&i)
                || scored.iter().any(|(j, _)| *j == i)
            {
                continue;
            }
            match synthesizer.plan_change_placeholder(&note.note_id, unit, &mut ids) {
                FallbackOutcome::Candidate(candidate) => {
                    tracing::debug!(
                        section_id = %unit.id(),
                        candidate_id = %candidate.id,
                        "plan-change section lost every candidate; adding placeholder"
                    );
                    obs.on_candidate_created(&candidate);
                    let rescued = stages
                        .validate(candidate, obs)
                        .and_then(|(j, candidate, soft)| stages.score(j, candidate, soft, obs));
                    if let Some(candidate) = rescued {
                        scored.push((i, candidate));
                    }
                }
                FallbackOutcome::Skip(reason) => {
                    obs.on_section_metadata(unit.id(), FALLBACK_SKIP_KEY, reason);
                }
                FallbackOutcome::Nothing => {}
            }
        }
        scored.sort_by_key(|(i, _)| *i);

        for (_, candidate) in scored.iter_mut() {
            candidate.routing = route(candidate, existing, self.config.route_similarity_threshold);
            obs.on_routed(candidate);
        }
        obs.on_stage_timing("post_check", started.elapsed());

        // Dedup and cap.
        let started = Instant::now();
        let mut deduper = Deduper::new();
        let mut unique: Vec<(usize, Suggestion)> = Vec::with_capacity(scored.len());
        for (i, candidate) in scored {
            if !deduper.admit(&candidate) {
                obs.on_candidate_dropped(
                    &candidate.id,
                    DropStage::Dedup,
                    DropReason::DuplicateFingerprint,
                    &candidate.fingerprint,
                );
                continue;
            }
            unique.push((i, candidate));
        }
        let (kept, excess) = apply_cap(protect(unique, &units), self.config.max_suggestions);
        for candidate in &excess {
            obs.on_candidate_dropped(
                &candidate.id,
                DropStage::Cap,
                DropReason::MaxSuggestionsExceeded,
                &format!("max_suggestions = {}", self.config.max_suggestions),
            );
        }
        obs.on_stage_timing("dedup_cap", started.elapsed());

        tracing::info!(
            note_id = %note.note_id,
            sections = section_count,
            units = units.len(),
            suggestions = kept.len(),
            "note processed"
        );
        Ok(kept)
    }
}

/// Relevance and actionability gates for one classified section.
fn admit(classified: &ClassifiedSection, obs: &mut dyn PipelineObserver) -> bool {
    let id = &classified.section.id;
    if !classified.relevant {
        let detail = match classified.top_label {
            Some(label) => format!("{label} {:.2} below t_section_min", classified.top_score),
            None => "no intent cue".to_string(),
        };
        tracing::debug!(section_id = %id, %detail, "section not relevant");
        obs.on_section_dropped(id, DropStage::Classification, DropReason::LowRelevance, &detail);
        return false;
    }
    if !classified.actionability.actionable {
        tracing::debug!(
            section_id = %id,
            reason = %classified.actionability.reason,
            "section not actionable"
        );
        obs.on_section_dropped(
            id,
            DropStage::Classification,
            DropReason::NotActionable,
            &classified.actionability.reason,
        );
        return false;
    }
    true
}

/// Mark the candidates the cap may not drop: plan-change updates, plus the
/// first candidate of any plan-change section that has no such update.
fn protect(candidates: Vec<(usize, Suggestion)>, units: &[SectionUnit]) -> Vec<(Suggestion, bool)> {
    let covered: BTreeSet<usize> = candidates
        .iter()
        .filter(|(i, c)| is_protected(c, &units[*i].classified))
        .map(|(i, _)| *i)
        .collect();
    let mut anchored: BTreeSet<usize> = BTreeSet::new();
    candidates
        .into_iter()
        .map(|(i, candidate)| {
            let protected = is_protected(&candidate, &units[i].classified)
                || (units[i].classified.is_plan_change()
                    && !covered.contains(&i)
                    && anchored.insert(i));
            (candidate, protected)
        })
        .collect()
}

/// Per-run state shared by validation and scoring.
struct Stages<'r> {
    validator: &'r Validator,
    scorer: Scorer,
    min_evidence_chars: usize,
    units: &'r [SectionUnit],
    unit_of: BTreeMap<SectionId, usize>,
    section_indexes: Vec<GroundingIndex>,
    note_index: GroundingIndex,
}

impl<'r> Stages<'r> {
    fn new(pipeline: &'r SuggestionPipeline, note: &NoteInput, units: &'r [SectionUnit]) -> Self {
        Self {
            validator: &pipeline.validator,
            scorer: Scorer::new(&pipeline.config),
            min_evidence_chars: pipeline.config.min_evidence_chars,
            units,
            unit_of: units
                .iter()
                .enumerate()
                .map(|(i, u)| (u.id().clone(), i))
                .collect(),
            section_indexes: units
                .iter()
                .map(|u| GroundingIndex::new(&u.section().raw_text))
                .collect(),
            note_index: GroundingIndex::new(&note.raw_text),
        }
    }

    fn validate(
        &self,
        candidate: Suggestion,
        obs: &mut dyn PipelineObserver,
    ) -> Option<(usize, Suggestion, Vec<String>)> {
        let Some(&i) = self.unit_of.get(&candidate.section_id) else {
            let error = GateError::MissingSection(candidate.section_id.clone());
            tracing::warn!(candidate_id = %candidate.id, %error, "validation error");
            obs.on_candidate_dropped(
                &candidate.id,
                DropStage::Validation,
                DropReason::InternalError,
                &error.to_string(),
            );
            return None;
        };
        let unit = &self.units[i];
        let ctx = GateContext {
            section: unit.section(),
            section_index: &self.section_indexes[i],
            note_index: &self.note_index,
            min_evidence_chars: self.min_evidence_chars,
            lenient: is_protected(&candidate, &unit.classified),
        };
        let outcome = self.validator.validate(&candidate, &ctx);
        obs.on_validation(&candidate.id, outcome.results());
        match outcome {
            ValidationOutcome::Passed { soft, .. } => Some((i, candidate, soft)),
            ValidationOutcome::Rejected { drop, detail, .. } => {
                tracing::debug!(candidate_id = %candidate.id, %drop, %detail, "candidate rejected");
                obs.on_candidate_dropped(&candidate.id, DropStage::Validation, drop, &detail);
                None
            }
            ValidationOutcome::Errored { error, .. } => {
                tracing::warn!(candidate_id = %candidate.id, %error, "validation error");
                obs.on_candidate_dropped(
                    &candidate.id,
                    DropStage::Validation,
                    DropReason::InternalError,
                    &error.to_string(),
                );
                None
            }
        }
    }

    fn score(
        &self,
        i: usize,
        mut candidate: Suggestion,
        soft: Vec<String>,
        obs: &mut dyn PipelineObserver,
    ) -> Option<Suggestion> {
        match self.scorer.score(&mut candidate, &self.units[i].classified) {
            ScoreDecision::Drop => {
                obs.on_scored(&candidate);
                obs.on_candidate_dropped(
                    &candidate.id,
                    DropStage::Scoring,
                    DropReason::ScoreBelowThreshold,
                    &format!(
                        "overall {:.3} < {:.2}",
                        candidate.scores.overall(),
                        self.scorer.threshold()
                    ),
                );
                return None;
            }
            ScoreDecision::Flag(reason) => candidate.flag_needs_clarification(reason),
            ScoreDecision::Keep => {}
        }
        for reason in soft {
            candidate.flag_needs_clarification(reason);
        }
        obs.on_scored(&candidate);
        Some(candidate)
    }
}
