//! The debug ledger.
//!
//! Every stage reports its decisions through `PipelineObserver`. With verbosity
//! `off` the pipeline passes a `NoopObserver`; otherwise a `DebugLedger` folds the
//! events into one `SectionDebug` per section and one `CandidateDebug` per
//! candidate. The ledger only records: nothing in the pipeline reads it back.
//!
//! Candidate state is monotonic, `pending -> emitted` or `pending -> dropped`.
//! The first drop wins; later drops of the same candidate are ignored. Only
//! `finalize` marks candidates emitted, from the ids actually returned.

mod finalize;
mod records;
mod redact;

pub use records::{
    CandidateDebug, CandidateFate, DebugRun, DropRecord, EvidenceDebug, InvariantViolation,
    NoteSummary, RunMeta, SectionDebug, SignalDebug, StageTiming, FALLBACK_SKIP_KEY,
    SUBSECTION_IDS_KEY,
};
pub use redact::{redact, Redactor, PREVIEW_CHARS};

use plansift_model::{
    content_hash, NoteInput, PipelineConfig, PipelineError, Section, SectionId, Suggestion,
    SuggestionId,
};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::classifier::ClassifiedSection;
use crate::outcome::{DropReason, DropStage};
use crate::signals::Signal;
use crate::validation::ValidatorResult;
use crate::GENERATOR_VERSION;

/// Hooks called by every pipeline stage. All default to no-ops.
pub trait PipelineObserver {
    fn on_section(&mut self, _section: &Section) {}

    fn on_classified(&mut self, _classified: &ClassifiedSection) {}

    /// `parent` was split into `children`; the children are reported separately
    /// through `on_section`.
    fn on_split(&mut self, _parent: &SectionId, _children: &[Section]) {}

    fn on_section_dropped(
        &mut self,
        _id: &SectionId,
        _stage: DropStage,
        _reason: DropReason,
        _detail: &str,
    ) {
    }

    fn on_section_metadata(&mut self, _id: &SectionId, _key: &str, _value: &str) {}

    fn on_signals(&mut self, _id: &SectionId, _signals: &[Signal]) {}

    fn on_candidate_created(&mut self, _candidate: &Suggestion) {}

    fn on_candidate_dropped(
        &mut self,
        _id: &SuggestionId,
        _stage: DropStage,
        _reason: DropReason,
        _detail: &str,
    ) {
    }

    fn on_validation(&mut self, _id: &SuggestionId, _results: &[ValidatorResult]) {}

    /// Scores, status or clarification reasons changed.
    fn on_scored(&mut self, _candidate: &Suggestion) {}

    fn on_routed(&mut self, _candidate: &Suggestion) {}

    fn on_stage_timing(&mut self, _stage: &'static str, _elapsed: Duration) {}

    fn on_failure(&mut self, _error: &PipelineError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CandidateSlot {
    section: usize,
    index: usize,
}

/// Records every pipeline decision into a `DebugRun`.
#[derive(Debug)]
pub struct DebugLedger {
    redactor: Redactor,
    meta: RunMeta,
    config: PipelineConfig,
    note_summary: NoteSummary,
    sections: Vec<SectionDebug>,
    section_index: BTreeMap<SectionId, usize>,
    candidate_index: BTreeMap<SuggestionId, CandidateSlot>,
    timings: Vec<StageTiming>,
    violations: Vec<InvariantViolation>,
    failure: Option<String>,
}

impl DebugLedger {
    pub fn new(note: &NoteInput, config: &PipelineConfig) -> Self {
        let verbosity = config.effective_verbosity();
        let redactor = Redactor::new(verbosity);
        Self {
            redactor,
            meta: RunMeta {
                note_id: note.note_id.clone(),
                run_id: uuid::Uuid::new_v4().to_string(),
                generator_version: GENERATOR_VERSION.to_string(),
                content_hash: content_hash(&note.raw_text),
                created_at: chrono::Utc::now().to_rfc3339(),
                verbosity,
            },
            config: config.clone(),
            note_summary: NoteSummary {
                char_count: note.raw_text.chars().count(),
                line_count: note.line_count(),
                section_count: 0,
                preview: redactor.store(&note.raw_text),
            },
            sections: Vec::new(),
            section_index: BTreeMap::new(),
            candidate_index: BTreeMap::new(),
            timings: Vec::new(),
            violations: Vec::new(),
            failure: None,
        }
    }

    fn section_mut(&mut self, id: &SectionId) -> Option<&mut SectionDebug> {
        let idx = *self.section_index.get(id)?;
        self.sections.get_mut(idx)
    }

    fn candidate_mut(&mut self, id: &SuggestionId) -> Option<&mut CandidateDebug> {
        let slot = *self.candidate_index.get(id)?;
        self.sections
            .get_mut(slot.section)?
            .candidates
            .get_mut(slot.index)
    }

    fn violation(
        &mut self,
        invariant: &str,
        section_id: Option<SectionId>,
        candidate_id: Option<SuggestionId>,
        detail: String,
    ) {
        tracing::warn!(
            invariant,
            section_id = section_id.as_ref().map(SectionId::as_str).unwrap_or("-"),
            candidate_id = candidate_id.as_ref().map(SuggestionId::as_str).unwrap_or("-"),
            %detail,
            "ledger invariant violated"
        );
        self.violations.push(InvariantViolation {
            invariant: invariant.to_string(),
            section_id,
            candidate_id,
            detail,
        });
    }

    fn store(&self, text: &str) -> Option<String> {
        self.redactor.store(text)
    }
}

impl PipelineObserver for DebugLedger {
    fn on_section(&mut self, section: &Section) {
        if self.section_index.contains_key(&section.id) {
            return;
        }
        let record = SectionDebug {
            section_id: section.id.clone(),
            parent_id: section.parent_id.clone(),
            heading: self.store(&section.heading),
            heading_level: section.heading_level,
            start_line: section.start_line,
            end_line: section.end_line,
            features: section.features.clone(),
            text: self.store(&section.raw_text),
            intent: None,
            top_label: None,
            top_score: 0.0,
            cues: BTreeMap::new(),
            actionability: None,
            suggested_type: None,
            signals: Vec::new(),
            metadata: BTreeMap::new(),
            drop: None,
            drop_detail: String::new(),
            emitted: false,
            emitted_count: 0,
            candidates: Vec::new(),
        };
        self.section_index
            .insert(section.id.clone(), self.sections.len());
        self.sections.push(record);
        self.note_summary.section_count = self.sections.len();
    }

    fn on_classified(&mut self, classified: &ClassifiedSection) {
        if let Some(record) = self.section_mut(&classified.section.id) {
            record.intent = Some(classified.intent.clone());
            record.top_label = classified.top_label;
            record.top_score = classified.top_score;
            record.cues = classified.cues.clone();
            record.actionability = Some(classified.actionability.clone());
            record.suggested_type = classified.suggested_type;
        }
    }

    fn on_split(&mut self, parent: &SectionId, children: &[Section]) {
        let ids = children
            .iter()
            .map(|c| c.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.on_section_metadata(parent, SUBSECTION_IDS_KEY, &ids);
        self.on_section_dropped(
            parent,
            DropStage::TopicIsolation,
            DropReason::SplitIntoSubsections,
            &format!("{} topics", children.len()),
        );
    }

    fn on_section_dropped(
        &mut self,
        id: &SectionId,
        stage: DropStage,
        reason: DropReason,
        detail: &str,
    ) {
        if let Some(record) = self.section_mut(id) {
            if record.drop.is_none() {
                record.drop = Some(DropRecord { stage, reason });
                record.drop_detail = detail.to_string();
            }
        }
    }

    fn on_section_metadata(&mut self, id: &SectionId, key: &str, value: &str) {
        if let Some(record) = self.section_mut(id) {
            record.metadata.insert(key.to_string(), value.to_string());
        }
    }

    fn on_signals(&mut self, id: &SectionId, signals: &[Signal]) {
        let stored: Vec<SignalDebug> = signals
            .iter()
            .map(|s| SignalDebug {
                signal_type: s.signal_type,
                proposed_type: s.proposed_type,
                confidence: s.confidence,
                sentence_index: s.sentence_index,
                start_line: s.start_line,
                end_line: s.end_line,
                rule: s.rule.to_string(),
                text: self.store(&s.source_sentence),
            })
            .collect();
        if let Some(record) = self.section_mut(id) {
            record.signals.extend(stored);
        }
    }

    fn on_candidate_created(&mut self, candidate: &Suggestion) {
        if self.candidate_index.contains_key(&candidate.id) {
            return;
        }
        let record = CandidateDebug {
            candidate_id: candidate.id.clone(),
            suggestion_type: candidate.suggestion_type(),
            provenance: candidate.provenance.as_str().to_string(),
            title: self.store(&candidate.title),
            fingerprint: candidate.fingerprint.clone(),
            evidence: candidate
                .evidence
                .iter()
                .map(|span| EvidenceDebug {
                    start_line: span.start_line,
                    end_line: span.end_line,
                    text: self.store(&span.text),
                })
                .collect(),
            validation: Vec::new(),
            scores: None,
            status: candidate.status,
            clarification_reasons: candidate.clarification_reasons.clone(),
            routing: None,
            metadata: candidate.metadata.clone(),
            emitted: false,
            fate: CandidateFate::Pending,
        };

        let Some(&section) = self.section_index.get(&candidate.section_id) else {
            self.violation(
                "candidate_section_known",
                Some(candidate.section_id.clone()),
                Some(candidate.id.clone()),
                "candidate created for a section the ledger never saw".to_string(),
            );
            return;
        };
        let index = self.sections[section].candidates.len();
        self.sections[section].candidates.push(record);
        self.candidate_index
            .insert(candidate.id.clone(), CandidateSlot { section, index });
    }

    fn on_candidate_dropped(
        &mut self,
        id: &SuggestionId,
        stage: DropStage,
        reason: DropReason,
        detail: &str,
    ) {
        if let Some(record) = self.candidate_mut(id) {
            if record.fate.is_pending() {
                record.fate = CandidateFate::Dropped {
                    stage,
                    reason,
                    detail: detail.to_string(),
                };
            } else {
                tracing::debug!(
                    candidate_id = %id,
                    %stage,
                    %reason,
                    "candidate already terminal, drop ignored"
                );
            }
        }
    }

    fn on_validation(&mut self, id: &SuggestionId, results: &[ValidatorResult]) {
        if let Some(record) = self.candidate_mut(id) {
            record.validation = results.to_vec();
        }
    }

    fn on_scored(&mut self, candidate: &Suggestion) {
        if let Some(record) = self.candidate_mut(&candidate.id) {
            record.scores = Some(candidate.scores);
            record.status = candidate.status;
            record.clarification_reasons = candidate.clarification_reasons.clone();
        }
    }

    fn on_routed(&mut self, candidate: &Suggestion) {
        if let Some(record) = self.candidate_mut(&candidate.id) {
            record.routing = Some(candidate.routing.clone());
        }
    }

    fn on_stage_timing(&mut self, stage: &'static str, elapsed: Duration) {
        self.timings.push(StageTiming {
            stage: stage.to_string(),
            micros: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
        });
    }

    fn on_failure(&mut self, error: &PipelineError) {
        self.failure = Some(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plansift_model::{
        EvidenceSpan, IdGenerator, MarkdownSectionProvider, Provenance, SectionProvider,
        SuggestionPayload, Verbosity,
    };

    fn ledger_with_section(text: &str) -> (DebugLedger, Section) {
        let note = NoteInput::new("n1", text);
        let config = PipelineConfig::default().with_verbosity(Verbosity::FullText);
        let mut ledger = DebugLedger::new(&note, &config);
        let section = MarkdownSectionProvider
            .sections(&note, &mut IdGenerator::new())
            .unwrap()
            .remove(0);
        ledger.on_section(&section);
        (ledger, section)
    }

    fn candidate(section: &Section, id: &str) -> Suggestion {
        Suggestion::candidate(
            SuggestionId::new(id),
            "n1",
            section.id.clone(),
            "Bulk export",
            SuggestionPayload::Idea {
                description: "Customers want bulk export".into(),
            },
            vec![EvidenceSpan::new(2, 2, "Customers want bulk export")],
            Provenance::Signal,
        )
    }

    #[test]
    fn first_drop_wins() {
        let (mut ledger, section) = ledger_with_section("# Billing\nCustomers want bulk export\n");
        let c = candidate(&section, "sug-1");
        ledger.on_candidate_created(&c);
        ledger.on_candidate_dropped(&c.id, DropStage::Validation, DropReason::VacuousContent, "");
        ledger.on_candidate_dropped(&c.id, DropStage::Scoring, DropReason::ScoreBelowThreshold, "");

        let run = ledger.finalize(&[]);
        let record = run.candidates().next().unwrap();
        assert_eq!(
            record.fate.drop_record(),
            Some(DropRecord {
                stage: DropStage::Validation,
                reason: DropReason::VacuousContent
            })
        );
    }

    #[test]
    fn unknown_section_is_a_violation() {
        let (mut ledger, section) = ledger_with_section("# Billing\nCustomers want bulk export\n");
        let mut c = candidate(&section, "sug-1");
        c.section_id = SectionId::new("sec-404");
        ledger.on_candidate_created(&c);
        let run = ledger.finalize(&[]);
        assert_eq!(run.invariant_violations.len(), 1);
        assert_eq!(run.invariant_violations[0].invariant, "candidate_section_known");
    }

    #[test]
    fn split_records_children() {
        let (mut ledger, section) = ledger_with_section("# Sync\n**A**\nx\n**B**\ny\n");
        let children = vec![
            Section::child_of(&section, SectionId::new("sec-2"), "A", Some("**A**"), 3, &["x"]),
            Section::child_of(&section, SectionId::new("sec-3"), "B", Some("**B**"), 5, &["y"]),
        ];
        ledger.on_split(&section.id, &children);
        for child in &children {
            ledger.on_section(child);
        }
        let run = ledger.finalize(&[]);
        let parent = run.section(&section.id).unwrap();
        assert!(parent.is_split());
        assert_eq!(
            parent.subsection_ids(),
            vec![SectionId::new("sec-2"), SectionId::new("sec-3")]
        );
        assert!(run.invariant_violations.is_empty());
    }
}
