//! Reconciliation and the ledger's hard invariants.

use plansift_model::SuggestionId;
use std::collections::BTreeSet;

use super::records::{CandidateFate, DebugRun, DropRecord, FALLBACK_SKIP_KEY, SUBSECTION_IDS_KEY};
use super::DebugLedger;
use crate::classifier::IntentLabel;
use crate::outcome::{DropReason, DropStage};

impl DebugLedger {
    /// Close the ledger against the suggestions actually returned.
    ///
    /// 1. Every candidate whose id is in `emitted_ids` is marked emitted; this
    ///    overrides any earlier pessimistic drop. Candidates still pending are
    ///    dropped as `FINALIZE/INTERNAL_ERROR`.
    /// 2. A split section must list its sub-section ids, and every listed id must
    ///    have a ledger record. Otherwise it is re-classified `INTERNAL_ERROR`.
    /// 3. A section with zero emitted candidates always gets a drop reason:
    ///    fallback-skip metadata gives `LOW_RELEVANCE`, a plan-change section
    ///    without one gives `INTERNAL_ERROR`, anything else `SCORE_BELOW_THRESHOLD`.
    pub fn finalize(mut self, emitted_ids: &[SuggestionId]) -> DebugRun {
        self.reconcile(emitted_ids);
        self.check_split_sections();
        self.assign_zero_output_reasons();

        DebugRun {
            meta: self.meta,
            config: self.config,
            note_summary: self.note_summary,
            sections: self.sections,
            timings: self.timings,
            invariant_violations: self.violations,
            failure: self.failure,
        }
    }

    fn reconcile(&mut self, emitted_ids: &[SuggestionId]) {
        let emitted: BTreeSet<&SuggestionId> = emitted_ids.iter().collect();
        let mut stranded = Vec::new();

        for section in &mut self.sections {
            for candidate in &mut section.candidates {
                if emitted.contains(&candidate.candidate_id) {
                    candidate.emitted = true;
                    candidate.fate = CandidateFate::Emitted;
                } else if candidate.fate.is_pending() {
                    candidate.fate = CandidateFate::Dropped {
                        stage: DropStage::Finalize,
                        reason: DropReason::InternalError,
                        detail: "candidate never reached a terminal state".to_string(),
                    };
                    stranded.push((section.section_id.clone(), candidate.candidate_id.clone()));
                }
            }
            section.emitted_count = section.candidates.iter().filter(|c| c.emitted).count();
            section.emitted = section.emitted_count > 0;
        }

        for id in emitted_ids {
            if !self.candidate_index.contains_key(id) {
                self.violation(
                    "emitted_candidate_recorded",
                    None,
                    Some(id.clone()),
                    "emitted suggestion has no ledger record".to_string(),
                );
            }
        }
        for (section_id, candidate_id) in stranded {
            self.violation(
                "candidate_terminal",
                Some(section_id),
                Some(candidate_id),
                "candidate neither emitted nor dropped".to_string(),
            );
        }
    }

    fn check_split_sections(&mut self) {
        let mut broken = Vec::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if !section.is_split() {
                continue;
            }
            let children = section.subsection_ids();
            let missing: Vec<String> = children
                .iter()
                .filter(|id| !self.section_index.contains_key(*id))
                .map(|id| id.to_string())
                .collect();
            let detail = if children.is_empty() {
                format!("split section lacks `{SUBSECTION_IDS_KEY}` metadata")
            } else if !missing.is_empty() {
                format!("subsections missing from ledger: {}", missing.join(","))
            } else {
                continue;
            };
            broken.push((idx, detail));
        }

        for (idx, detail) in broken {
            let section = &mut self.sections[idx];
            section.drop = Some(DropRecord {
                stage: DropStage::Finalize,
                reason: DropReason::InternalError,
            });
            section.drop_detail = detail.clone();
            section
                .metadata
                .insert("invariant_error".to_string(), detail.clone());
            let id = section.section_id.clone();
            self.violation("split_lists_subsections", Some(id), None, detail);
        }
    }

    fn assign_zero_output_reasons(&mut self) {
        let mut silent_plan_changes = Vec::new();
        for section in &mut self.sections {
            if section.emitted || section.drop.is_some() {
                continue;
            }
            let (stage, reason) = if section.metadata.contains_key(FALLBACK_SKIP_KEY) {
                (DropStage::Synthesis, DropReason::LowRelevance)
            } else if section.top_label == Some(IntentLabel::PlanChange) {
                silent_plan_changes.push(section.section_id.clone());
                (DropStage::Finalize, DropReason::InternalError)
            } else {
                (DropStage::Scoring, DropReason::ScoreBelowThreshold)
            };
            section.drop = Some(DropRecord { stage, reason });
        }
        for id in silent_plan_changes {
            self.violation(
                "plan_change_non_silence",
                Some(id),
                None,
                "plan-change section emitted nothing and carries no fallback skip".to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PipelineObserver;
    use plansift_model::{
        EvidenceSpan, IdGenerator, MarkdownSectionProvider, NoteInput, PipelineConfig, Provenance,
        Section, SectionProvider, Suggestion, SuggestionPayload, Verbosity,
    };

    fn setup(text: &str) -> (DebugLedger, Vec<Section>) {
        let note = NoteInput::new("n1", text);
        let config = PipelineConfig::default().with_verbosity(Verbosity::Redacted);
        let mut ledger = DebugLedger::new(&note, &config);
        let sections = MarkdownSectionProvider
            .sections(&note, &mut IdGenerator::new())
            .unwrap();
        for s in &sections {
            ledger.on_section(s);
        }
        (ledger, sections)
    }

    fn idea(section: &Section, id: &str) -> Suggestion {
        Suggestion::candidate(
            SuggestionId::new(id),
            "n1",
            section.id.clone(),
            "Invoice export",
            SuggestionPayload::Idea {
                description: "Finance wants invoice export".into(),
            },
            vec![EvidenceSpan::new(2, 2, "Finance wants invoice export")],
            Provenance::Signal,
        )
    }

    #[test]
    fn reconciliation_rescues_pre_dropped_candidates() {
        let (mut ledger, sections) = setup("# Billing\nFinance wants invoice export\n");
        let c = idea(&sections[0], "sug-1");
        ledger.on_candidate_created(&c);
        ledger.on_candidate_dropped(&c.id, DropStage::Cap, DropReason::MaxSuggestionsExceeded, "");

        let run = ledger.finalize(&[c.id.clone()]);
        let record = run.candidates().next().unwrap();
        assert!(record.emitted);
        assert_eq!(record.fate, CandidateFate::Emitted);
        assert_eq!(run.sections[0].emitted_count, 1);
        assert!(run.sections[0].emitted);
        assert!(run.sections[0].drop.is_none());
    }

    #[test]
    fn pending_candidates_become_internal_errors() {
        let (mut ledger, sections) = setup("# Billing\nFinance wants invoice export\n");
        ledger.on_candidate_created(&idea(&sections[0], "sug-1"));
        let run = ledger.finalize(&[]);
        let record = run.candidates().next().unwrap();
        assert_eq!(
            record.fate.drop_record().map(|d| d.reason),
            Some(DropReason::InternalError)
        );
        assert!(run
            .invariant_violations
            .iter()
            .any(|v| v.invariant == "candidate_terminal"));
    }

    #[test]
    fn split_without_children_is_reclassified() {
        let (mut ledger, sections) = setup("# Sync\n**A**\nx\n**B**\ny\n");
        ledger.on_section_dropped(
            &sections[0].id,
            DropStage::TopicIsolation,
            DropReason::SplitIntoSubsections,
            "",
        );
        ledger.on_section_metadata(&sections[0].id, SUBSECTION_IDS_KEY, "sec-8,sec-9");
        let run = ledger.finalize(&[]);
        let parent = &run.sections[0];
        assert_eq!(parent.drop.map(|d| d.reason), Some(DropReason::InternalError));
        assert!(parent.drop_detail.contains("sec-8"));
        assert_eq!(run.invariant_violations[0].invariant, "split_lists_subsections");
    }

    #[test]
    fn zero_output_priority() {
        let (mut ledger, sections) = setup("# A\nalpha text\n# B\nbeta text\n# C\ngamma text\n");
        ledger.on_section_metadata(&sections[0].id, FALLBACK_SKIP_KEY, "long_discussion_section");
        let run = ledger.finalize(&[]);
        assert_eq!(
            run.sections[0].drop.map(|d| d.reason),
            Some(DropReason::LowRelevance)
        );
        assert_eq!(
            run.sections[1].drop.map(|d| d.reason),
            Some(DropReason::ScoreBelowThreshold)
        );
        assert!(run.sections.iter().all(|s| !s.emitted && s.drop.is_some()));
        assert!(run.invariant_violations.is_empty());
    }

    #[test]
    fn silent_plan_change_is_flagged() {
        use crate::classifier::SectionClassifier;
        use plansift_model::split_sentences;

        let (mut ledger, sections) = setup("# Timeline\nLaunch slipped two weeks to Q4.\n");
        let sentences = split_sentences(&sections[0]);
        let classified = SectionClassifier::new(&PipelineConfig::default())
            .classify(sections[0].clone(), &sentences);
        ledger.on_classified(&classified);

        let run = ledger.finalize(&[]);
        assert_eq!(
            run.sections[0].drop,
            Some(DropRecord {
                stage: DropStage::Finalize,
                reason: DropReason::InternalError
            })
        );
        assert_eq!(run.invariant_violations[0].invariant, "plan_change_non_silence");
    }

    #[test]
    fn summary_counts_by_stage_and_reason() {
        let (mut ledger, sections) = setup("# Billing\nFinance wants invoice export\n");
        let a = idea(&sections[0], "sug-1");
        let b = idea(&sections[0], "sug-2");
        ledger.on_candidate_created(&a);
        ledger.on_candidate_created(&b);
        ledger.on_candidate_dropped(&b.id, DropStage::Dedup, DropReason::DuplicateFingerprint, "");
        let run = ledger.finalize(&[a.id.clone()]);
        let summary = run.summary();
        assert_eq!(summary.get("EMITTED"), Some(&1));
        assert_eq!(summary.get("DEDUP/DUPLICATE_FINGERPRINT"), Some(&1));
        assert!(run.to_json().unwrap().contains("\"run_id\""));
    }
}
