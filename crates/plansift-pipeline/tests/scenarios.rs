//! End-to-end scenarios for the suggestion pipeline.
//!
//! Run with: cargo test -p plansift-pipeline --test scenarios

use plansift_model::text::GroundingIndex;
use plansift_model::{
    ExistingPlanItem, NoteInput, PipelineConfig, Provenance, RoutingIntent, SuggestionType,
    Verbosity,
};
use plansift_pipeline::ledger::CandidateFate;
use plansift_pipeline::outcome::{DropReason, DropStage};
use plansift_pipeline::{DebugRun, IntentLabel, PipelineOutput, SuggestionPipeline};

const GDPR: &str =
    "If we can't prove GDPR compliance by the audit, the partnership is dead in the water.";
const DELAY: &str =
    "We're looking at a 4-week delay because the vendor changed the handshake protocol.";

fn run(text: &str) -> PipelineOutput {
    run_with(text, PipelineConfig::default().with_verbosity(Verbosity::FullText), &[])
}

fn run_with(text: &str, config: PipelineConfig, existing: &[ExistingPlanItem]) -> PipelineOutput {
    SuggestionPipeline::new(config)
        .run(&NoteInput::new("note-1", text), existing)
        .expect("pipeline run")
}

/// Ledger checks every completed run must satisfy.
fn assert_ledger_consistent(out: &PipelineOutput) {
    let debug: &DebugRun = out.debug.as_ref().expect("ledger");
    assert!(
        debug.invariant_violations.is_empty(),
        "violations: {:?}",
        debug.invariant_violations
    );
    let emitted = debug.emitted_ids();
    let returned: Vec<_> = out.suggestions.iter().map(|s| s.id.clone()).collect();
    assert_eq!(emitted.len(), returned.len());
    for id in &returned {
        assert!(emitted.contains(id), "{id} emitted but not in ledger");
    }
    for candidate in debug.candidates() {
        assert!(!candidate.fate.is_pending(), "{} left pending", candidate.candidate_id);
    }
    for section in &debug.sections {
        assert_eq!(section.emitted, section.emitted_count > 0);
        assert!(
            section.emitted || section.drop.is_some(),
            "section {} has neither output nor a drop reason",
            section.section_id
        );
    }
}

// ============================================================================
// Signal-grounded synthesis
// ============================================================================

#[test]
fn test_gdpr_paragraph_yields_risk_and_update() {
    let text = format!("# Partner integration\n{GDPR} {DELAY}\n");
    let out = run(&text);

    let risk = out
        .suggestions
        .iter()
        .find(|s| s.suggestion_type() == SuggestionType::Risk)
        .expect("risk suggestion");
    assert!(risk.evidence.iter().any(|e| e.text.contains("GDPR compliance")));

    let update = out
        .suggestions
        .iter()
        .find(|s| s.suggestion_type() == SuggestionType::ProjectUpdate)
        .expect("project_update suggestion");
    assert!(update.evidence.iter().any(|e| e.text.contains("4-week delay")));

    // No section-spanning update without a signal behind it.
    for s in &out.suggestions {
        assert_eq!(s.provenance, Provenance::Signal, "{} has {}", s.title, s.provenance);
        assert_eq!(s.evidence.len(), 1);
    }
    assert_ledger_consistent(&out);
}

#[test]
fn test_evidence_is_grounded_in_note() {
    let text = format!(
        "# Partner integration\n{GDPR}   {DELAY}\n\n## Feature requests\n\
         - Customers want dark mode in the dashboard.\n\
         - Users need bulk export for invoices.\n\
         - Admins want SSO with Okta.\n"
    );
    let out = run(&text);
    let index = GroundingIndex::new(&text);
    assert!(!out.suggestions.is_empty());
    for s in &out.suggestions {
        for span in &s.evidence {
            assert!(index.contains(&span.text), "ungrounded: {:?}", span.text);
        }
    }
    assert_ledger_consistent(&out);
}

// ============================================================================
// Sections that must stay silent
// ============================================================================

#[test]
fn test_next_steps_section_is_silent() {
    let text = "# Timeline\nLaunch slipped two weeks to Q4.\n\n\
                # Next Steps\nThey need to build the export API.\n";
    let out = run(text);

    // Everything emitted comes from the timeline section (lines 1-2).
    assert!(!out.suggestions.is_empty());
    for s in &out.suggestions {
        assert!(s.evidence.iter().all(|e| e.end_line <= 2), "{:?}", s.evidence);
        assert!(!s.title.contains("export API"));
    }

    let debug = out.debug.as_ref().expect("ledger");
    let next_steps = debug
        .sections
        .iter()
        .find(|s| s.start_line == 4)
        .expect("next steps section");
    assert_eq!(next_steps.emitted_count, 0);
    let drop = next_steps.drop.expect("drop reason");
    assert_eq!(drop.stage, DropStage::Classification);
    assert_eq!(drop.reason, DropReason::NotActionable);
    assert_ledger_consistent(&out);
}

#[test]
fn test_empty_note_section_has_low_relevance() {
    let out = run("# Misc\n");
    assert!(out.suggestions.is_empty());
    let debug = out.debug.as_ref().expect("ledger");
    assert_eq!(
        debug.section_summary().get("CLASSIFICATION/LOW_RELEVANCE"),
        Some(&1)
    );
    assert_ledger_consistent(&out);
}

// ============================================================================
// Topic isolation
// ============================================================================

#[test]
fn test_split_parent_never_emits() {
    let text = "## Customer feedback\n**Billing**\nCustomers want invoice export.\n\n\
                **Search**\nSearch latency regressed after the deploy.\n";
    let out = run(text);
    let debug = out.debug.as_ref().expect("ledger");

    let parent = debug
        .sections
        .iter()
        .find(|s| s.is_split())
        .expect("split parent");
    assert!(!parent.emitted);
    let drop = parent.drop.expect("drop reason");
    assert_eq!(drop.reason, DropReason::SplitIntoSubsections);

    let children = parent.subsection_ids();
    assert_eq!(children.len(), 2);
    for child in &children {
        let recorded = debug.section(child).expect("child recorded");
        assert_eq!(recorded.parent_id.as_ref(), Some(&parent.section_id));
    }
    for s in &out.suggestions {
        assert_ne!(s.section_id, parent.section_id);
        assert!(children.contains(&s.section_id));
    }
    assert_ledger_consistent(&out);
}

#[test]
fn test_plan_change_section_splits_per_workstream() {
    let text = "# Timeline\n**Billing**\nThe invoice launch slipped two weeks to Q4.\n\n\
                **Search**\nSearch rollout moved to next sprint, \
                and customers want typo tolerance in search.\n";
    let out = run(text);
    let debug = out.debug.as_ref().expect("ledger");

    let parent = debug
        .sections
        .iter()
        .find(|s| s.parent_id.is_none())
        .expect("timeline section");
    assert_eq!(parent.top_label, Some(IntentLabel::PlanChange));
    assert!(parent.is_split());
    assert_eq!(parent.drop.map(|d| d.reason), Some(DropReason::SplitIntoSubsections));

    let children = parent.subsection_ids();
    assert_eq!(children.len(), 2);
    let billing = debug.section(&children[0]).expect("billing recorded");
    assert_eq!(billing.heading.as_deref(), Some("Billing"));
    assert_eq!(billing.top_label, Some(IntentLabel::PlanChange));

    // Every plan-change topic speaks for itself.
    for child in &children {
        let record = debug.section(child).expect("child recorded");
        if record.top_label == Some(IntentLabel::PlanChange) {
            assert!(
                out.suggestions.iter().any(|s| &s.section_id == child),
                "plan-change topic {child} is silent"
            );
        }
    }
    let slip = out
        .suggestions
        .iter()
        .find(|s| {
            s.section_id == children[0] && s.suggestion_type() == SuggestionType::ProjectUpdate
        })
        .expect("billing update");
    assert!(slip.evidence.iter().any(|e| e.text.contains("slipped two weeks")));

    for s in &out.suggestions {
        assert_ne!(s.section_id, parent.section_id);
        assert!(!s.title.contains('*'), "markup in title {:?}", s.title);
        assert!(s.evidence.iter().all(|e| !e.text.contains("**")), "{:?}", s.evidence);
    }
    assert_ledger_consistent(&out);
}

// ============================================================================
// Consolidation, routing and the cap
// ============================================================================

#[test]
fn test_bulleted_requests_fold_into_one_idea() {
    let text = "## Feature requests\n\
                - Customers want dark mode in the dashboard.\n\
                - Users need bulk export for invoices.\n\
                - Admins want SSO with Okta.\n";
    let out = run(text);
    let debug = out.debug.as_ref().expect("ledger");

    let merged = debug
        .candidates()
        .filter(|c| {
            matches!(
                c.fate,
                CandidateFate::Dropped {
                    reason: DropReason::ConsolidatedIntoSection,
                    ..
                }
            )
        })
        .count();
    assert_eq!(merged, 3);

    let consolidated: Vec<_> = out
        .suggestions
        .iter()
        .filter(|s| s.provenance == Provenance::ConsolidatedSection)
        .collect();
    assert_eq!(consolidated.len(), 1);
    assert_eq!(consolidated[0].title, "Feature requests");
    assert_eq!(consolidated[0].suggestion_type(), SuggestionType::Idea);
    assert_eq!(consolidated[0].evidence.len(), merged);
    assert_ledger_consistent(&out);
}

#[test]
fn test_routing_attaches_to_existing_item() {
    let text = format!("# Partner integration\n{GDPR} {DELAY}\n");
    let baseline = run(&text);
    let target = baseline.suggestions[0].title.clone();

    let items = vec![
        ExistingPlanItem::new("plan-unrelated", "Quarterly hiring pipeline"),
        ExistingPlanItem::new("plan-7", target.clone()),
    ];
    let routed = run_with(&text, PipelineConfig::default(), &items);
    let first = routed
        .suggestions
        .iter()
        .find(|s| s.title == target)
        .expect("same suggestion");
    match &first.routing {
        RoutingIntent::AttachToExisting { plan_item_id, similarity } => {
            assert_eq!(plan_item_id, "plan-7");
            assert!(*similarity > 0.99);
        }
        other => panic!("expected attach, got {other:?}"),
    }
}

#[test]
fn test_cap_limits_output_and_records_excess() {
    let text = format!(
        "# Partner integration\n{GDPR} {DELAY}\n\n## Reporting\n\
         Finance needs a monthly invoice export before the renewal. \
         Support wants a dashboard for failed payments.\n"
    );
    let config = PipelineConfig::default()
        .with_verbosity(Verbosity::Redacted)
        .with_max_suggestions(1);
    let out = run_with(&text, config, &[]);
    let debug = out.debug.as_ref().expect("ledger");

    // Plan-change updates are protected, so the cap may be exceeded only by them.
    let unprotected = out
        .suggestions
        .iter()
        .filter(|s| s.suggestion_type() != SuggestionType::ProjectUpdate)
        .count();
    assert!(unprotected <= 1);
    for c in debug.candidates() {
        if let CandidateFate::Dropped {
            stage: DropStage::Cap,
            reason,
            ..
        } = c.fate
        {
            assert_eq!(reason, DropReason::MaxSuggestionsExceeded);
            assert!(!c.emitted);
        }
    }
    assert_ledger_consistent(&out);
}

// ============================================================================
// Ledger
// ============================================================================

#[test]
fn test_redacted_ledger_masks_contacts() {
    let text = "# Timeline\nLaunch slipped two weeks to Q4, ping dana@example.com for details.\n";
    let out = run_with(text, PipelineConfig::default().with_verbosity(Verbosity::Redacted), &[]);
    let json = out.debug.as_ref().expect("ledger").to_json().expect("json");
    assert!(!json.contains("dana@example.com"));
    // Suggestions themselves keep the source text.
    assert!(out
        .suggestions
        .iter()
        .any(|s| s.evidence.iter().any(|e| e.text.contains("dana@example.com"))));
}

#[test]
fn test_summary_counts_emitted() {
    let text = format!("# Partner integration\n{GDPR} {DELAY}\n");
    let out = run(&text);
    let debug = out.debug.as_ref().expect("ledger");
    assert_eq!(
        debug.summary().get("EMITTED").copied().unwrap_or(0),
        out.suggestions.len()
    );
    let parsed: serde_json::Value = serde_json::from_str(&debug.to_json().unwrap()).unwrap();
    assert_eq!(parsed["meta"]["note_id"], "note-1");
}
