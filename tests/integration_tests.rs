//! Integration tests for the complete plansift pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - config file → `PipelineConfig` → `SuggestionPipeline`
//! - custom `SectionProvider` / `TitleNormalizer` seams
//! - suggestions and the debug ledger as JSON
//!
//! Run with: cargo test --test integration_tests

use plansift_model::text::has_concrete_content;
use plansift_model::{
    DefaultTitleNormalizer, EvidenceSpan, IdGenerator, MarkdownSectionProvider, NoteInput,
    PipelineConfig, PipelineError, Section, SectionProvider, Suggestion, SuggestionType,
    TitleNormalizer, Verbosity,
};
use plansift_pipeline::{DropReason, DropStage, SuggestionPipeline};
use tempfile::tempdir;

const NOTE: &str = "# Partner integration
If we can't prove GDPR compliance by the audit, the partnership is dead in the water. We're looking at a 4-week delay because the vendor changed the handshake protocol.

# Next Steps
They need to build the export API.

## Feature requests
- Customers want dark mode in the dashboard.
- Users need bulk export for invoices.
- Admins want SSO with Okta.
";

// ============================================================================
// Title normalization
// ============================================================================

#[test]
fn test_generic_title_is_rederived_from_evidence() {
    let input = "Update: Discussion They";
    let evidence = [EvidenceSpan::new(
        3,
        3,
        "We are looking at a 4-week delay due to infrastructure work",
    )];
    let title = DefaultTitleNormalizer::default().normalize(input, &evidence);

    assert_ne!(title, input);
    assert!(has_concrete_content(&title));
    let lowered = title.to_lowercase();
    for generic in ["they", "discussion", "update"] {
        assert!(
            !lowered.split_whitespace().any(|w| w == generic),
            "{title:?} kept {generic:?}"
        );
    }
    assert!(lowered.contains("delay"));
}

// ============================================================================
// Config → pipeline
// ============================================================================

#[test]
fn test_config_file_drives_pipeline() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plansift.json");
    std::fs::write(
        &path,
        r#"{ "verbosity": "redacted", "max_suggestions": 2, "T_overall_min": 0.5 }"#,
    )
    .unwrap();

    let config = PipelineConfig::from_path(&path).unwrap();
    assert_eq!(config.max_suggestions, 2);
    assert_eq!(config.t_overall_min, 0.5);

    let out = SuggestionPipeline::new(config)
        .run(&NoteInput::new("n1", NOTE), &[])
        .unwrap();
    let debug = out.debug.expect("redacted ledger");
    assert_eq!(debug.config.max_suggestions, 2);
    assert_eq!(debug.meta.verbosity, Verbosity::Redacted);
    assert!(debug.invariant_violations.is_empty());
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "t_action": 3.0 }"#).unwrap();
    assert!(PipelineConfig::from_path(&path).is_err());
}

#[test]
fn test_debug_enabled_implies_redacted_ledger() {
    let config = PipelineConfig {
        debug_enabled: true,
        ..PipelineConfig::default()
    };
    let out = SuggestionPipeline::new(config)
        .run(&NoteInput::new("n1", NOTE), &[])
        .unwrap();
    assert_eq!(out.debug.expect("ledger").meta.verbosity, Verbosity::Redacted);
}

// ============================================================================
// Full note
// ============================================================================

#[test]
fn test_full_note_end_to_end() {
    let config = PipelineConfig::default().with_verbosity(Verbosity::FullText);
    let out = SuggestionPipeline::new(config)
        .run(&NoteInput::new("weekly", NOTE), &[])
        .unwrap();

    let kinds: Vec<SuggestionType> = out.suggestions.iter().map(|s| s.suggestion_type()).collect();
    assert!(kinds.contains(&SuggestionType::Risk));
    assert!(kinds.contains(&SuggestionType::ProjectUpdate));
    assert!(out.suggestions.iter().all(|s| s.note_id == "weekly"));
    assert!(out
        .suggestions
        .iter()
        .all(|s| !s.body().contains("export API")));

    let debug = out.debug.expect("ledger");
    let next_steps = debug
        .sections
        .iter()
        .find(|s| s.heading.as_deref() == Some("Next Steps"))
        .expect("next steps recorded");
    assert_eq!(
        next_steps.drop.map(|d| (d.stage, d.reason)),
        Some((DropStage::Classification, DropReason::NotActionable))
    );
}

#[test]
fn test_suggestions_serialize_round_trip() {
    let out = SuggestionPipeline::default()
        .run(&NoteInput::new("n1", NOTE), &[])
        .unwrap();
    let json = serde_json::to_string(&out.suggestions).unwrap();
    let back: Vec<Suggestion> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), out.suggestions.len());
    for (a, b) in back.iter().zip(&out.suggestions) {
        assert_eq!(
            (&a.id, &a.title, &a.payload, &a.evidence),
            (&b.id, &b.title, &b.payload, &b.evidence)
        );
        assert_eq!(a.provenance, b.provenance);
    }

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let first = &value[0];
    assert!(first["payload"]["type"].is_string());
    assert!(first["scores"]["overall"].is_number());
}

// ============================================================================
// Collaborator seams
// ============================================================================

/// Only the first section of a note.
struct LeadSectionOnly;

impl SectionProvider for LeadSectionOnly {
    fn sections(
        &self,
        note: &NoteInput,
        ids: &mut IdGenerator,
    ) -> Result<Vec<Section>, PipelineError> {
        let mut sections = MarkdownSectionProvider.sections(note, ids)?;
        sections.truncate(1);
        Ok(sections)
    }
}

struct ShoutingTitles;

impl TitleNormalizer for ShoutingTitles {
    fn normalize(&self, title: &str, _evidence: &[EvidenceSpan]) -> String {
        title.to_uppercase()
    }
}

#[test]
fn test_custom_collaborators_are_used() {
    let out = SuggestionPipeline::new(PipelineConfig::default().with_verbosity(Verbosity::FullText))
        .with_section_provider(LeadSectionOnly)
        .with_title_normalizer(ShoutingTitles)
        .run(&NoteInput::new("n1", NOTE), &[])
        .unwrap();

    let debug = out.debug.expect("ledger");
    assert_eq!(debug.sections.len(), 1);
    assert!(!out.suggestions.is_empty());
    for s in &out.suggestions {
        assert_eq!(s.title, s.title.to_uppercase());
        assert!(s.evidence.iter().all(|e| e.end_line <= 2));
    }
}

struct BrokenProvider;

impl SectionProvider for BrokenProvider {
    fn sections(
        &self,
        _note: &NoteInput,
        _ids: &mut IdGenerator,
    ) -> Result<Vec<Section>, PipelineError> {
        Err(PipelineError::internal("sectioning", "tokenizer crashed"))
    }
}

#[test]
fn test_failed_run_keeps_its_ledger() {
    let config = PipelineConfig::default().with_verbosity(Verbosity::Redacted);
    let failure = SuggestionPipeline::new(config)
        .with_section_provider(BrokenProvider)
        .run(&NoteInput::new("n1", NOTE), &[])
        .unwrap_err();
    assert!(!failure.error.is_input_error());
    let debug = failure.debug.expect("ledger");
    assert!(debug.failure.as_deref().unwrap_or("").contains("tokenizer crashed"));
    assert!(debug.to_json().unwrap().contains("\"failure\""));
}
