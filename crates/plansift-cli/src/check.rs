//! `plansift check`: determinism and ledger self-check.

use anyhow::{bail, Result};
use colored::Colorize;
use plansift_model::{NoteInput, PipelineConfig, Suggestion, Verbosity};
use plansift_pipeline::SuggestionPipeline;
use serde_json::Value;
use std::cmp::Ordering;

/// Fields that legitimately differ between equivalent runs.
const RUN_LOCAL_FIELDS: &[&str] = &["id", "note_id", "section_id", "routing", "fingerprint"];

/// Suggestions with run-local fields removed, sorted by type, overall score
/// (descending) and title.
pub fn canonical(suggestions: &[Suggestion]) -> Result<Vec<Value>> {
    let mut rows = suggestions
        .iter()
        .map(|s| -> Result<_> {
            let mut value = serde_json::to_value(s)?;
            if let Value::Object(map) = &mut value {
                for field in RUN_LOCAL_FIELDS {
                    map.remove(*field);
                }
            }
            Ok((s.suggestion_type(), s.scores.overall(), s.title.clone(), value))
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
            .then_with(|| a.2.cmp(&b.2))
    });
    Ok(rows.into_iter().map(|(_, _, _, v)| v).collect())
}

pub fn cmd_check(config: PipelineConfig, note: &NoteInput, runs: usize) -> Result<()> {
    if runs == 0 {
        bail!("--runs must be at least 1");
    }
    let pipeline = SuggestionPipeline::new(config.with_verbosity(Verbosity::Redacted));

    let mut reference: Option<Vec<Value>> = None;
    let mut mismatched_runs = Vec::new();
    let mut violations = 0usize;

    for run in 0..runs {
        let output = match pipeline.run(note, &[]) {
            Ok(output) => output,
            Err(failure) => bail!("run {run} failed: {}", failure.error),
        };
        if let Some(debug) = &output.debug {
            for v in &debug.invariant_violations {
                violations += 1;
                tracing::warn!(run, invariant = %v.invariant, "ledger invariant violated");
                eprintln!(
                    "{} run {run}: {} ({})",
                    "violation".red().bold(),
                    v.invariant,
                    v.detail
                );
            }
        }
        let rows = canonical(&output.suggestions)?;
        if let Some(expected) = &reference {
            if *expected != rows {
                tracing::warn!(run, note_id = %note.note_id, "output differs from run 0");
                mismatched_runs.push(run);
            }
        } else {
            println!(
                "{} {} suggestions from note {}",
                "baseline".cyan().bold(),
                rows.len(),
                note.note_id.bold()
            );
            reference = Some(rows);
        }
    }

    if !mismatched_runs.is_empty() {
        eprintln!(
            "{} output differed from run 0 in runs {:?}",
            "nondeterministic".red().bold(),
            mismatched_runs
        );
    }
    if violations > 0 || !mismatched_runs.is_empty() {
        bail!(
            "check failed: {violations} invariant violations, {} nondeterministic runs",
            mismatched_runs.len()
        );
    }
    println!("{} {runs} runs identical, ledger invariants hold", "ok".green().bold());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_run_local_fields() {
        let note = NoteInput::new("n1", "# Timeline\nLaunch slipped two weeks to Q4.\n");
        let output = SuggestionPipeline::default().run(&note, &[]).unwrap();
        let rows = canonical(&output.suggestions).unwrap();
        assert_eq!(rows.len(), output.suggestions.len());
        for row in &rows {
            for field in RUN_LOCAL_FIELDS {
                assert!(row.get(*field).is_none(), "{field} kept");
            }
            assert!(row.get("title").is_some());
        }
    }

    #[test]
    fn check_passes_on_a_plain_note() {
        let note = NoteInput::new(
            "n1",
            "# Timeline\nLaunch slipped two weeks to Q4.\n\n\
             # Next Steps\nThey need to build the export API.\n",
        );
        cmd_check(PipelineConfig::default(), &note, 5).unwrap();
    }

    #[test]
    fn zero_runs_is_rejected() {
        let note = NoteInput::new("n1", "# A\n");
        assert!(cmd_check(PipelineConfig::default(), &note, 0).is_err());
    }
}
