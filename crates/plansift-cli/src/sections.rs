use anyhow::{anyhow, Result};
use colored::Colorize;
use plansift_model::{NoteInput, PipelineConfig, Verbosity};
use plansift_pipeline::ledger::SectionDebug;
use plansift_pipeline::SuggestionPipeline;

const HEADING_WIDTH: usize = 32;

fn outcome(section: &SectionDebug) -> String {
    if section.emitted {
        return format!("{} emitted", section.emitted_count).green().to_string();
    }
    match section.drop {
        Some(drop) if section.is_split() => {
            format!("{}/{}", drop.stage, drop.reason).cyan().to_string()
        }
        Some(drop) => format!("{}/{}", drop.stage, drop.reason).yellow().to_string(),
        None => "-".dimmed().to_string(),
    }
}

fn heading_cell(section: &SectionDebug) -> String {
    let heading = section.heading.as_deref().unwrap_or("");
    let indent = if section.parent_id.is_some() { "  " } else { "" };
    let text: String = format!("{indent}{heading}").chars().take(HEADING_WIDTH).collect();
    format!("{text:<HEADING_WIDTH$}")
}

/// One row per section, children indented under their split parent.
pub fn print_sections(config: PipelineConfig, note: &NoteInput) -> Result<()> {
    let pipeline = SuggestionPipeline::new(config.with_verbosity(Verbosity::FullText));
    let output = pipeline
        .run(note, &[])
        .map_err(|failure| anyhow!(failure.error))?;
    let debug = output
        .debug
        .ok_or_else(|| anyhow!("pipeline returned no ledger"))?;

    println!(
        "{:<8} {:<9} {:<HEADING_WIDTH$} {:<22} {:>5} {:<10} {}",
        "id".bold(),
        "lines".bold(),
        "heading".bold(),
        "label".bold(),
        "score".bold(),
        "actionable".bold(),
        "outcome".bold()
    );
    for section in &debug.sections {
        let label = section.top_label.map(|l| l.as_str()).unwrap_or("-");
        let actionable = match &section.actionability {
            Some(a) if a.overridden => "override".magenta().to_string(),
            Some(a) if a.actionable => "yes".green().to_string(),
            Some(_) => "no".red().to_string(),
            None => "-".to_string(),
        };
        println!(
            "{:<8} {:<9} {} {:<22} {:>5.2} {:<10} {}",
            section.section_id.as_str(),
            format!("{}-{}", section.start_line, section.end_line),
            heading_cell(section),
            label,
            section.top_score,
            actionable,
            outcome(section)
        );
    }

    let summary = debug.summary();
    if !summary.is_empty() {
        println!();
        for (key, count) in summary {
            println!("  {:<44} {count}", key);
        }
    }
    Ok(())
}
