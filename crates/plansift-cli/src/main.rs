//! plansift CLI
//!
//! - `run`: turn a note into suggestions (JSON on stdout, optional debug ledger)
//! - `sections`: show how each section was classified and what it produced
//! - `check`: re-run a note and verify determinism plus ledger invariants

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use plansift_model::{ExistingPlanItem, NoteInput, PipelineConfig, Verbosity};
use plansift_pipeline::SuggestionPipeline;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod check;
mod sections;

#[derive(Parser)]
#[command(name = "plansift")]
#[command(
    author,
    version,
    about = "plansift: evidence-grounded plan suggestions from meeting notes"
)]
struct Cli {
    /// Pipeline config (JSON). Missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on a note and print `{ suggestions, debug_run? }` as JSON.
    Run {
        /// Note file (`-` for stdin)
        input: PathBuf,

        /// Note id (defaults to the file stem)
        #[arg(long)]
        note_id: Option<String>,

        /// Existing plan items (JSON array of `{ "id", "title" }`) to route against
        #[arg(long)]
        plan_items: Option<PathBuf>,

        /// Ledger verbosity: off, redacted, full_text
        #[arg(long)]
        verbosity: Option<Verbosity>,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print a per-section classification table.
    Sections {
        /// Note file (`-` for stdin)
        input: PathBuf,
    },

    /// Re-run a note and verify determinism and ledger invariants.
    Check {
        /// Note file (`-` for stdin)
        input: PathBuf,

        /// Number of runs to compare
        #[arg(long, default_value_t = 30)]
        runs: usize,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("PLANSIFT_LOG").unwrap_or_else(|_| EnvFilter::new("plansift=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            note_id,
            plan_items,
            verbosity,
            out,
        } => {
            let config = match verbosity {
                Some(v) => config.with_verbosity(v),
                None => config,
            };
            let note = read_note(&input, note_id)?;
            let items = match plan_items {
                Some(path) => load_plan_items(&path)?,
                None => Vec::new(),
            };
            cmd_run(config, &note, &items, out.as_deref())
        }
        Commands::Sections { input } => {
            let note = read_note(&input, None)?;
            sections::print_sections(config, &note)
        }
        Commands::Check { input, runs } => {
            let note = read_note(&input, None)?;
            check::cmd_check(config, &note, runs)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            PipelineConfig::from_path(path)
                .with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_note(input: &Path, note_id: Option<String>) -> Result<NoteInput> {
    let raw_text = if input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading note from stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("reading note {}", input.display()))?
    };
    let note_id = note_id
        .or_else(|| {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .filter(|s| s != "-")
        })
        .unwrap_or_else(|| "stdin".to_string());
    tracing::debug!(%note_id, chars = raw_text.chars().count(), "note read");
    Ok(NoteInput::new(note_id, raw_text))
}

fn load_plan_items(path: &Path) -> Result<Vec<ExistingPlanItem>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading plan items {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing plan items {}", path.display()))
}

fn write_json(value: &serde_json::Value, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} {}", "wrote".green().bold(), path.display().to_string().bold());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_run(
    config: PipelineConfig,
    note: &NoteInput,
    items: &[ExistingPlanItem],
    out: Option<&Path>,
) -> Result<()> {
    let pipeline = SuggestionPipeline::new(config);
    match pipeline.run(note, items) {
        Ok(output) => {
            let mut value = serde_json::json!({ "suggestions": output.suggestions });
            if let Some(debug) = output.debug {
                value["debug_run"] = serde_json::to_value(debug)?;
            }
            write_json(&value, out)
        }
        Err(failure) => {
            tracing::error!(note_id = %note.note_id, error = %failure.error, "pipeline run failed");
            // The audit record of a failed run is still worth keeping.
            if let Some(debug) = &failure.debug {
                let value = serde_json::json!({
                    "error": failure.error.to_string(),
                    "debug_run": debug,
                });
                write_json(&value, out)?;
            }
            Err(anyhow::Error::new(failure.error)
                .context(format!("processing note {}", note.note_id)))
        }
    }
}
