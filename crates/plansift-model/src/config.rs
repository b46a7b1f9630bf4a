//! Pipeline configuration.
//!
//! Every field has a documented default and `#[serde(default)]`, so a partial
//! JSON file only needs to name the values it overrides. The upper-case names
//! (`T_action`, `MIN_EVIDENCE_CHARS`, ...) are accepted as aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::{ConfigError, PipelineError};

/// How much of the run is recorded in the debug ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No ledger at all.
    #[default]
    Off,
    /// Previews and line ranges only; free text is redacted before storage.
    Redacted,
    /// Raw text is kept. The caller is responsible for keeping this out of production.
    FullText,
}

impl Verbosity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Redacted => "redacted",
            Verbosity::FullText => "full_text",
        }
    }

    pub const fn is_enabled(self) -> bool {
        !matches!(self, Verbosity::Off)
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verbosity {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "off" | "none" => Ok(Verbosity::Off),
            "redacted" => Ok(Verbosity::Redacted),
            "full_text" | "full" => Ok(Verbosity::FullText),
            other => Err(PipelineError::invalid_config(
                "verbosity",
                format!("unknown verbosity `{other}` (expected off, redacted or full_text)"),
            )),
        }
    }
}

pub const DEFAULT_T_ACTION: f64 = 0.5;
pub const DEFAULT_T_OUT_OF_SCOPE: f64 = 0.6;
pub const DEFAULT_T_SECTION_MIN: f64 = 0.2;
pub const DEFAULT_T_OVERALL_MIN: f64 = 0.55;
pub const DEFAULT_MIN_EVIDENCE_CHARS: usize = 12;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;
pub const DEFAULT_MAX_NOTE_CHARS: usize = 200_000;
pub const DEFAULT_ROUTE_SIMILARITY: f64 = 0.5;

/// Options record for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum `max(plan_change, new_workstream)` for a section to be actionable.
    #[serde(alias = "T_action")]
    pub t_action: f64,
    /// A section whose `max(calendar, communication, micro_tasks)` reaches this is out of scope.
    #[serde(alias = "T_out_of_scope")]
    pub t_out_of_scope: f64,
    /// Minimum top-label intent score for a section to be considered relevant at all.
    #[serde(alias = "T_section_min")]
    pub t_section_min: f64,
    /// Minimum overall score for a candidate to be emitted.
    #[serde(alias = "T_overall_min")]
    pub t_overall_min: f64,
    /// Evidence shorter than this (non-whitespace characters) is vacuous.
    #[serde(alias = "MIN_EVIDENCE_CHARS")]
    pub min_evidence_chars: usize,
    /// Upper bound on emitted suggestions per note.
    pub max_suggestions: usize,
    /// Notes longer than this are rejected as caller input errors.
    pub max_note_chars: usize,
    /// Token-overlap needed to attach a suggestion to an existing plan item.
    pub route_similarity_threshold: f64,
    /// Ledger verbosity.
    pub verbosity: Verbosity,
    /// Shorthand for "record a redacted ledger" when `verbosity` is `off`.
    pub debug_enabled: bool,
    /// Request external intent classifiers (none are bundled; rule-based path is used).
    pub use_external_classifiers: bool,
    /// Request embedding-based routing (none are bundled; token overlap is used).
    pub embeddings_enabled: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            t_action: DEFAULT_T_ACTION,
            t_out_of_scope: DEFAULT_T_OUT_OF_SCOPE,
            t_section_min: DEFAULT_T_SECTION_MIN,
            t_overall_min: DEFAULT_T_OVERALL_MIN,
            min_evidence_chars: DEFAULT_MIN_EVIDENCE_CHARS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            max_note_chars: DEFAULT_MAX_NOTE_CHARS,
            route_similarity_threshold: DEFAULT_ROUTE_SIMILARITY,
            verbosity: Verbosity::Off,
            debug_enabled: false,
            use_external_classifiers: false,
            embeddings_enabled: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_suggestions(mut self, n: usize) -> Self {
        self.max_suggestions = n;
        self
    }

    /// Verbosity after applying the `debug_enabled` shorthand.
    pub fn effective_verbosity(&self) -> Verbosity {
        match (self.verbosity, self.debug_enabled) {
            (Verbosity::Off, true) => Verbosity::Redacted,
            (v, _) => v,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let unit = [
            ("t_action", self.t_action),
            ("t_out_of_scope", self.t_out_of_scope),
            ("t_section_min", self.t_section_min),
            ("t_overall_min", self.t_overall_min),
            ("route_similarity_threshold", self.route_similarity_threshold),
        ];
        for (field, value) in unit {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::invalid_config(
                    field,
                    format!("must be within [0, 1], got {value}"),
                ));
            }
        }
        if self.max_suggestions == 0 {
            return Err(PipelineError::invalid_config(
                "max_suggestions",
                "must be at least 1",
            ));
        }
        if self.min_evidence_chars > 500 {
            return Err(PipelineError::invalid_config(
                "min_evidence_chars",
                format!("must be at most 500, got {}", self.min_evidence_chars),
            ));
        }
        if self.max_note_chars == 0 {
            return Err(PipelineError::invalid_config(
                "max_note_chars",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
