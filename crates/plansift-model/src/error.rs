//! Error types shared by the model and pipeline crates.
//!
//! Gate failures (a candidate not meeting a threshold, a section that is not
//! actionable) are *not* errors: they are recorded as stage/reason pairs. The
//! variants here cover caller input errors and global failures only.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The note itself is malformed (empty id, oversized, control bytes).
    #[error("invalid note: {reason}")]
    InvalidNote { reason: String },

    /// A config value is outside its documented range.
    #[error("invalid config field `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// The section provider could not split the note.
    #[error("section provider failed: {message}")]
    Section { message: String },

    /// An unexpected failure escaped a stage.
    #[error("internal error during {stage}: {message}")]
    Internal { stage: String, message: String },
}

impl PipelineError {
    pub fn invalid_note(reason: impl Into<String>) -> Self {
        PipelineError::InvalidNote {
            reason: reason.into(),
        }
    }

    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    pub fn internal(stage: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Internal {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Caller input errors are reported before any stage runs.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidNote { .. } | PipelineError::InvalidConfig { .. }
        )
    }
}

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] PipelineError),
}
