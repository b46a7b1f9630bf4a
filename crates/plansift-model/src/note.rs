use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// A note submitted to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInput {
    pub note_id: String,
    pub raw_text: String,
}

impl NoteInput {
    pub fn new(note_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            raw_text: raw_text.into(),
        }
    }

    /// Fail-fast input checks, run before any stage.
    pub fn validate(&self, max_chars: usize) -> Result<(), PipelineError> {
        if self.note_id.trim().is_empty() {
            return Err(PipelineError::invalid_note("note id is empty"));
        }
        if self.note_id.chars().any(char::is_control) {
            return Err(PipelineError::invalid_note(
                "note id contains control characters",
            ));
        }
        let chars = self.raw_text.chars().count();
        if chars > max_chars {
            return Err(PipelineError::invalid_note(format!(
                "note is {chars} chars, limit is {max_chars}"
            )));
        }
        if let Some(pos) = self
            .raw_text
            .chars()
            .position(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
        {
            return Err(PipelineError::invalid_note(format!(
                "control character at char offset {pos}"
            )));
        }
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.raw_text.lines().count()
    }
}

/// A plan item a suggestion may be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingPlanItem {
    pub id: String,
    pub title: String,
}

impl ExistingPlanItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_note() {
        let note = NoteInput::new("n1", "# Plan\n\tship it\r\n");
        assert!(note.validate(1000).is_ok());
        assert_eq!(note.line_count(), 2);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(NoteInput::new("  ", "text").validate(100).is_err());
        assert!(NoteInput::new("n1", "x".repeat(11)).validate(10).is_err());

        let err = NoteInput::new("n1", "bad\u{0}byte").validate(100).unwrap_err();
        assert!(err.is_input_error());
        assert!(err.to_string().contains("offset 3"));
    }

    #[test]
    fn empty_text_is_valid_input() {
        assert!(NoteInput::new("n1", "").validate(10).is_ok());
    }
}
