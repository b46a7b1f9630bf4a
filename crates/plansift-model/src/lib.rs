//! Core data model for plansift.
//!
//! Turns the raw text of a note into the shapes the suggestion pipeline works on:
//! - `Section`s (heading-delimited units with structural features),
//! - `Sentence`s with line provenance,
//! - `Suggestion`s with grounded `EvidenceSpan`s and a `ScoreBreakdown`.
//!
//! The section provider and title normalizer live here behind traits
//! (`SectionProvider`, `TitleNormalizer`) so the pipeline can be driven by
//! other tokenizers or title post-processors.

pub mod config;
pub mod digest;
pub mod error;
pub mod ids;
pub mod markers;
pub mod note;
pub mod section;
pub mod sentence;
pub mod suggestion;
pub mod text;
pub mod title;

pub use config::*;
pub use digest::*;
pub use error::*;
pub use ids::*;
pub use note::*;
pub use section::*;
pub use sentence::*;
pub use suggestion::*;
pub use title::*;
