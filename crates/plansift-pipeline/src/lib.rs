//! The plansift decision pipeline.
//!
//! A note flows through these stages, strictly in order:
//!
//! 1. sectioning (`plansift_model::SectionProvider`)
//! 2. classification and topic isolation (`classifier`, `synthesis::topic`)
//! 3. signal extraction (`signals`)
//! 4. synthesis: signal candidates, the named filter chain, consolidation and
//!    fallbacks (`synthesis`)
//! 5. validation gates (`validation`)
//! 6. scoring and thresholds (`scoring`)
//! 7. routing, fingerprint dedup and the suggestion cap (`routing`)
//!
//! Every stage reports its decisions to a `ledger::PipelineObserver`. The
//! observer never feeds back into a decision; with verbosity `off` it is a no-op.

pub mod classifier;
pub mod ledger;
pub mod lexicon;
pub mod outcome;
pub mod pipeline;
pub mod routing;
pub mod scoring;
pub mod signals;
pub mod synthesis;
pub mod validation;

pub use classifier::{
    Actionability, ClassifiedSection, IntentLabel, IntentScores, SectionClassifier,
};
pub use ledger::{DebugLedger, DebugRun, NoopObserver, PipelineObserver};
pub use outcome::{DropReason, DropStage};
pub use pipeline::{PipelineFailure, PipelineOutput, SuggestionPipeline};
pub use signals::{Signal, SignalExtractor, SignalType};

/// Recorded in every `DebugRun`.
pub const GENERATOR_VERSION: &str = concat!("plansift/", env!("CARGO_PKG_VERSION"));
