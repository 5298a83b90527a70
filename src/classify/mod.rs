// src/classify/mod.rs
// The multi-model categorization pipeline

pub mod confidence;
pub mod ensemble;
pub mod hierarchy;
pub mod parser;
pub mod prompt;
pub mod types;

pub use confidence::{ConfidenceTier, tier, tier_for};
pub use ensemble::{EnsembleFailure, EnsembleOutcome, EnsembleResolver};
pub use hierarchy::{ClassifyRequest, HierarchicalClassifier};
pub use parser::{ParseError, ParsedDecision, parse_decision};
pub use prompt::{DOCUMENT_PLACEHOLDER, build_prompt, substitute_document};
pub use types::{
    ClassificationDecision, ClassificationResult, Level2Outcome, LevelOutcome, RunFailure,
};
