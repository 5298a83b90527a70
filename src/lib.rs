// src/lib.rs
// mailroom - multi-model categorization pipeline for scanned-mail intake
//
// Extracted document text goes in; a two-level category decision with a
// confidence tier comes out. An ensemble of local models answers each
// classification question, and the level-1 winner gates which level-2
// candidates are even considered.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod taxonomy;

pub use classify::{
    ClassificationDecision, ClassificationResult, ClassifyRequest, ConfidenceTier,
    HierarchicalClassifier, Level2Outcome, LevelOutcome, RunFailure,
};
pub use error::{MailroomError, Result};
pub use taxonomy::{Category, ModelDescriptor, ModelRegistry, TaxonomyStore};
