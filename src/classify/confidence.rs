// src/classify/confidence.rs
// Discrete confidence tiers from per-category thresholds

use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete confidence bucket for a winning decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a numeric confidence onto a tier. Thresholds are inclusive:
/// `confidence >= high` is High, else `>= medium` is Medium, else Low.
///
/// The confidence is compared as reported by the model, without clamping to
/// [0, 1]; out-of-range values tier accordingly.
pub fn tier(confidence: f32, high_threshold: f32, medium_threshold: f32) -> ConfidenceTier {
    if confidence >= high_threshold {
        ConfidenceTier::High
    } else if confidence >= medium_threshold {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

/// Tier a confidence against a category's configured thresholds.
/// Different categories carry different risk tolerances, so the thresholds
/// always come from the winning category, never a global constant.
pub fn tier_for(category: &Category, confidence: f32) -> ConfidenceTier {
    tier(
        confidence,
        category.high_threshold,
        category.medium_threshold,
    )
}
