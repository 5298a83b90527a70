// src/classify/types.rs
// Decision and result types handed back to the calling application

use super::confidence::ConfidenceTier;
use super::parser::ParsedDecision;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One model's answer to one classification question.
///
/// Produced per (document, level, model); failures are values here, never
/// errors, so a single bad model cannot abort an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDecision {
    pub category: Option<String>,
    /// 0.0 on failure; otherwise as reported by the model, unclamped.
    pub confidence: f32,
    pub reasoning: String,
    pub model: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ClassificationDecision {
    pub fn succeeded(model: &str, parsed: ParsedDecision) -> Self {
        Self {
            category: Some(parsed.category),
            confidence: parsed.confidence,
            reasoning: parsed.reasoning,
            model: model.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(model: &str, error: String) -> Self {
        Self {
            category: None,
            confidence: 0.0,
            reasoning: String::new(),
            model: model.to_string(),
            success: false,
            error: Some(error),
        }
    }
}

/// Winning decision for one hierarchy level, with the full decision set
/// preserved in configured model order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelOutcome {
    pub category: String,
    pub category_id: Uuid,
    pub confidence: f32,
    pub tier: ConfidenceTier,
    pub reasoning: String,
    pub decisions: Vec<ClassificationDecision>,
}

/// Terminal state of the level-2 stage.
///
/// `NotApplicable` (the level-1 winner has no active children) and `Failed`
/// (children existed but every model failed) are deliberately distinct: the
/// first is a leaf category, the second a degraded run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Level2Outcome {
    Classified(LevelOutcome),
    NotApplicable,
    Failed {
        reason: String,
        decisions: Vec<ClassificationDecision>,
    },
}

/// Why a run produced no level-1 category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailure {
    /// No active level-1 categories configured for the organization.
    NoCategories,
    /// No active models in the registry.
    NoModels,
    /// Every model failed at level 1.
    Level1Ensemble {
        decisions: Vec<ClassificationDecision>,
    },
    /// The winning category name did not match any candidate.
    UnknownWinner { name: String },
}

impl RunFailure {
    pub fn reason(&self) -> String {
        match self {
            Self::NoCategories => "no level-1 categories configured".into(),
            Self::NoModels => "no active models configured".into(),
            Self::Level1Ensemble { .. } => "all level-1 attempts failed".into(),
            Self::UnknownWinner { name } => {
                format!("level-1 winner \"{name}\" is not a known category")
            }
        }
    }
}

/// The pipeline's output for one document. Constructed fresh per run; the
/// caller owns persistence and any override workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_id: Uuid,
    /// Present whenever level 1 produced a winner.
    pub level1: Option<LevelOutcome>,
    /// Present whenever level 2 was attempted or skipped as a leaf;
    /// `None` only when level 1 itself failed.
    pub level2: Option<Level2Outcome>,
    pub error: Option<RunFailure>,
}

impl ClassificationResult {
    pub fn classified(document_id: Uuid, level1: LevelOutcome, level2: Level2Outcome) -> Self {
        Self {
            document_id,
            level1: Some(level1),
            level2: Some(level2),
            error: None,
        }
    }

    pub fn failed(document_id: Uuid, failure: RunFailure) -> Self {
        Self {
            document_id,
            level1: None,
            level2: None,
            error: Some(failure),
        }
    }

    pub fn is_classified(&self) -> bool {
        self.level1.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_decision_defaults() {
        let decision = ClassificationDecision::failed("llama3.3", "timeout".into());
        assert!(!decision.success);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.category, None);
        assert_eq!(decision.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_succeeded_decision() {
        let parsed = ParsedDecision {
            category: "Service".into(),
            confidence: 0.8,
            reasoning: "Summons attached.".into(),
        };
        let decision = ClassificationDecision::succeeded("mistral", parsed);
        assert!(decision.success);
        assert_eq!(decision.category.as_deref(), Some("Service"));
        assert!(decision.error.is_none());
    }

    #[test]
    fn test_run_failure_reasons() {
        assert_eq!(
            RunFailure::NoCategories.reason(),
            "no level-1 categories configured"
        );
        assert_eq!(
            RunFailure::Level1Ensemble { decisions: vec![] }.reason(),
            "all level-1 attempts failed"
        );
        assert!(
            RunFailure::UnknownWinner {
                name: "Misc".into()
            }
            .reason()
            .contains("Misc")
        );
    }

    #[test]
    fn test_result_shape_invariants() {
        let failed = ClassificationResult::failed(Uuid::new_v4(), RunFailure::NoModels);
        assert!(!failed.is_classified());
        assert!(failed.level1.is_none() && failed.level2.is_none());

        let serialized = serde_json::to_string(&failed).unwrap();
        let back: ClassificationResult = serde_json::from_str(&serialized).unwrap();
        assert_eq!(back, failed);
    }
}
