// src/taxonomy.rs
// Category and model-registry value types plus the read-only store traits
// the classification pipeline consumes.

use crate::error::{MailroomError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Deepest hierarchy level the classification pipeline operates on.
/// Deeper levels may exist in storage; they are invisible to the pipeline.
pub const MAX_CLASSIFY_LEVEL: u8 = 2;

/// A node in an organization's two-level category tree.
///
/// Construct through [`Category::new`] so malformed taxonomy rows fail at the
/// storage boundary instead of leaking into prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub org_id: Uuid,
    /// Absent for level-1 nodes, required for level-2 nodes.
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    /// Ordered keyword list, embedded in prompts when `use_keywords` is set.
    pub keywords: Vec<String>,
    pub level: u8,
    pub use_keywords: bool,
    pub high_threshold: f32,
    pub medium_threshold: f32,
    pub active: bool,
}

/// Field bundle for constructing a validated [`Category`].
#[derive(Debug, Clone)]
pub struct CategoryParams {
    pub id: Uuid,
    pub org_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub level: u8,
    pub use_keywords: bool,
    pub high_threshold: f32,
    pub medium_threshold: f32,
    pub active: bool,
}

impl Category {
    /// Validate and build a category.
    ///
    /// Enforces: a non-empty name, level within the pipeline's 1..=2 range,
    /// thresholds with `0 <= medium <= high <= 1`, and parent presence
    /// matching the level (level 2 requires a parent, level 1 forbids one).
    pub fn new(params: CategoryParams) -> Result<Self> {
        if params.name.trim().is_empty() {
            return Err(MailroomError::InvalidCategory(format!(
                "category {} has an empty name",
                params.id
            )));
        }
        if params.level == 0 || params.level > MAX_CLASSIFY_LEVEL {
            return Err(MailroomError::InvalidCategory(format!(
                "category '{}' has level {}, expected 1..={}",
                params.name, params.level, MAX_CLASSIFY_LEVEL
            )));
        }
        let (high, medium) = (params.high_threshold, params.medium_threshold);
        if !(0.0..=1.0).contains(&high) || !(0.0..=1.0).contains(&medium) || medium > high {
            return Err(MailroomError::InvalidCategory(format!(
                "category '{}' has invalid thresholds (medium {}, high {})",
                params.name, medium, high
            )));
        }
        match (params.level, params.parent_id) {
            (1, Some(_)) => {
                return Err(MailroomError::InvalidCategory(format!(
                    "level-1 category '{}' must not have a parent",
                    params.name
                )));
            }
            (2, None) => {
                return Err(MailroomError::InvalidCategory(format!(
                    "level-2 category '{}' is missing its parent",
                    params.name
                )));
            }
            _ => {}
        }

        Ok(Self {
            id: params.id,
            org_id: params.org_id,
            parent_id: params.parent_id,
            name: params.name,
            description: params.description,
            keywords: params.keywords,
            level: params.level,
            use_keywords: params.use_keywords,
            high_threshold: params.high_threshold,
            medium_threshold: params.medium_threshold,
            active: params.active,
        })
    }
}

/// Model-serving backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Ollama,
}

impl Backend {
    /// Parse backend from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// A configured LLM backend in the model registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: Uuid,
    pub backend: Backend,
    /// Model name/tag as known to the serving process, e.g. "llama3.3".
    pub model: String,
    /// Whether the backend accepts raw document bytes. The text-only
    /// pipeline carries this flag but never branches on it.
    pub vision: bool,
    pub timeout_secs: u64,
    pub active: bool,
}

impl ModelDescriptor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Read-only view of an organization's category tree.
///
/// The pipeline snapshots candidate sets per level; implementations must
/// return only active categories, in a stable order.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Active level-1 categories for an organization.
    async fn level1_categories(&self, org_id: Uuid) -> Result<Vec<Category>>;

    /// Active level-2 children of a level-1 category.
    async fn level2_categories(&self, org_id: Uuid, parent_id: Uuid) -> Result<Vec<Category>>;
}

/// Read-only view of the configured model set.
#[async_trait]
pub trait ModelRegistry: Send + Sync {
    /// Active model descriptors in configured iteration order.
    ///
    /// Snapshotted once at the start of each classification run; the order
    /// returned here is the tie-break and result-reporting order.
    async fn active_models(&self) -> Result<Vec<ModelDescriptor>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> CategoryParams {
        CategoryParams {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            parent_id: None,
            name: "Garnishments".into(),
            description: "Wage and bank garnishment orders".into(),
            keywords: vec!["garnishment".into(), "levy".into()],
            level: 1,
            use_keywords: true,
            high_threshold: 0.85,
            medium_threshold: 0.6,
            active: true,
        }
    }

    #[test]
    fn test_valid_level1_category() {
        let cat = Category::new(base_params()).unwrap();
        assert_eq!(cat.level, 1);
        assert!(cat.parent_id.is_none());
    }

    #[test]
    fn test_valid_level2_category() {
        let mut params = base_params();
        params.level = 2;
        params.parent_id = Some(Uuid::new_v4());
        assert!(Category::new(params).is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut params = base_params();
        params.name = "   ".into();
        assert!(matches!(
            Category::new(params),
            Err(MailroomError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        let mut params = base_params();
        params.level = 3;
        assert!(Category::new(params).is_err());

        let mut params = base_params();
        params.level = 0;
        assert!(Category::new(params).is_err());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut params = base_params();
        params.medium_threshold = 0.9;
        params.high_threshold = 0.5;
        assert!(Category::new(params).is_err());
    }

    #[test]
    fn test_threshold_outside_unit_range_rejected() {
        let mut params = base_params();
        params.high_threshold = 1.5;
        assert!(Category::new(params).is_err());
    }

    #[test]
    fn test_level1_with_parent_rejected() {
        let mut params = base_params();
        params.parent_id = Some(Uuid::new_v4());
        assert!(Category::new(params).is_err());
    }

    #[test]
    fn test_level2_without_parent_rejected() {
        let mut params = base_params();
        params.level = 2;
        assert!(Category::new(params).is_err());
    }

    #[test]
    fn test_equal_thresholds_allowed() {
        let mut params = base_params();
        params.high_threshold = 0.7;
        params.medium_threshold = 0.7;
        assert!(Category::new(params).is_ok());
    }

    #[test]
    fn test_backend_round_trip() {
        assert_eq!(Backend::from_str("ollama"), Some(Backend::Ollama));
        assert_eq!(Backend::from_str("OLLAMA"), Some(Backend::Ollama));
        assert_eq!(Backend::from_str("vllm"), None);
        assert_eq!(Backend::Ollama.to_string(), "ollama");
    }

    #[test]
    fn test_descriptor_timeout() {
        let descriptor = ModelDescriptor {
            id: Uuid::new_v4(),
            backend: Backend::Ollama,
            model: "llama3.3".into(),
            vision: false,
            timeout_secs: 90,
            active: true,
        };
        assert_eq!(descriptor.timeout(), Duration::from_secs(90));
    }
}
