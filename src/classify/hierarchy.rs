// src/classify/hierarchy.rs
// Two-stage orchestration: level 1 gates which level-2 candidates exist.

use super::confidence::tier_for;
use super::ensemble::EnsembleResolver;
use super::types::{ClassificationResult, Level2Outcome, LevelOutcome, RunFailure};
use crate::error::Result;
use crate::llm::ModelInvoker;
use crate::taxonomy::{Category, ModelRegistry, TaxonomyStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// One classification request: a document's extracted text plus the
/// organization whose taxonomy applies. Collaborator state arrives here
/// explicitly; the classifier reads nothing ambient.
#[derive(Debug, Clone)]
pub struct ClassifyRequest {
    pub document_id: Uuid,
    pub org_id: Uuid,
    pub document_text: String,
}

/// Drives a document through level 1 and level 2 and assembles the result.
///
/// Stateless across documents: every run snapshots the active model set once
/// and fetches its own candidate categories, so two documents may be
/// classified concurrently against the same stores.
pub struct HierarchicalClassifier<'a> {
    taxonomy: &'a dyn TaxonomyStore,
    registry: &'a dyn ModelRegistry,
    invoker: &'a dyn ModelInvoker,
    max_concurrent: usize,
}

impl<'a> HierarchicalClassifier<'a> {
    pub fn new(
        taxonomy: &'a dyn TaxonomyStore,
        registry: &'a dyn ModelRegistry,
        invoker: &'a dyn ModelInvoker,
        max_concurrent: usize,
    ) -> Self {
        Self {
            taxonomy,
            registry,
            invoker,
            max_concurrent,
        }
    }

    /// Classify one document; never cancelled externally.
    pub async fn classify(&self, request: &ClassifyRequest) -> Result<ClassificationResult> {
        self.classify_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Classify one document, abandoning outstanding model calls when
    /// `cancel` fires. A cancelled level reads as ensemble failure, so the
    /// result shape stays uniform for callers.
    ///
    /// `Err` is reserved for infrastructure trouble (the stores); every
    /// pipeline-level failure is a typed value inside the result.
    #[instrument(skip(self, request, cancel), fields(document_id = %request.document_id, org_id = %request.org_id))]
    pub async fn classify_with_cancel(
        &self,
        request: &ClassifyRequest,
        cancel: CancellationToken,
    ) -> Result<ClassificationResult> {
        let models = self.registry.active_models().await?;
        if models.is_empty() {
            warn!("Classification refused: no active models");
            return Ok(ClassificationResult::failed(
                request.document_id,
                RunFailure::NoModels,
            ));
        }

        // Stage 1: top-level category.
        let level1_categories = self.taxonomy.level1_categories(request.org_id).await?;
        if level1_categories.is_empty() {
            warn!("Classification refused: no level-1 categories");
            return Ok(ClassificationResult::failed(
                request.document_id,
                RunFailure::NoCategories,
            ));
        }

        let resolver =
            EnsembleResolver::new(self.invoker, &models, self.max_concurrent, cancel.clone());

        let level1_outcome = match resolver
            .resolve(&level1_categories, 1, None, &request.document_text)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                info!("Level-1 ensemble failed, document stays unclassified");
                return Ok(ClassificationResult::failed(
                    request.document_id,
                    RunFailure::Level1Ensemble {
                        decisions: failure.decisions,
                    },
                ));
            }
        };

        let (winner, decisions) = level1_outcome.into_parts();
        let winner_name = winner.category.clone().unwrap_or_default();
        let Some(parent) = find_category(&level1_categories, &winner_name) else {
            warn!(winner = %winner_name, "Level-1 winner does not match any candidate");
            return Ok(ClassificationResult::failed(
                request.document_id,
                RunFailure::UnknownWinner { name: winner_name },
            ));
        };
        let parent = parent.clone();

        let level1 = LevelOutcome {
            category: parent.name.clone(),
            category_id: parent.id,
            confidence: winner.confidence,
            tier: tier_for(&parent, winner.confidence),
            reasoning: winner.reasoning.clone(),
            decisions,
        };
        info!(
            category = %level1.category,
            confidence = level1.confidence,
            tier = %level1.tier,
            "Level-1 classification complete"
        );

        // Stage 2: children of the winning category, if it has any.
        let level2 = self.classify_level2(request, &resolver, &parent).await?;

        Ok(ClassificationResult::classified(
            request.document_id,
            level1,
            level2,
        ))
    }

    async fn classify_level2(
        &self,
        request: &ClassifyRequest,
        resolver: &EnsembleResolver<'_>,
        parent: &Category,
    ) -> Result<Level2Outcome> {
        let children = self
            .taxonomy
            .level2_categories(request.org_id, parent.id)
            .await?;
        if children.is_empty() {
            info!(parent = %parent.name, "Level-1 winner is a leaf, no subcategorization");
            return Ok(Level2Outcome::NotApplicable);
        }

        match resolver
            .resolve(&children, 2, Some(&parent.name), &request.document_text)
            .await
        {
            Ok(outcome) => {
                let (winner, decisions) = outcome.into_parts();
                let winner_name = winner.category.clone().unwrap_or_default();
                let Some(child) = find_category(&children, &winner_name) else {
                    warn!(winner = %winner_name, "Level-2 winner does not match any candidate");
                    return Ok(Level2Outcome::Failed {
                        reason: format!("level-2 winner \"{winner_name}\" is not a known category"),
                        decisions,
                    });
                };
                let outcome = LevelOutcome {
                    category: child.name.clone(),
                    category_id: child.id,
                    confidence: winner.confidence,
                    tier: tier_for(child, winner.confidence),
                    reasoning: winner.reasoning,
                    decisions,
                };
                info!(
                    category = %outcome.category,
                    confidence = outcome.confidence,
                    tier = %outcome.tier,
                    "Level-2 classification complete"
                );
                Ok(Level2Outcome::Classified(outcome))
            }
            Err(failure) => {
                // Partial success: level 1 stands, subcategorization degrades.
                info!(parent = %parent.name, "Level-2 ensemble failed, keeping level-1 result");
                Ok(Level2Outcome::Failed {
                    reason: "all level-2 attempts failed".into(),
                    decisions: failure.decisions,
                })
            }
        }
    }
}

/// Match a winning category name back to its candidate, tolerating the case
/// and whitespace drift local models introduce.
fn find_category<'c>(categories: &'c [Category], name: &str) -> Option<&'c Category> {
    let needle = name.trim();
    categories
        .iter()
        .find(|c| c.name == needle)
        .or_else(|| {
            categories
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(needle))
        })
}
