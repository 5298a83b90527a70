// src/classify/ensemble.rs
// Fan the same classification question out across every active model and
// pick the winning decision.

use super::parser::parse_decision;
use super::prompt::{build_prompt, substitute_document};
use super::types::ClassificationDecision;
use crate::llm::ModelInvoker;
use crate::taxonomy::{Category, ModelDescriptor};
use futures::StreamExt;
use futures::stream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Every model at a level failed (backend error, parse error, or
/// cancellation). The failed decision set is kept for diagnostics.
#[derive(Debug, Error)]
#[error("all model attempts failed at level {level}")]
pub struct EnsembleFailure {
    pub level: u8,
    pub decisions: Vec<ClassificationDecision>,
}

/// Per-model decisions in configured model order, plus the winner's index.
#[derive(Debug)]
pub struct EnsembleOutcome {
    pub decisions: Vec<ClassificationDecision>,
    winner: usize,
}

impl EnsembleOutcome {
    pub fn winner(&self) -> &ClassificationDecision {
        &self.decisions[self.winner]
    }

    /// Consume the outcome, returning the winner and the full decision set.
    pub fn into_parts(self) -> (ClassificationDecision, Vec<ClassificationDecision>) {
        let winner = self.decisions[self.winner].clone();
        (winner, self.decisions)
    }
}

/// Runs one classification question across the active model set.
pub struct EnsembleResolver<'a> {
    invoker: &'a dyn ModelInvoker,
    models: &'a [ModelDescriptor],
    max_concurrent: usize,
    cancel: CancellationToken,
}

impl<'a> EnsembleResolver<'a> {
    pub fn new(
        invoker: &'a dyn ModelInvoker,
        models: &'a [ModelDescriptor],
        max_concurrent: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            invoker,
            models,
            max_concurrent: max_concurrent.max(1),
            cancel,
        }
    }

    /// Classify `document_text` against `categories` at `level`, one attempt
    /// per model, concurrently. Decisions come back in configured model
    /// order regardless of which call finished first.
    ///
    /// Winner: highest reported confidence among successes, ties going to
    /// the earliest model in configured order. Zero successes is a typed
    /// [`EnsembleFailure`], never a fallback category.
    pub async fn resolve(
        &self,
        categories: &[Category],
        level: u8,
        parent_name: Option<&str>,
        document_text: &str,
    ) -> Result<EnsembleOutcome, EnsembleFailure> {
        if self.cancel.is_cancelled() {
            return Err(EnsembleFailure {
                level,
                decisions: Vec::new(),
            });
        }

        let template = build_prompt(categories, level, parent_name);
        let prompt = substitute_document(&template, document_text);

        let tasks = self.models.iter().enumerate().map(|(i, descriptor)| {
            let prompt = &prompt;
            let cancel = self.cancel.clone();
            async move {
                let decision = self.run_model(descriptor, prompt, cancel).await;
                (i, decision)
            }
        });

        let mut indexed: Vec<(usize, ClassificationDecision)> = stream::iter(tasks)
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        indexed.sort_by_key(|(i, _)| *i);
        let decisions: Vec<ClassificationDecision> =
            indexed.into_iter().map(|(_, d)| d).collect();

        // A cancelled run never yields a winner, even if some calls finished
        // before the token flipped.
        if self.cancel.is_cancelled() {
            debug!(level, "Ensemble cancelled");
            return Err(EnsembleFailure { level, decisions });
        }

        let successes = decisions.iter().filter(|d| d.success).count();
        info!(
            level,
            successes,
            failures = decisions.len() - successes,
            "Ensemble complete"
        );

        match select_winner(&decisions) {
            Some(winner) => Ok(EnsembleOutcome { decisions, winner }),
            None => Err(EnsembleFailure { level, decisions }),
        }
    }

    /// One model's invoke + parse, with failures absorbed into the decision.
    async fn run_model(
        &self,
        descriptor: &ModelDescriptor,
        prompt: &str,
        cancel: CancellationToken,
    ) -> ClassificationDecision {
        let timeout = descriptor.timeout();
        let call = self.invoker.invoke(&descriptor.model, prompt, timeout);

        let raw = tokio::select! {
            _ = cancel.cancelled() => {
                return ClassificationDecision::failed(&descriptor.model, "cancelled".into());
            }
            outcome = tokio::time::timeout(timeout, call) => match outcome {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    warn!(model = %descriptor.model, error = %e, "Model backend failed");
                    return ClassificationDecision::failed(&descriptor.model, e.to_string());
                }
                Err(_) => {
                    warn!(model = %descriptor.model, ?timeout, "Model call timed out");
                    return ClassificationDecision::failed(
                        &descriptor.model,
                        format!("timed out after {}s", timeout.as_secs()),
                    );
                }
            },
        };

        match parse_decision(&raw) {
            Ok(parsed) => {
                debug!(
                    model = %descriptor.model,
                    category = %parsed.category,
                    confidence = parsed.confidence,
                    "Model decision parsed"
                );
                ClassificationDecision::succeeded(&descriptor.model, parsed)
            }
            Err(e) => {
                warn!(model = %descriptor.model, error = %e, "Model response unparseable");
                ClassificationDecision::failed(&descriptor.model, e.to_string())
            }
        }
    }
}

/// Index of the winning decision: highest confidence among successes, first
/// in model order on ties. None when nothing succeeded.
fn select_winner(decisions: &[ClassificationDecision]) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (i, decision) in decisions.iter().enumerate() {
        if !decision.success {
            continue;
        }
        match winner {
            Some(w) if decisions[w].confidence >= decision.confidence => {}
            _ => winner = Some(i),
        }
    }
    winner
}
