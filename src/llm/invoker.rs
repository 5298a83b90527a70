// src/llm/invoker.rs
// Model invocation seam between the pipeline and backend clients

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Infrastructure-level failure contacting a model backend.
///
/// Business-level garbage (a model answering nonsense) is not an error here;
/// it comes back as successful raw text and is the response parser's problem.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed backend payload: {0}")]
    Protocol(String),
}

/// One call to a model-serving process: prompt in, raw text out.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// Invoke `model` with a fully-substituted prompt, enforcing `timeout`.
    ///
    /// May block for up to `timeout`; implementations return raw response
    /// text on success regardless of its shape.
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, BackendError>;
}
