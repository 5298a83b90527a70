// src/llm/ollama.rs
// Ollama client via OpenAI-compatible endpoint (local model serving)

use super::http_client::LlmHttpClient;
use super::invoker::{BackendError, ModelInvoker};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalize Ollama base URL by stripping trailing slashes and /v1 suffix
fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim_end_matches('/').to_string();
    if url.ends_with("/v1") {
        url.truncate(url.len() - 3);
    }
    url
}

/// Check if a URL points to a local address (localhost, 127.0.0.1, [::1])
fn is_local_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => match parsed.host() {
            Some(url::Host::Domain(d)) => d == "localhost",
            Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
            Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
            None => true, // no host (unix socket), treat as local
        },
        Err(_) => true, // unparseable, don't warn on malformed URLs
    }
}

/// Chat completion request (OpenAI-compatible format, no auth for local Ollama)
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Non-streaming chat response (OpenAI-compatible format)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Ollama API client (OpenAI-compatible endpoint, no auth required).
///
/// One client serves every model hosted by the same Ollama process; the
/// model name travels in the request body.
pub struct OllamaClient {
    base_url: String,
    http: LlmHttpClient,
}

impl OllamaClient {
    pub fn new(base_url: String) -> Self {
        let http = LlmHttpClient::new(DEFAULT_CONNECT_TIMEOUT);
        let normalized = normalize_base_url(&base_url);

        if !is_local_url(&normalized) {
            tracing::warn!(
                "Ollama host points to non-local address '{}'. For security, consider using localhost.",
                normalized
            );
        }

        Self {
            base_url: normalized,
            http,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn extract_content(body: &str) -> Result<String, BackendError> {
        let data: ChatResponse = serde_json::from_str(body)
            .map_err(|e| BackendError::Protocol(format!("invalid chat response: {}", e)))?;

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Protocol("no content in chat response".into()))
    }
}

#[async_trait]
impl ModelInvoker for OllamaClient {
    #[instrument(skip(self, prompt), fields(model = %model, prompt_len = prompt.len()))]
    async fn invoke(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| BackendError::Protocol(format!("failed to encode request: {}", e)))?;

        let request_id = Uuid::new_v4().to_string();
        let response_body = self
            .http
            .post_json_with_retry(&request_id, &self.completions_url(), body, timeout)
            .await?;

        Self::extract_content(&response_body)
    }
}
