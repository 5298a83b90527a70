// src/llm/http_client.rs
// Shared HTTP client for model backends, with bounded retry

use super::invoker::BackendError;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::warn;

/// Default maximum retry attempts for transient failures
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default base backoff duration between retries (doubles each attempt)
const DEFAULT_BASE_BACKOFF_MS: u64 = 250;

/// HTTP client wrapper shared by all backend clients.
///
/// The overall request timeout is supplied per call because each configured
/// model carries its own timeout; only the connect timeout is fixed here.
pub struct LlmHttpClient {
    client: Client,
    pub connect_timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl LlmHttpClient {
    pub fn new(connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            connect_timeout,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
        }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// POST a JSON body and return the response body as text.
    ///
    /// Retries 429/5xx responses and connection failures with exponential
    /// backoff. `timeout` bounds the whole call, retries and backoff
    /// included: each attempt runs against the remaining budget, and a retry
    /// is skipped when its backoff would not fit.
    pub async fn post_json_with_retry(
        &self,
        request_id: &str,
        url: &str,
        body: String,
        timeout: Duration,
    ) -> Result<String, BackendError> {
        let started = Instant::now();
        let mut attempts = 0;
        let mut backoff = self.base_backoff;

        loop {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(BackendError::Timeout(timeout));
            }

            let response_result = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .timeout(remaining)
                .body(body.clone())
                .send()
                .await;

            match response_result {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        let error_body = response.text().await.unwrap_or_default();

                        if attempts < self.max_attempts
                            && (status.as_u16() == 429 || status.is_server_error())
                            && backoff < timeout.saturating_sub(started.elapsed())
                        {
                            warn!(
                                request_id = %request_id,
                                status = %status,
                                error = %error_body,
                                "Transient backend error, retrying in {:?}...",
                                backoff
                            );
                            tokio::time::sleep(backoff).await;
                            attempts += 1;
                            backoff *= 2;
                            continue;
                        }

                        return Err(BackendError::Status {
                            status: status.as_u16(),
                            body: error_body,
                        });
                    }

                    return response
                        .text()
                        .await
                        .map_err(|e| BackendError::Protocol(e.to_string()));
                }
                Err(e) if e.is_timeout() => {
                    return Err(BackendError::Timeout(timeout));
                }
                Err(e) => {
                    if attempts < self.max_attempts
                        && e.is_connect()
                        && backoff < timeout.saturating_sub(started.elapsed())
                    {
                        warn!(
                            request_id = %request_id,
                            error = %e,
                            "Connection failed, retrying in {:?}...",
                            backoff
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        backoff *= 2;
                        continue;
                    }
                    return Err(BackendError::Connect(e.to_string()));
                }
            }
        }
    }
}
