// src/llm/mod.rs
// Model backend clients and the invocation seam

mod http_client;
mod invoker;
mod ollama;

pub use http_client::LlmHttpClient;
pub use invoker::{BackendError, ModelInvoker};
pub use ollama::OllamaClient;
