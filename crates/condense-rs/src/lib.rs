//! Hierarchical document summarization workflows for long documents.
//!
//! `condense-rs` reduces an arbitrarily long document into a bounded-length
//! natural-language summary that fits a downstream model's context window,
//! without losing section-level detail. The core abstraction is the
//! [`Workflow`](workflow::Workflow) — a tagged-state dispatch loop that runs
//! one of two paths:
//!
//! - **Executive** — load the full rendered document and synthesize a
//!   one-page summary in a single pass.
//! - **Detailed** — retrieve the document's stored fragments, split them
//!   into token-budgeted sub-chunks, summarize every sub-chunk concurrently
//!   (map), merge each chunk's sub-summaries (reduce), and — when the
//!   accumulated summaries still exceed the final context budget — collapse
//!   chunks into coarser section groups and re-reduce, at most three times,
//!   before synthesizing the final summary.
//!
//! Every completion call in the process draws from one shared token-bucket
//! [`RateLimiter`](api::RateLimiter), so concurrent fan-outs and unrelated
//! workflow runs share a single outbound-request budget.
//!
//! # Getting started
//!
//! ```ignore
//! use condense_rs::api::{LimiterConfig, RateLimiter};
//! use condense_rs::sources::FsDocumentStore;
//! use condense_rs::workflow::{DocumentState, SummaryKind, Workflow, WorkflowConfig};
//! use condense_rs::CompletionClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = WorkflowConfig::default();
//!     let limiter = Arc::new(RateLimiter::new(config.limiter_config()));
//!     let client = CompletionClient::new(api_key, limiter).unwrap();
//!     let store = FsDocumentStore::new("./documents");
//!
//!     let state = DocumentState::new("acme", "rfp-2024", SummaryKind::Detailed)
//!         .with_user_query(Some("Focus on budgets and deadlines.".into()));
//!
//!     let final_state = Workflow::new(&client, &store, &store, config)
//!         .run(state)
//!         .await;
//!
//!     match (final_state.final_summary, final_state.error) {
//!         (Some(summary), _) => println!("{summary}"),
//!         (_, Some(error)) => eprintln!("failed: {error}"),
//!         _ => unreachable!("workflow terminates with a summary or an error"),
//!     }
//! }
//! ```
//!
//! # Where to find things
//!
//! If you're looking for how to...
//!
//! - **Run a summarization:** see [`Workflow`](workflow::Workflow),
//!   [`DocumentState`](workflow::DocumentState), and
//!   [`WorkflowConfig`](workflow::WorkflowConfig).
//! - **Observe progress:** implement
//!   [`EventHandler`](workflow::EventHandler) — every node completion is
//!   reported with a stage name and progress percentage, ready to be
//!   persisted by a task-queue driver. [`LoggingHandler`](workflow::LoggingHandler)
//!   routes events through `tracing`.
//! - **Plug in document/fragment storage:** implement the
//!   [`DocumentStore`](sources::DocumentStore) and
//!   [`FragmentStore`](sources::FragmentStore) seams, or use the bundled
//!   [`FsDocumentStore`](sources::FsDocumentStore) for local markdown.
//! - **Swap the model backend:** implement [`Completion`] — the workflow
//!   only needs `complete(request) -> text`. The bundled
//!   [`CompletionClient`] speaks the OpenAI-compatible chat-completions
//!   protocol behind the shared rate limiter.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`workflow`] | State machine, chunk data model, map/reduce/collapse stages, config, events |
//! | [`api`] | Shared token-bucket rate limiter |
//! | [`sources`] | Document/fragment store seams and the filesystem store |
//! | [`error`] | [`SummarizeError`] taxonomy |
//!
//! # Design principles
//!
//! 1. **Bounded by construction.** The collapse cycle is driven by a
//!    four-level enum that only moves forward, so every run terminates in a
//!    bounded number of stages regardless of document size.
//!
//! 2. **All-or-nothing batches.** A map or reduce fan-out either assigns
//!    every summary or none: one failed sub-chunk discards the whole
//!    batch's results and ends the run. Simple to reason about, cheap to
//!    re-run.
//!
//! 3. **The limiter is the only throttle.** Fan-outs issue every task at
//!    once; admission to the provider is governed solely by the shared
//!    token bucket, so the concurrency model stays independent of the
//!    spawning mechanism.

pub mod api;
pub mod error;
pub mod sources;
pub mod workflow;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

pub use error::{SummarizeError, SummarizeResult};

// ── Constants ──────────────────────────────────────────────────────

/// Default chat-completions endpoint (OpenRouter-compatible).
pub const COMPLETIONS_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default model for map/reduce summarization calls (small, cheap).
pub const DEFAULT_MAP_MODEL: &str = "ibm/granite-4-h-small";

/// Default model for final and executive synthesis (large).
pub const DEFAULT_FINAL_MODEL: &str = "openai/gpt-oss-120b";

// ── Completion seam ────────────────────────────────────────────────

/// Boxed future returned by [`Completion::complete`].
///
/// Type alias to keep trait signatures and implementations readable.
pub type CompletionFuture<'a> = Pin<Box<dyn Future<Output = SummarizeResult<String>> + Send + 'a>>;

/// A single prompt-to-text completion request.
///
/// The workflow stages render their prompt templates into this flat shape;
/// model identity and sampling parameters come from the per-role
/// [`ModelParams`](workflow::ModelParams) in the config.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model identifier (e.g. `"openai/gpt-oss-120b"`).
    pub model: String,
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

/// The completion capability the workflow depends on.
///
/// The bundled [`CompletionClient`] implements this over HTTP; tests
/// implement it with scripted in-memory backends. Implementations must be
/// safe to call from many concurrent tasks — the map stage issues one call
/// per sub-chunk all at once.
pub trait Completion: Send + Sync {
    /// Produce the completion text for the given request.
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_>;
}

// ── Wire types ─────────────────────────────────────────────────────

/// Chat completion request body (OpenAI-compatible subset). Unused optional
/// fields are omitted from serialization.
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_f32")]
    temperature: f32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}
fn is_zero_f32(v: &f32) -> bool {
    *v == 0.0
}

/// Raw API response (internal deserialization target).
#[derive(Deserialize, Debug)]
struct RawChatResponse {
    choices: Option<Vec<RawChoice>>,
    error: Option<ApiErrorResponse>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Deserialize, Debug)]
struct RawChoice {
    message: RawResponseMessage,
}

#[derive(Deserialize, Debug)]
struct RawResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    message: String,
}

/// Token usage statistics reported by the provider.
#[derive(Deserialize, Debug, Clone)]
pub struct UsageInfo {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client for an OpenAI-compatible chat-completions API.
///
/// Every call acquires a token from the shared [`RateLimiter`](api::RateLimiter)
/// before touching the network, so all clients built on the same limiter —
/// across stages and across workflow runs — share one request budget.
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    limiter: Arc<api::RateLimiter>,
}

impl CompletionClient {
    /// Create a new client with the given API key and shared limiter.
    pub fn new(
        api_key: impl Into<String>,
        limiter: Arc<api::RateLimiter>,
    ) -> SummarizeResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("condense-rs/0.1")
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            url: COMPLETIONS_URL.to_string(),
            api_key: api_key.into(),
            limiter,
        })
    }

    /// Override the completions endpoint (self-hosted gateways, tests).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Send a completion request and return the generated text.
    pub async fn chat(&self, request: &CompletionRequest) -> SummarizeResult<String> {
        self.limiter.acquire().await;

        debug!(
            "LLM request: model={}, prompt={} chars, max_tokens={}, temp={}",
            request.model,
            request.prompt.len(),
            request.max_tokens,
            request.temperature,
        );

        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let start = Instant::now();
        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        debug!(
            "LLM response: HTTP {} in {:.1}s ({} bytes)",
            status,
            start.elapsed().as_secs_f64(),
            text.len()
        );

        if !status.is_success() {
            return Err(SummarizeError::Completion(format!(
                "completion API HTTP {status}: {text}"
            )));
        }

        let parsed: RawChatResponse = serde_json::from_str(&text)?;

        if let Some(err) = parsed.error {
            return Err(SummarizeError::Completion(format!(
                "completion API error: {}",
                err.message
            )));
        }

        if let Some(ref usage) = parsed.usage {
            debug!(
                "Token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens.unwrap_or(0),
                usage.completion_tokens.unwrap_or(0),
                usage.total_tokens.unwrap_or(0),
            );
        }

        parsed
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message.content)
            .ok_or_else(|| SummarizeError::Completion("empty completion response".into()))
    }
}

impl Completion for CompletionClient {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        Box::pin(async move { self.chat(&request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{LimiterConfig, RateLimiter};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(url: String) -> CompletionClient {
        let limiter = Arc::new(RateLimiter::new(LimiterConfig::default()));
        CompletionClient::new("test-key", limiter)
            .unwrap()
            .with_url(url)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test/model".into(),
            prompt: "Summarize this.".into(),
            max_tokens: 64,
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn chat_returns_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "A short summary."}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .mount(&server)
            .await;

        let client = test_client(format!("{}/chat/completions", server.uri()));
        let text = client.chat(&request()).await.unwrap();
        assert_eq!(text, "A short summary.");
    }

    #[tokio::test]
    async fn chat_maps_http_failure_to_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.chat(&request()).await.unwrap_err();
        assert!(matches!(err, SummarizeError::Completion(_)));
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn chat_surfaces_provider_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"message": "model overloaded"}
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.chat(&request()).await.unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }

    #[tokio::test]
    async fn chat_rejects_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": []
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.chat(&request()).await.unwrap_err();
        assert!(err.to_string().contains("empty completion response"));
    }

    #[test]
    fn request_body_skips_zero_fields() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 0,
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());
    }
}
