//! Configuration for summarization workflows.
//!
//! There is no implicit module-level configuration: every knob the stages
//! consult lives in [`WorkflowConfig`], passed to the
//! [`Workflow`](super::Workflow) constructor. Defaults mirror the budgets
//! the workflow was tuned with: an 8K-token map input budget, a 16K final
//! context budget, and an 8 req/s provider limit with a burst of 20.
//!
//! # Examples
//!
//! Minimal — everything uses defaults:
//!
//! ```ignore
//! let config = WorkflowConfig::default();
//! ```
//!
//! Customized with builder methods:
//!
//! ```ignore
//! let config = WorkflowConfig::default()
//!     .with_map_token_budget(4096)
//!     .with_final_token_budget(8192)
//!     .with_rate_limit(4.0, 10.0)
//!     .with_final_model(ModelParams::new("anthropic/claude-sonnet-4", 0.2, 8192));
//! ```

use crate::api::LimiterConfig;
use crate::{CompletionRequest, DEFAULT_FINAL_MODEL, DEFAULT_MAP_MODEL};

/// Model identity and sampling parameters for one workflow role.
///
/// The map/reduce stages use a small, cheap model with a modest output
/// budget; the final and executive synthesis use a larger model with a
/// larger output budget.
#[derive(Debug, Clone)]
pub struct ModelParams {
    /// Model identifier (e.g. `"openai/gpt-oss-120b"`).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate per call.
    pub max_tokens: u32,
}

impl ModelParams {
    pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }

    /// Build a completion request for this role from a rendered prompt.
    pub fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Configuration for a [`Workflow`](super::Workflow) run.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum tokens per sub-chunk fed to one map call (the split budget).
    pub map_token_budget: usize,
    /// Maximum total tokens of accumulated chunk summaries that still fit
    /// the final synthesis context. The length validator collapses above
    /// this.
    pub final_token_budget: usize,
    /// Sub-chunks estimated below this token count skip the completion call
    /// and become their own summary verbatim.
    pub short_circuit_tokens: usize,
    /// Steady-state provider request rate shared across the process.
    pub rate_limit_rps: f64,
    /// Burst capacity of the shared rate limiter.
    pub rate_limit_burst: f64,
    /// Model and sampling parameters for map/reduce calls.
    pub map_model: ModelParams,
    /// Model and sampling parameters for final and executive synthesis.
    pub final_model: ModelParams,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            map_token_budget: 8192,
            final_token_budget: 16384,
            short_circuit_tokens: 128,
            rate_limit_rps: 8.0,
            rate_limit_burst: 20.0,
            map_model: ModelParams::new(DEFAULT_MAP_MODEL, 0.3, 4096),
            final_model: ModelParams::new(DEFAULT_FINAL_MODEL, 0.2, 8192),
        }
    }
}

impl WorkflowConfig {
    /// Set the per-sub-chunk split budget in tokens.
    pub fn with_map_token_budget(mut self, tokens: usize) -> Self {
        self.map_token_budget = tokens;
        self
    }

    /// Set the final-context budget in tokens.
    pub fn with_final_token_budget(mut self, tokens: usize) -> Self {
        self.final_token_budget = tokens;
        self
    }

    /// Set the map-stage short-circuit threshold in tokens.
    pub fn with_short_circuit_tokens(mut self, tokens: usize) -> Self {
        self.short_circuit_tokens = tokens;
        self
    }

    /// Set the shared rate limit (steady requests per second, burst size).
    pub fn with_rate_limit(mut self, rps: f64, burst: f64) -> Self {
        self.rate_limit_rps = rps;
        self.rate_limit_burst = burst;
        self
    }

    /// Set the map/reduce model role.
    pub fn with_map_model(mut self, params: ModelParams) -> Self {
        self.map_model = params;
        self
    }

    /// Set the final/executive model role.
    pub fn with_final_model(mut self, params: ModelParams) -> Self {
        self.final_model = params;
        self
    }

    /// Limiter configuration derived from the rate-limit fields. Build the
    /// process-wide [`RateLimiter`](crate::api::RateLimiter) from this.
    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            requests_per_second: self.rate_limit_rps,
            burst: self.rate_limit_burst,
        }
    }
}
