//! Shared token-bucket rate limiter for completion calls.
//!
//! Provider APIs cap requests per second across the whole account, not per
//! workflow, so the limiter is designed to be wrapped in an `Arc` and shared
//! by every [`CompletionClient`](crate::CompletionClient) in the process.
//! The bucket refills continuously at `requests_per_second` and holds at
//! most `burst` tokens, so a short burst after an idle period is admitted
//! immediately while sustained throughput converges on the steady rate.
//!
//! [`acquire`](RateLimiter::acquire) suspends the calling task until a token
//! is available; admission is in lock-acquisition order with no priorities.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Configuration for the shared rate limiter.
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Steady-state refill rate in requests per second.
    pub requests_per_second: f64,
    /// Maximum tokens the bucket can hold. Must exceed the steady rate for
    /// idle periods to bank any burst at all.
    pub burst: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 8.0,
            burst: 20.0,
        }
    }
}

/// Mutable bucket state behind the async mutex.
#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Process-wide token-bucket rate limiter.
///
/// ```ignore
/// let limiter = Arc::new(RateLimiter::new(LimiterConfig::default()));
/// // Every client in the process shares the same bucket.
/// let client = CompletionClient::new(api_key, limiter.clone())?;
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    config: LimiterConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter with the given configuration. The bucket starts
    /// full, so the first `burst` requests are admitted without waiting.
    pub fn new(config: LimiterConfig) -> Self {
        let rate = config.requests_per_second.max(f64::MIN_POSITIVE);
        let config = LimiterConfig {
            requests_per_second: rate,
            burst: config.burst.max(1.0),
        };
        Self {
            bucket: Mutex::new(Bucket {
                tokens: config.burst,
                refilled_at: Instant::now(),
            }),
            config,
        }
    }

    /// Wait until a request token is available, then consume it.
    ///
    /// Suspends the task (never blocks the runtime) when the bucket is
    /// empty. Multiple waiters are admitted in lock-acquisition order as
    /// tokens refill.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                // Time until one full token has accumulated.
                let deficit = 1.0 - bucket.tokens;
                Duration::from_secs_f64(deficit / self.config.requests_per_second)
            };
            debug!("rate limiter: bucket empty, waiting {:.0?}", wait);
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently available (after refilling for elapsed time).
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        bucket.tokens
    }

    /// Credit the bucket for time elapsed since the last refill, capped at
    /// the burst capacity.
    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.config.requests_per_second)
            .min(self.config.burst);
        bucket.refilled_at = now;
    }
}
