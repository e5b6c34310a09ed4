//! API interaction layer: the shared request rate limiter.
//!
//! Everything between the workflow stages and the completion provider that
//! is not the HTTP client itself lives here:
//!
//! - [`limiter`] — a process-wide token-bucket rate limiter. Every
//!   completion call, regardless of which stage or which workflow instance
//!   issued it, draws from one shared bucket. A burst capacity above the
//!   steady rate lets idle periods bank a few immediate requests while the
//!   sustained throughput stays capped.

pub mod limiter;

// Re-export commonly used items at the module level.
pub use limiter::{LimiterConfig, RateLimiter};
