//! Error taxonomy for summarization workflows.
//!
//! Every fallible operation in the crate returns [`SummarizeResult`]. The
//! variants mirror the failure surfaces of the workflow: missing documents
//! (executive path), missing required text, fragment-store lookups (detailed
//! path), and completion-client failures. Transport and serialization errors
//! are folded in via `#[from]` conversions at the client boundary.
//!
//! The workflow driver never panics on these — a node failure is recorded on
//! the state (`DocumentState::error`) as the error's display string and the
//! run terminates there. There is no node-level retry and no partial-result
//! salvage; the caller re-invokes the whole workflow if it wants another
//! attempt.

use thiserror::Error;

/// Result type for summarization operations.
pub type SummarizeResult<T> = std::result::Result<T, SummarizeError>;

/// Error types for summarization operations.
#[derive(Debug, Error)]
pub enum SummarizeError {
    /// The document store has no rendered content for this document.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Required input text was absent or empty.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// The fragment store failed to return the document's fragments.
    #[error("fragment retrieval failed: {0}")]
    Retrieval(String),

    /// The completion provider reported an error or returned an unusable
    /// response (non-success status, provider error payload, empty choice).
    #[error("completion failed: {0}")]
    Completion(String),

    /// HTTP transport error from the completion client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (filesystem-backed stores).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
