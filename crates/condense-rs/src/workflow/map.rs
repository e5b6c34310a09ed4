//! Map stage: summarize every sub-chunk, concurrently, rate-limited.
//!
//! The fan-out is one flat batch over every sub-chunk of every chunk — not
//! chunk-by-chunk — issued all at once and awaited together. Concurrency is
//! bounded only by the shared rate limiter, not by an explicit cap. The
//! batch is all-or-nothing: if any single summarization fails, no result is
//! assigned and the first error propagates.

use futures::future;
use tracing::{debug, info};

use super::config::{ModelParams, WorkflowConfig};
use super::events::{EventHandler, WorkflowEvent};
use super::prompt::MapPrompt;
use super::state::Chunk;
use super::tokens::estimate_tokens;
use crate::Completion;
use crate::error::SummarizeResult;

/// Summarize a single sub-chunk's text.
///
/// Sub-chunks below the short-circuit threshold are already as small as a
/// summary would be, so the text passes through verbatim with no
/// completion call.
pub(crate) async fn summarize_sub_chunk(
    completion: &dyn Completion,
    params: &ModelParams,
    short_circuit_tokens: usize,
    text: &str,
    query: Option<&str>,
) -> SummarizeResult<String> {
    let tokens = estimate_tokens(text);
    if tokens < short_circuit_tokens {
        debug!("map: sub-chunk of {tokens} tokens under threshold, passing through");
        return Ok(text.to_string());
    }

    let prompt = MapPrompt::new(text, query).render();
    completion.complete(params.request(prompt)).await
}

/// Fan out [`summarize_sub_chunk`] over every sub-chunk of every chunk and
/// assign the results back by original index.
pub(crate) async fn generate_summaries(
    completion: &dyn Completion,
    config: &WorkflowConfig,
    chunks: &mut [Chunk],
    query: Option<&str>,
    handler: &dyn EventHandler,
) -> SummarizeResult<()> {
    let mut indices = Vec::new();
    let mut jobs = Vec::new();
    for (ci, chunk) in chunks.iter().enumerate() {
        for (si, sub) in chunk.sub_chunks.iter().enumerate() {
            indices.push((ci, si));
            jobs.push(summarize_sub_chunk(
                completion,
                &config.map_model,
                config.short_circuit_tokens,
                &sub.text,
                query,
            ));
        }
    }

    handler.on_event(&WorkflowEvent::MapBatch {
        sub_chunks: jobs.len(),
    });
    info!("map: running {} summarization tasks (rate-limited)", jobs.len());

    let results = future::join_all(jobs).await;

    // All-or-nothing: the first failure discards every result, assigned or
    // not, and the state is left exactly as it was before the batch.
    let summaries: Vec<String> = results.into_iter().collect::<SummarizeResult<_>>()?;

    for ((ci, si), summary) in indices.into_iter().zip(summaries) {
        chunks[ci].sub_chunks[si].summary = Some(summary);
    }

    info!("map: all sub-chunk summaries assigned");
    Ok(())
}
