//! Reduce stage: merge each chunk's sub-chunk summaries into one summary.
//!
//! Fans out over all chunks at once with the same all-or-nothing policy as
//! the map stage. Two shortcuts avoid wasted completion calls:
//!
//! - A chunk with exactly one sub-chunk takes that sub-chunk's summary
//!   verbatim, no merge call.
//! - A chunk whose summary is already set (a single-member group carried
//!   through a collapse) is left alone — only rebuilt chunks re-reduce.

use futures::future;
use tracing::info;

use super::config::{ModelParams, WorkflowConfig};
use super::events::{EventHandler, WorkflowEvent};
use super::prompt::{numbered_summaries, ReducePrompt};
use super::state::Chunk;
use crate::Completion;
use crate::error::{SummarizeError, SummarizeResult};

/// Merge one chunk's sub-chunk summaries into a chunk-level summary.
pub(crate) async fn reduce_chunk(
    completion: &dyn Completion,
    params: &ModelParams,
    chunk: &Chunk,
    query: Option<&str>,
) -> SummarizeResult<String> {
    let missing =
        || SummarizeError::EmptyInput("sub-chunk has no summary to reduce".into());

    if let [only] = chunk.sub_chunks.as_slice() {
        // Nothing to merge.
        return only.summary.clone().ok_or_else(missing);
    }

    let mut parts = Vec::with_capacity(chunk.sub_chunks.len());
    for sub in &chunk.sub_chunks {
        parts.push(sub.summary.as_deref().ok_or_else(missing)?);
    }

    let numbered = numbered_summaries(parts);
    let prompt = ReducePrompt::new(&numbered, query).render();
    completion.complete(params.request(prompt)).await
}

/// Fan out [`reduce_chunk`] over every chunk that still needs a summary and
/// assign the results back by index.
pub(crate) async fn merge_summaries(
    completion: &dyn Completion,
    config: &WorkflowConfig,
    chunks: &mut [Chunk],
    query: Option<&str>,
    handler: &dyn EventHandler,
) -> SummarizeResult<()> {
    let mut indices = Vec::new();
    let mut jobs = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.summary.is_none() {
            indices.push(i);
            jobs.push(reduce_chunk(completion, &config.map_model, chunk, query));
        }
    }

    handler.on_event(&WorkflowEvent::ReduceBatch {
        chunks: chunks.len(),
        reduced: jobs.len(),
    });
    info!(
        "reduce: merging {} of {} chunk summaries (rate-limited)",
        jobs.len(),
        chunks.len()
    );

    let results = future::join_all(jobs).await;

    // Same all-or-nothing policy as the map stage.
    let summaries: Vec<String> = results.into_iter().collect::<SummarizeResult<_>>()?;

    for (i, summary) in indices.into_iter().zip(summaries) {
        chunks[i].summary = Some(summary);
    }

    Ok(())
}
