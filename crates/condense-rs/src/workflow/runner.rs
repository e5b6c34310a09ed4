//! The workflow dispatch loop.
//!
//! [`Workflow`] orchestrates the stages as an explicit finite-state
//! machine: a [`Node`] tag is matched in a loop and each arm mutates the
//! [`DocumentState`] and names its successor. The one cycle in the graph —
//! merge → validate → collapse → merge — is bounded by the forward-only
//! [`CollapseLevel`](super::state::CollapseLevel) enum, so every run
//! terminates in a bounded number of stages.
//!
//! ```text
//!            ┌────────── route ──────────┐
//!            ▼                           ▼
//!     load_document              retrieve_chunks
//!            │                           │
//!     executive_summary           split_chunks
//!            │                           │
//!           done                  map_summaries
//!                                        │
//!                          ┌──▶ merge_summaries
//!                          │             │
//!                   collapse_chunks  validate_length
//!                          ▲             │
//!                          └── collapse ─┤ finalize
//!                                        ▼
//!                                 final_summary ──▶ done
//! ```
//!
//! Any node failure is captured into `state.error` and ends the run; the
//! returned state always has exactly one of `final_summary` / `error` set.

use tracing::{debug, info, warn};

use super::collapse::collapse_chunks;
use super::config::WorkflowConfig;
use super::events::{EventHandler, NoopHandler, Stage, WorkflowEvent};
use super::map::generate_summaries;
use super::prompt::{numbered_summaries, ExecutivePrompt, ReducePrompt};
use super::reduce::merge_summaries;
use super::split::split_document_chunks;
use super::state::{Chunk, DocumentState, SummaryKind};
use super::tokens::estimate_tokens;
use crate::error::{SummarizeError, SummarizeResult};
use crate::sources::{DocumentStore, FragmentStore};
use crate::Completion;

/// Tags for the dispatch loop. `Route` and `Done` are control-only; every
/// other tag corresponds to one workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Route,
    LoadDocument,
    ExecutiveSummary,
    RetrieveChunks,
    SplitChunks,
    MapSummaries,
    MergeSummaries,
    ValidateLength,
    CollapseChunks,
    FinalSummary,
    Done,
}

impl Node {
    fn stage(self) -> Option<Stage> {
        match self {
            Node::LoadDocument => Some(Stage::LoadDocument),
            Node::ExecutiveSummary => Some(Stage::ExecutiveSummary),
            Node::RetrieveChunks => Some(Stage::RetrieveChunks),
            Node::SplitChunks => Some(Stage::SplitChunks),
            Node::MapSummaries => Some(Stage::MapSummaries),
            Node::MergeSummaries => Some(Stage::MergeSummaries),
            Node::ValidateLength => Some(Stage::ValidateLength),
            Node::CollapseChunks => Some(Stage::CollapseChunks),
            Node::FinalSummary => Some(Stage::FinalSummary),
            Node::Route | Node::Done => None,
        }
    }
}

/// The hierarchical summarization workflow.
///
/// Borrows its collaborators — completion backend, stores, event handler —
/// so one set of shared clients can serve many runs. Bind collaborators to
/// `let` bindings before constructing the workflow; they must outlive the
/// `.run()` call.
///
/// ```ignore
/// let workflow = Workflow::new(&client, &store, &store, config)
///     .with_event_handler(&handler);
/// let final_state = workflow.run(state).await;
/// ```
pub struct Workflow<'a> {
    completion: &'a dyn Completion,
    documents: &'a dyn DocumentStore,
    fragments: &'a dyn FragmentStore,
    config: WorkflowConfig,
    event_handler: &'a dyn EventHandler,
}

impl<'a> Workflow<'a> {
    /// Create a workflow over the given collaborators and configuration.
    pub fn new(
        completion: &'a dyn Completion,
        documents: &'a dyn DocumentStore,
        fragments: &'a dyn FragmentStore,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            completion,
            documents,
            fragments,
            config,
            event_handler: &NoopHandler,
        }
    }

    /// Attach an event handler for progress observation.
    pub fn with_event_handler(mut self, handler: &'a dyn EventHandler) -> Self {
        self.event_handler = handler;
        self
    }

    /// Run the workflow to completion.
    ///
    /// Takes ownership of the initial state and returns the terminal state:
    /// `final_summary` set on success, `error` set on failure — never both,
    /// never neither.
    pub async fn run(&self, mut state: DocumentState) -> DocumentState {
        info!(
            "workflow started: project={}, document={}, kind={}",
            state.project_id, state.document_id, state.kind
        );

        let mut node = Node::Route;
        loop {
            match node {
                Node::Route => {
                    // Sole path-selection point; runs exactly once.
                    node = match state.kind {
                        SummaryKind::Executive => Node::LoadDocument,
                        SummaryKind::Detailed => Node::RetrieveChunks,
                    };
                    info!("routing to '{}' summarization path", state.kind);
                }
                Node::Done => break,
                current => match self.execute(current, &mut state).await {
                    Ok(next) => {
                        if let Some(stage) = current.stage() {
                            self.event_handler.on_event(&WorkflowEvent::StageCompleted {
                                stage,
                                progress_pct: stage.progress_pct(),
                            });
                        }
                        node = next;
                    }
                    Err(err) => {
                        let message = err.to_string();
                        warn!("workflow failed at {current:?}: {message}");
                        if let Some(stage) = current.stage() {
                            self.event_handler.on_event(&WorkflowEvent::Failed {
                                stage,
                                error: &message,
                            });
                        }
                        state.error = Some(message);
                        return state;
                    }
                },
            }
        }

        self.event_handler.on_event(&WorkflowEvent::Finished);
        info!("workflow finished: document={}", state.document_id);
        state
    }

    /// Execute one stage and name its successor.
    async fn execute(&self, node: Node, state: &mut DocumentState) -> SummarizeResult<Node> {
        match node {
            // ── Executive path ──
            Node::LoadDocument => {
                let markdown = self
                    .documents
                    .markdown(&state.project_id, &state.document_id)
                    .await?;
                debug!("loaded markdown content: {} chars", markdown.len());
                state.markdown_content = Some(markdown);
                Ok(Node::ExecutiveSummary)
            }
            Node::ExecutiveSummary => {
                let text = state
                    .markdown_content
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        SummarizeError::EmptyInput(
                            "no markdown content available for executive summarization".into(),
                        )
                    })?;
                debug!("executive input: ~{} tokens", estimate_tokens(text));
                let prompt = ExecutivePrompt { text }.render();
                let summary = self
                    .completion
                    .complete(self.config.final_model.request(prompt))
                    .await?;
                state.final_summary = Some(summary);
                Ok(Node::Done)
            }

            // ── Detailed path ──
            Node::RetrieveChunks => {
                let fragments = self
                    .fragments
                    .fragments(&state.project_id, &state.document_id)
                    .await?;
                info!("retrieved {} fragments", fragments.len());
                state.chunks = fragments.into_iter().map(Chunk::from_fragment).collect();
                state.collapse_level = super::state::CollapseLevel::None;
                Ok(Node::SplitChunks)
            }
            Node::SplitChunks => {
                split_document_chunks(&mut state.chunks, self.config.map_token_budget);
                let total: usize = state.chunks.iter().map(|c| c.sub_chunks.len()).sum();
                info!("split {} chunks into {total} sub-chunks", state.chunks.len());
                Ok(Node::MapSummaries)
            }
            Node::MapSummaries => {
                generate_summaries(
                    self.completion,
                    &self.config,
                    &mut state.chunks,
                    state.user_query.as_deref(),
                    self.event_handler,
                )
                .await?;
                Ok(Node::MergeSummaries)
            }
            Node::MergeSummaries => {
                merge_summaries(
                    self.completion,
                    &self.config,
                    &mut state.chunks,
                    state.user_query.as_deref(),
                    self.event_handler,
                )
                .await?;
                Ok(Node::ValidateLength)
            }
            Node::ValidateLength => {
                let total: usize = state
                    .chunks
                    .iter()
                    .filter_map(|c| c.summary.as_deref())
                    .map(estimate_tokens)
                    .sum();
                let collapse =
                    !state.collapse_level.exhausted() && total > self.config.final_token_budget;
                info!(
                    "validate: {total} summary tokens (budget {}), level '{}' -> {}",
                    self.config.final_token_budget,
                    state.collapse_level,
                    if collapse { "collapse" } else { "finalize" }
                );
                self.event_handler.on_event(&WorkflowEvent::LengthValidated {
                    total_tokens: total,
                    budget: self.config.final_token_budget,
                    collapse,
                });
                Ok(if collapse {
                    Node::CollapseChunks
                } else {
                    Node::FinalSummary
                })
            }
            Node::CollapseChunks => {
                let before = state.chunks.len();
                let (chunks, level) =
                    collapse_chunks(std::mem::take(&mut state.chunks), state.collapse_level);
                state.chunks = chunks;
                state.collapse_level = level;
                self.event_handler.on_event(&WorkflowEvent::Collapsed {
                    level,
                    before,
                    after: state.chunks.len(),
                });
                Ok(Node::MergeSummaries)
            }
            Node::FinalSummary => {
                let parts: Vec<&str> = state
                    .chunks
                    .iter()
                    .filter_map(|c| c.summary.as_deref())
                    .collect();
                let numbered = numbered_summaries(parts);
                debug!(
                    "final synthesis input: ~{} tokens",
                    estimate_tokens(&numbered)
                );
                let prompt =
                    ReducePrompt::new(&numbered, state.user_query.as_deref()).render();
                let summary = self
                    .completion
                    .complete(self.config.final_model.request(prompt))
                    .await?;
                state.final_summary = Some(summary);
                Ok(Node::Done)
            }

            // Control tags never reach execute().
            Node::Route | Node::Done => Ok(Node::Done),
        }
    }
}
