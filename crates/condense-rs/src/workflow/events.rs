//! Events, handlers, and progress reporting for workflow runs.
//!
//! The workflow communicates with callers through [`WorkflowEvent`]
//! variants covering the run lifecycle — node completions with progress
//! percentages, fan-out sizes, length-validation decisions, collapses, and
//! terminal success/failure. Callers implement [`EventHandler`] to persist
//! status updates (the task-queue driver writes them to a status file),
//! render progress bars, or collect metrics. Events are purely
//! observational; nothing a handler does affects control flow.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or fire-and-forget runs |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | Custom `impl EventHandler` | Status files, metrics, dashboards |

use super::state::CollapseLevel;
use tracing::{info, warn};

/// A named workflow node, with the progress percentage its completion
/// represents. Percentages match the status updates the task-queue driver
/// historically persisted for each node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Executive path: load the rendered document.
    LoadDocument,
    /// Executive path: single-pass synthesis.
    ExecutiveSummary,
    /// Detailed path: fetch stored fragments.
    RetrieveChunks,
    /// Detailed path: split chunks into token-budgeted sub-chunks.
    SplitChunks,
    /// Detailed path: map fan-out over all sub-chunks.
    MapSummaries,
    /// Detailed path: reduce fan-out over chunks.
    MergeSummaries,
    /// Detailed path: length check deciding collapse vs. finalize.
    ValidateLength,
    /// Detailed path: regroup chunks at a coarser level.
    CollapseChunks,
    /// Detailed path: final synthesis.
    FinalSummary,
}

impl Stage {
    /// Stable snake_case name for logs and status payloads.
    pub fn name(self) -> &'static str {
        match self {
            Stage::LoadDocument => "load_document",
            Stage::ExecutiveSummary => "executive_summary",
            Stage::RetrieveChunks => "retrieve_chunks",
            Stage::SplitChunks => "split_chunks",
            Stage::MapSummaries => "map_summaries",
            Stage::MergeSummaries => "merge_summaries",
            Stage::ValidateLength => "validate_length",
            Stage::CollapseChunks => "collapse_chunks",
            Stage::FinalSummary => "final_summary",
        }
    }

    /// Overall run progress after this node completes.
    pub fn progress_pct(self) -> u8 {
        match self {
            Stage::LoadDocument | Stage::ExecutiveSummary => 50,
            Stage::RetrieveChunks => 30,
            Stage::SplitChunks => 40,
            Stage::MapSummaries => 60,
            Stage::MergeSummaries => 70,
            Stage::CollapseChunks => 75,
            Stage::ValidateLength => 80,
            Stage::FinalSummary => 90,
        }
    }
}

/// Events emitted by the workflow during a run.
#[derive(Debug)]
pub enum WorkflowEvent<'a> {
    /// A node finished successfully.
    StageCompleted { stage: Stage, progress_pct: u8 },
    /// The map fan-out is starting over this many sub-chunks.
    MapBatch { sub_chunks: usize },
    /// The reduce fan-out is starting. `reduced` counts the chunks whose
    /// summaries are actually recomputed (collapse preserves the rest).
    ReduceBatch { chunks: usize, reduced: usize },
    /// The length validator measured the accumulated summaries.
    LengthValidated {
        total_tokens: usize,
        budget: usize,
        collapse: bool,
    },
    /// The chunk list was regrouped at a coarser level.
    Collapsed {
        level: CollapseLevel,
        before: usize,
        after: usize,
    },
    /// A node failed; the run terminates with this error on the state.
    Failed { stage: Stage, error: &'a str },
    /// The run produced its final summary.
    Finished,
}

/// Handler for workflow events.
///
/// The default implementation ignores everything, so implementors only
/// write the arms they care about.
pub trait EventHandler: Send + Sync {
    /// Called for each event during the run.
    fn on_event(&self, event: &WorkflowEvent<'_>) {
        let _ = event;
    }
}

/// A no-op event handler.
pub struct NoopHandler;
impl EventHandler for NoopHandler {}

/// An event handler that logs workflow progress through `tracing`.
pub struct LoggingHandler;

impl EventHandler for LoggingHandler {
    fn on_event(&self, event: &WorkflowEvent<'_>) {
        match event {
            WorkflowEvent::StageCompleted {
                stage,
                progress_pct,
            } => info!("{} completed ({progress_pct}%)", stage.name()),
            WorkflowEvent::MapBatch { sub_chunks } => {
                info!("map: summarizing {sub_chunks} sub-chunks");
            }
            WorkflowEvent::ReduceBatch { chunks, reduced } => {
                info!("reduce: {reduced} of {chunks} chunks need new summaries");
            }
            WorkflowEvent::LengthValidated {
                total_tokens,
                budget,
                collapse,
            } => info!(
                "validate: {total_tokens} summary tokens (budget {budget}) -> {}",
                if *collapse { "collapse" } else { "finalize" }
            ),
            WorkflowEvent::Collapsed {
                level,
                before,
                after,
            } => info!("collapsed {before} chunks into {after} at level '{level}'"),
            WorkflowEvent::Failed { stage, error } => {
                warn!("{} failed: {error}", stage.name());
            }
            WorkflowEvent::Finished => info!("workflow finished"),
        }
    }
}
