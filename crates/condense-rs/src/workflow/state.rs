//! The chunk/sub-chunk data model and the per-run workflow state.
//!
//! A document flows through the detailed path as a list of [`Chunk`]s — one
//! per stored fragment — each split into token-budgeted [`SubChunk`]s. The
//! map stage fills sub-chunk summaries, the reduce stage fills chunk
//! summaries, and each collapse rebuilds the chunk list at a coarser
//! [`CollapseLevel`]. [`DocumentState`] threads all of it through the
//! dispatch loop; it is owned by exactly one run and mutated only between
//! suspension points, so no locking is needed.

use std::fmt;

/// Which summarization path a run takes. Fixed at workflow start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    /// Full hierarchical map-reduce with adaptive collapsing.
    Detailed,
    /// Single-pass whole-document summary, no map-reduce.
    Executive,
}

impl fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryKind::Detailed => write!(f, "detailed"),
            SummaryKind::Executive => write!(f, "executive"),
        }
    }
}

/// How far the chunk list has been collapsed. Strictly coarsening: a run
/// only ever moves forward through `None → Subsection → Section → Ignore`,
/// which bounds the merge/collapse cycle to three transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CollapseLevel {
    /// Original retrieval granularity.
    None,
    /// Grouped by exact first-line heading (e.g. `"1.1 Definitions"`).
    Subsection,
    /// Grouped by leading section number (e.g. `"1"`).
    Section,
    /// No further grouping is possible; length checks are waived.
    Ignore,
}

impl CollapseLevel {
    /// The next coarser level. `Ignore` is absorbing.
    pub fn next(self) -> Self {
        match self {
            CollapseLevel::None => CollapseLevel::Subsection,
            CollapseLevel::Subsection => CollapseLevel::Section,
            CollapseLevel::Section | CollapseLevel::Ignore => CollapseLevel::Ignore,
        }
    }

    /// Whether the collapsing budget is spent. At `Section` or `Ignore` the
    /// length validator must finalize regardless of summary size — the
    /// escape valve that guarantees termination.
    pub fn exhausted(self) -> bool {
        matches!(self, CollapseLevel::Section | CollapseLevel::Ignore)
    }
}

impl fmt::Display for CollapseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollapseLevel::None => "none",
            CollapseLevel::Subsection => "subsection",
            CollapseLevel::Section => "section",
            CollapseLevel::Ignore => "ignore",
        };
        write!(f, "{name}")
    }
}

/// A leaf unit of text sized to fit one summarization call's input budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubChunk {
    /// Raw content. Never mutated after creation.
    pub text: String,
    /// `None` until the map stage completes; immutable thereafter within a
    /// collapse level.
    pub summary: Option<String>,
}

impl SubChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            summary: None,
        }
    }
}

/// A retrieval-level unit owning zero or more sub-chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// For an original chunk, the stored fragment text; for a collapsed
    /// chunk, the join of its constituent chunks' texts.
    pub text: String,
    /// Leaf fragments in split order. Empty before splitting.
    pub sub_chunks: Vec<SubChunk>,
    /// `None` until the reduce stage runs for the current `sub_chunks`.
    /// Any structural rebuild (collapse) resets it to `None` to force
    /// re-reduction at the new granularity.
    pub summary: Option<String>,
}

impl Chunk {
    /// Wrap a stored fragment as an unsplit, unsummarized chunk.
    pub fn from_fragment(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sub_chunks: Vec::new(),
            summary: None,
        }
    }
}

/// The single mutable context threaded through every workflow stage.
///
/// Created once per summarization request, mutated node-by-node by the
/// dispatch loop, and returned to the caller after the terminal node. At
/// termination exactly one of `final_summary` / `error` is set.
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Opaque identifier addressing the external stores.
    pub project_id: String,
    /// Opaque identifier addressing the external stores.
    pub document_id: String,
    /// Path selection. Never changes after construction.
    pub kind: SummaryKind,
    /// Optional steering instructions appended to every map/reduce/final
    /// prompt on the detailed path.
    pub user_query: Option<String>,
    /// Chunk list. Empty until retrieval; replaced wholesale by collapses.
    pub chunks: Vec<Chunk>,
    /// Full rendered document text. Executive path only.
    pub markdown_content: Option<String>,
    /// The sole output artifact.
    pub final_summary: Option<String>,
    /// Failure reason. Once set, remaining processing is skipped.
    pub error: Option<String>,
    /// Current collapse granularity. Only advances forward.
    pub collapse_level: CollapseLevel,
}

impl DocumentState {
    /// Initial state for a run. All workflow-managed fields start at their
    /// documented defaults.
    pub fn new(
        project_id: impl Into<String>,
        document_id: impl Into<String>,
        kind: SummaryKind,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            document_id: document_id.into(),
            kind,
            user_query: None,
            chunks: Vec::new(),
            markdown_content: None,
            final_summary: None,
            error: None,
            collapse_level: CollapseLevel::None,
        }
    }

    /// Attach optional user steering instructions.
    pub fn with_user_query(mut self, query: Option<String>) -> Self {
        self.user_query = query;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_level_advances_and_saturates() {
        assert_eq!(CollapseLevel::None.next(), CollapseLevel::Subsection);
        assert_eq!(CollapseLevel::Subsection.next(), CollapseLevel::Section);
        assert_eq!(CollapseLevel::Section.next(), CollapseLevel::Ignore);
        assert_eq!(CollapseLevel::Ignore.next(), CollapseLevel::Ignore);
    }

    #[test]
    fn collapse_level_ordering_is_strict() {
        assert!(CollapseLevel::None < CollapseLevel::Subsection);
        assert!(CollapseLevel::Subsection < CollapseLevel::Section);
        assert!(CollapseLevel::Section < CollapseLevel::Ignore);
    }

    #[test]
    fn exhausted_only_at_section_or_ignore() {
        assert!(!CollapseLevel::None.exhausted());
        assert!(!CollapseLevel::Subsection.exhausted());
        assert!(CollapseLevel::Section.exhausted());
        assert!(CollapseLevel::Ignore.exhausted());
    }

    #[test]
    fn initial_state_defaults() {
        let state = DocumentState::new("p1", "d1", SummaryKind::Detailed);
        assert!(state.chunks.is_empty());
        assert!(state.markdown_content.is_none());
        assert!(state.final_summary.is_none());
        assert!(state.error.is_none());
        assert_eq!(state.collapse_level, CollapseLevel::None);
    }

    #[test]
    fn fragment_chunk_starts_unsplit() {
        let chunk = Chunk::from_fragment("## 1.1 Scope\nBody.");
        assert!(chunk.sub_chunks.is_empty());
        assert!(chunk.summary.is_none());
    }
}
