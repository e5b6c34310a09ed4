//! External storage seams and the bundled filesystem store.
//!
//! The workflow addresses its collaborators through two narrow traits:
//! [`DocumentStore`] for the full rendered markdown (executive path) and
//! [`FragmentStore`] for the document's stored fragments (detailed path).
//! Production deployments back these with a document service and a vector
//! store; [`FsDocumentStore`] backs both with plain markdown files so the
//! CLI — and tests — can run the whole pipeline locally.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::debug;

use crate::error::{SummarizeError, SummarizeResult};

/// Boxed future returned by store methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = SummarizeResult<T>> + Send + 'a>>;

/// Full-document content lookup, keyed by `(project_id, document_id)`.
pub trait DocumentStore: Send + Sync {
    /// The rendered markdown for a document. Fails with
    /// [`SummarizeError::DocumentNotFound`] when absent.
    fn markdown(&self, project_id: &str, document_id: &str) -> SourceFuture<'_, String>;
}

/// Stored-fragment lookup, keyed by `(project_id, document_id)`.
pub trait FragmentStore: Send + Sync {
    /// All stored fragments of the document, in storage order. Fails with
    /// [`SummarizeError::Retrieval`] when the lookup cannot be served.
    fn fragments(&self, project_id: &str, document_id: &str) -> SourceFuture<'_, Vec<String>>;
}

/// Filesystem-backed store: documents live at
/// `<root>/<project_id>/<document_id>.md`.
///
/// As a [`FragmentStore`] it slices the markdown at heading boundaries, so
/// the detailed path runs against local files without a vector store —
/// each fragment starts with its heading line, which is exactly what the
/// collapse stage keys on.
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, project_id: &str, document_id: &str) -> PathBuf {
        self.root.join(project_id).join(format!("{document_id}.md"))
    }
}

impl DocumentStore for FsDocumentStore {
    fn markdown(&self, project_id: &str, document_id: &str) -> SourceFuture<'_, String> {
        let path = self.document_path(project_id, document_id);
        let document_id = document_id.to_string();
        Box::pin(async move {
            debug!("loading markdown from {}", path.display());
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => Ok(text),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(SummarizeError::DocumentNotFound(document_id))
                }
                Err(e) => Err(SummarizeError::Io(e)),
            }
        })
    }
}

impl FragmentStore for FsDocumentStore {
    fn fragments(&self, project_id: &str, document_id: &str) -> SourceFuture<'_, Vec<String>> {
        let path = self.document_path(project_id, document_id);
        let document_id = document_id.to_string();
        Box::pin(async move {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                SummarizeError::Retrieval(format!(
                    "no stored fragments for document '{document_id}': {e}"
                ))
            })?;
            Ok(split_markdown_sections(&text))
        })
    }
}

/// Split markdown into sections at heading lines. Each section keeps its
/// heading as the first line; content before the first heading becomes its
/// own section. Returns nothing for an empty document.
pub fn split_markdown_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.starts_with('#') && !current.trim().is_empty() {
            sections.push(current.trim_end().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim().is_empty() {
        sections.push(current.trim_end().to_string());
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with_document(
        project: &str,
        document: &str,
        content: &str,
    ) -> (TempDir, FsDocumentStore) {
        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(project);
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(project_dir.join(format!("{document}.md")), content).unwrap();
        let store = FsDocumentStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn markdown_reads_document_content() {
        let (_dir, store) = store_with_document("p1", "d1", "# Title\nBody.");
        let text = store.markdown("p1", "d1").await.unwrap();
        assert_eq!(text, "# Title\nBody.");
    }

    #[tokio::test]
    async fn missing_document_is_document_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.markdown("p1", "absent").await.unwrap_err();
        assert!(matches!(err, SummarizeError::DocumentNotFound(_)));
        assert!(err.to_string().contains("absent"));
    }

    #[tokio::test]
    async fn missing_fragments_is_retrieval_error() {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store.fragments("p1", "absent").await.unwrap_err();
        assert!(matches!(err, SummarizeError::Retrieval(_)));
    }

    #[tokio::test]
    async fn fragments_split_at_headings() {
        let content = "## 1.1 Scope\nalpha\n\n## 1.2 Terms\nbeta\n## 2 Budget\ngamma";
        let (_dir, store) = store_with_document("p1", "d1", content);

        let fragments = store.fragments("p1", "d1").await.unwrap();
        assert_eq!(fragments.len(), 3);
        assert!(fragments[0].starts_with("## 1.1 Scope"));
        assert!(fragments[1].starts_with("## 1.2 Terms"));
        assert!(fragments[2].starts_with("## 2 Budget"));
    }

    #[test]
    fn preamble_becomes_its_own_section() {
        let sections = split_markdown_sections("Intro text.\n\n# First\nBody.");
        assert_eq!(sections.len(), 2);
        assert!(sections[0].starts_with("Intro text."));
        assert!(sections[1].starts_with("# First"));
    }

    #[test]
    fn document_without_headings_is_one_section() {
        let sections = split_markdown_sections("Just prose.\nMore prose.");
        assert_eq!(sections, vec!["Just prose.\nMore prose.".to_string()]);
    }

    #[test]
    fn empty_document_has_no_sections() {
        assert!(split_markdown_sections("").is_empty());
        assert!(split_markdown_sections("   \n\n").is_empty());
    }
}
