//! Curation of collected papers and query history.

use std::fmt;

use crate::backend::Backend;
use crate::store::LocalStore;
use crate::{CoreError, Paper, QueryHistoryEntry, ReviewStatus};

pub const NO_PAPERS: &str = "No papers found.";
pub const NO_PAPERS_HINT: &str = "Add papers from Google Scholar with the Add button.";
pub const NO_HISTORY: &str = "No query history yet.";
pub const NO_HISTORY_HINT: &str = "Queries you execute from the Assistant tab will appear here.";
pub const UNKNOWN_AUTHORS: &str = "Unknown authors";

/// Where a paper list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperSource {
    Backend,
    /// The backend was unreachable; these are the locally buffered papers.
    LocalBuffer,
}

#[derive(Debug, Clone)]
pub struct LoadedPapers {
    pub papers: Vec<Paper>,
    pub source: PaperSource,
}

/// Fetch the papers of `project_id`.
///
/// A non-2xx answer yields an empty list. When the backend cannot be reached
/// at all, the local buffer is shown instead.
pub async fn load_papers(
    backend: &dyn Backend,
    store: &LocalStore,
    project_id: &str,
) -> LoadedPapers {
    match backend.list_papers(project_id).await {
        Ok(papers) => LoadedPapers {
            papers,
            source: PaperSource::Backend,
        },
        Err(e) if e.is_transport() => {
            tracing::error!(project_id, error = %e, "failed to load papers, using local buffer");
            let papers = store.saved_papers().unwrap_or_else(|e| {
                tracing::error!(error = %e, "local buffer unreadable");
                Vec::new()
            });
            LoadedPapers {
                papers,
                source: PaperSource::LocalBuffer,
            }
        }
        Err(e) => {
            tracing::warn!(project_id, error = %e, "paper list request rejected");
            LoadedPapers {
                papers: Vec::new(),
                source: PaperSource::Backend,
            }
        }
    }
}

/// Review counts shown in the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaperStats {
    pub total: usize,
    pub reviewed: usize,
}

impl fmt::Display for PaperStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} papers | {} reviewed", self.total, self.reviewed)
    }
}

/// The loaded paper list plus the current substring filter.
#[derive(Debug, Clone, Default)]
pub struct PaperCollection {
    papers: Vec<Paper>,
    filter: String,
}

impl PaperCollection {
    pub fn new(papers: Vec<Paper>) -> Self {
        Self {
            papers,
            filter: String::new(),
        }
    }

    /// Replace the list, keeping the filter.
    pub fn replace(&mut self, papers: Vec<Paper>) {
        self.papers = papers;
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn all(&self) -> &[Paper] {
        &self.papers
    }

    /// Papers whose title or authors contain the filter, ignoring case.
    pub fn visible(&self) -> Vec<&Paper> {
        let needle = self.filter.trim().to_lowercase();
        self.papers
            .iter()
            .filter(|p| needle.is_empty() || p.matches(&needle))
            .collect()
    }

    pub fn get(&self, paper_id: &str) -> Option<&Paper> {
        self.papers.iter().find(|p| p.id == paper_id)
    }

    /// Counts over the whole list, not just the visible part.
    pub fn stats(&self) -> PaperStats {
        PaperStats {
            total: self.papers.len(),
            reviewed: self.papers.iter().filter(|p| p.is_reviewed()).count(),
        }
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }
}

/// Flip a paper's review status. Returns the status that was requested.
///
/// A rejected PATCH is logged and otherwise ignored; the caller reloads
/// either way. Only a transport failure is returned as an error.
pub async fn toggle_status(backend: &dyn Backend, paper: &Paper) -> Result<ReviewStatus, CoreError> {
    let status = paper.status.toggled();
    match backend.update_status(&paper.id, status).await {
        Ok(()) => {
            tracing::info!(paper_id = %paper.id, %status, "status updated");
            Ok(status)
        }
        Err(e) if e.is_transport() => {
            tracing::error!(paper_id = %paper.id, error = %e, "failed to update status");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(paper_id = %paper.id, error = %e, "status update rejected");
            Ok(status)
        }
    }
}

/// Delete a paper from the backend and from the local buffer.
///
/// A non-2xx DELETE does not stop the local removal. A transport failure
/// aborts before local storage is touched.
pub async fn remove_paper(
    backend: &dyn Backend,
    store: &LocalStore,
    paper_id: &str,
) -> Result<(), CoreError> {
    match backend.delete_paper(paper_id).await {
        Ok(()) => {}
        Err(e) if e.is_transport() => {
            tracing::error!(paper_id, error = %e, "failed to remove paper");
            return Err(e);
        }
        Err(e) => tracing::warn!(paper_id, error = %e, "backend delete rejected"),
    }
    store.remove_paper(paper_id)?;
    Ok(())
}

/// Fetch the query history of `project_id`; any failure yields an empty list.
pub async fn load_history(backend: &dyn Backend, project_id: &str) -> Vec<QueryHistoryEntry> {
    match backend.query_history(project_id).await {
        Ok(history) => history,
        Err(e) => {
            tracing::error!(project_id, error = %e, "failed to load query history");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Endpoint, MockBackend, MockCall, MockFailure};

    fn reviewed(id: &str, title: &str, authors: &str) -> Paper {
        let mut p = Paper::new(id, title);
        p.authors = authors.into();
        p.status = ReviewStatus::Reviewed;
        p
    }

    fn sample() -> Vec<Paper> {
        let mut bert = Paper::new("b", "BERT: Pre-training of Deep Bidirectional Transformers");
        bert.authors = "J Devlin, MW Chang".into();
        vec![
            reviewed("a", "Attention is all you need", "A Vaswani, N Shazeer"),
            bert,
        ]
    }

    #[test]
    fn filter_matches_title_or_authors_ignoring_case() {
        let mut collection = PaperCollection::new(sample());
        collection.set_filter("DEVLIN");
        let visible = collection.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "b");

        collection.set_filter("attention");
        assert_eq!(collection.visible()[0].id, "a");

        collection.set_filter("");
        assert_eq!(collection.visible().len(), 2);
    }

    #[test]
    fn stats_count_everything() {
        let mut collection = PaperCollection::new(sample());
        collection.set_filter("nothing matches this");
        assert_eq!(collection.stats().to_string(), "2 papers | 1 reviewed");
    }

    #[tokio::test]
    async fn rejected_list_is_empty_but_unreachable_falls_back() {
        let store = LocalStore::in_memory();
        store.append_paper(&Paper::new("local", "Buffered")).unwrap();

        let rejected = MockBackend::new()
            .with_papers(sample())
            .failing(Endpoint::ListPapers, MockFailure::Status(500, None));
        let loaded = load_papers(&rejected, &store, "default").await;
        assert!(loaded.papers.is_empty());
        assert_eq!(loaded.source, PaperSource::Backend);

        let down = MockBackend::new().failing(Endpoint::ListPapers, MockFailure::Unreachable);
        let loaded = load_papers(&down, &store, "default").await;
        assert_eq!(loaded.source, PaperSource::LocalBuffer);
        assert_eq!(loaded.papers[0].id, "local");
    }

    #[tokio::test]
    async fn toggle_sends_flipped_status() {
        let backend = MockBackend::new().with_papers(sample());
        let papers = sample();
        assert_eq!(
            toggle_status(&backend, &papers[1]).await.unwrap(),
            ReviewStatus::Reviewed
        );
        assert_eq!(
            backend.calls(),
            vec![MockCall::UpdateStatus("b".into(), ReviewStatus::Reviewed)]
        );
        assert!(backend.papers()[1].is_reviewed());
    }

    #[tokio::test]
    async fn remove_clears_local_buffer_even_on_404() {
        let backend = MockBackend::new();
        let store = LocalStore::in_memory();
        store.append_paper(&Paper::new("gone", "Gone")).unwrap();

        remove_paper(&backend, &store, "gone").await.unwrap();

        assert!(store.saved_papers().unwrap().is_empty());
        assert_eq!(backend.call_count(Endpoint::DeletePaper), 1);
    }

    #[tokio::test]
    async fn remove_aborts_when_unreachable() {
        let backend = MockBackend::new().failing(Endpoint::DeletePaper, MockFailure::Unreachable);
        let store = LocalStore::in_memory();
        store.append_paper(&Paper::new("p", "P")).unwrap();

        assert!(remove_paper(&backend, &store, "p").await.is_err());
        assert_eq!(store.saved_papers().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn history_failure_is_empty() {
        let backend = MockBackend::new().failing(Endpoint::QueryHistory, MockFailure::Unreachable);
        assert!(load_history(&backend, "default").await.is_empty());
    }
}
