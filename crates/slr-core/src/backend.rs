//! The backend seam: everything the client persists or generates goes
//! through this trait.

use std::future::Future;
use std::pin::Pin;

use crate::{
    CoreError, GenerateQueriesRequest, Paper, Project, QueryHistoryEntry, QuerySuggestion,
    ReviewStatus,
};

/// Boxed future returned by every [`Backend`] method.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CoreError>> + Send + 'a>>;

/// The curation backend. [`BackendClient`](crate::BackendClient) talks to it
/// over HTTP; [`MockBackend`](crate::mock::MockBackend) stands in for tests.
pub trait Backend: Send + Sync {
    /// Connectivity probe. `Ok(false)` means the backend answered with a non-2xx status.
    fn health(&self) -> BackendFuture<'_, bool>;

    fn list_projects(&self) -> BackendFuture<'_, Vec<Project>>;

    fn create_project<'a>(&'a self, project: &'a Project) -> BackendFuture<'a, Project>;

    /// Insert or replace a paper, keyed by its id.
    fn save_paper<'a>(&'a self, paper: &'a Paper) -> BackendFuture<'a, Paper>;

    fn list_papers<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Paper>>;

    fn delete_paper<'a>(&'a self, paper_id: &'a str) -> BackendFuture<'a, ()>;

    fn update_status<'a>(
        &'a self,
        paper_id: &'a str,
        status: ReviewStatus,
    ) -> BackendFuture<'a, ()>;

    fn generate_queries<'a>(
        &'a self,
        request: &'a GenerateQueriesRequest,
    ) -> BackendFuture<'a, Vec<QuerySuggestion>>;

    /// Append an executed query to the project's history.
    fn log_query<'a>(&'a self, query: &'a str, project_id: &'a str) -> BackendFuture<'a, ()>;

    fn query_history<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BackendFuture<'a, Vec<QueryHistoryEntry>>;
}
