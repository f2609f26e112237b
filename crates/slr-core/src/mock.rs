//! Mock backend for testing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::{Backend, BackendFuture};
use crate::{
    CoreError, GenerateQueriesRequest, Paper, Project, QueryHistoryEntry, QuerySuggestion,
    ReviewStatus,
};

/// The backend operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Health,
    ListProjects,
    CreateProject,
    SavePaper,
    ListPapers,
    DeletePaper,
    UpdateStatus,
    GenerateQueries,
    LogQuery,
    QueryHistory,
}

/// One recorded call, with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Health,
    ListProjects,
    CreateProject(Project),
    SavePaper(Paper),
    ListPapers(String),
    DeletePaper(String),
    UpdateStatus(String, ReviewStatus),
    GenerateQueries(GenerateQueriesRequest),
    LogQuery { query: String, project_id: String },
    QueryHistory(String),
}

impl MockCall {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            MockCall::Health => Endpoint::Health,
            MockCall::ListProjects => Endpoint::ListProjects,
            MockCall::CreateProject(_) => Endpoint::CreateProject,
            MockCall::SavePaper(_) => Endpoint::SavePaper,
            MockCall::ListPapers(_) => Endpoint::ListPapers,
            MockCall::DeletePaper(_) => Endpoint::DeletePaper,
            MockCall::UpdateStatus(..) => Endpoint::UpdateStatus,
            MockCall::GenerateQueries(_) => Endpoint::GenerateQueries,
            MockCall::LogQuery { .. } => Endpoint::LogQuery,
            MockCall::QueryHistory(_) => Endpoint::QueryHistory,
        }
    }
}

/// How an injected failure presents itself.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// The backend answered with a non-2xx status and optional `detail`.
    Status(u16, Option<String>),
    /// The request never reached the backend.
    Unreachable,
}

impl MockFailure {
    fn to_error(&self) -> CoreError {
        match self {
            MockFailure::Status(status, detail) => CoreError::Status {
                status: *status,
                detail: detail.clone(),
            },
            MockFailure::Unreachable => CoreError::Unreachable("connection refused".into()),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    projects: Vec<Project>,
    papers: Vec<Paper>,
    history: Vec<QueryHistoryEntry>,
    queries: Vec<QuerySuggestion>,
}

/// A hand-rolled in-memory [`Backend`] for tests.
///
/// Behaves like the reference server (upsert by id, 404 on unknown deletes,
/// 400 on duplicate project ids) unless a failure is injected for an
/// endpoint with [`failing()`](MockBackend::failing). Every call is
/// recorded, including failed ones.
pub struct MockBackend {
    state: Mutex<MockState>,
    failures: Mutex<HashMap<Endpoint, MockFailure>>,
    calls: Mutex<Vec<MockCall>>,
    delay: Option<Duration>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_projects(self, projects: Vec<Project>) -> Self {
        self.lock_state().projects = projects;
        self
    }

    pub fn with_papers(self, papers: Vec<Paper>) -> Self {
        self.lock_state().papers = papers;
        self
    }

    pub fn with_history(self, history: Vec<QueryHistoryEntry>) -> Self {
        self.lock_state().history = history;
        self
    }

    /// Suggestions returned by every `generate_queries` call.
    pub fn with_queries(self, queries: Vec<QuerySuggestion>) -> Self {
        self.lock_state().queries = queries;
        self
    }

    /// Make every call to `endpoint` fail.
    pub fn failing(self, endpoint: Endpoint, failure: MockFailure) -> Self {
        self.set_failure(endpoint, Some(failure));
        self
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Inject or clear a failure after construction.
    pub fn set_failure(&self, endpoint: Endpoint, failure: Option<MockFailure>) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        match failure {
            Some(f) => failures.insert(endpoint, f),
            None => failures.remove(&endpoint),
        };
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.endpoint() == endpoint)
            .count()
    }

    /// Papers currently held by the mock.
    pub fn papers(&self) -> Vec<Paper> {
        self.lock_state().papers.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the call and return the injected failure, if any.
    fn enter(&self, call: MockCall) -> Result<(), CoreError> {
        let endpoint = call.endpoint();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&endpoint)
        {
            Some(f) => Err(f.to_error()),
            None => Ok(()),
        }
    }

    async fn pause(&self) {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
    }
}

fn not_found(what: &str) -> CoreError {
    CoreError::Status {
        status: 404,
        detail: Some(format!("{} not found", what)),
    }
}

impl Backend for MockBackend {
    fn health(&self) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            self.pause().await;
            match self.enter(MockCall::Health) {
                Ok(()) => Ok(true),
                Err(CoreError::Status { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        })
    }

    fn list_projects(&self) -> BackendFuture<'_, Vec<Project>> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::ListProjects)?;
            Ok(self.lock_state().projects.clone())
        })
    }

    fn create_project<'a>(&'a self, project: &'a Project) -> BackendFuture<'a, Project> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::CreateProject(project.clone()))?;
            let mut state = self.lock_state();
            if state.projects.iter().any(|p| p.id == project.id) {
                return Err(CoreError::Status {
                    status: 400,
                    detail: Some("Project ID already exists".into()),
                });
            }
            state.projects.push(project.clone());
            Ok(project.clone())
        })
    }

    fn save_paper<'a>(&'a self, paper: &'a Paper) -> BackendFuture<'a, Paper> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::SavePaper(paper.clone()))?;
            let mut state = self.lock_state();
            match state.papers.iter_mut().find(|p| p.id == paper.id) {
                Some(existing) => *existing = paper.clone(),
                None => state.papers.push(paper.clone()),
            }
            Ok(paper.clone())
        })
    }

    fn list_papers<'a>(&'a self, project_id: &'a str) -> BackendFuture<'a, Vec<Paper>> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::ListPapers(project_id.to_string()))?;
            Ok(self
                .lock_state()
                .papers
                .iter()
                .filter(|p| p.project_id == project_id)
                .cloned()
                .collect())
        })
    }

    fn delete_paper<'a>(&'a self, paper_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::DeletePaper(paper_id.to_string()))?;
            let mut state = self.lock_state();
            let before = state.papers.len();
            state.papers.retain(|p| p.id != paper_id);
            if state.papers.len() == before {
                return Err(not_found("Paper"));
            }
            Ok(())
        })
    }

    fn update_status<'a>(
        &'a self,
        paper_id: &'a str,
        status: ReviewStatus,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::UpdateStatus(paper_id.to_string(), status))?;
            match self
                .lock_state()
                .papers
                .iter_mut()
                .find(|p| p.id == paper_id)
            {
                Some(paper) => {
                    paper.status = status;
                    Ok(())
                }
                None => Err(not_found("Paper")),
            }
        })
    }

    fn generate_queries<'a>(
        &'a self,
        request: &'a GenerateQueriesRequest,
    ) -> BackendFuture<'a, Vec<QuerySuggestion>> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::GenerateQueries(request.clone()))?;
            Ok(self.lock_state().queries.clone())
        })
    }

    fn log_query<'a>(&'a self, query: &'a str, project_id: &'a str) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::LogQuery {
                query: query.to_string(),
                project_id: project_id.to_string(),
            })?;
            self.lock_state().history.push(QueryHistoryEntry {
                query: query.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                project_id: project_id.to_string(),
            });
            Ok(())
        })
    }

    fn query_history<'a>(
        &'a self,
        project_id: &'a str,
    ) -> BackendFuture<'a, Vec<QueryHistoryEntry>> {
        Box::pin(async move {
            self.pause().await;
            self.enter(MockCall::QueryHistory(project_id.to_string()))?;
            Ok(self
                .lock_state()
                .history
                .iter()
                .filter(|h| h.project_id == project_id)
                .cloned()
                .collect())
        })
    }
}
