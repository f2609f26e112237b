use slr_core::assistant::{AssistantError, QueryForm};
use slr_core::curation::LoadedPapers;
use slr_core::sidebar::{ConnectionStatus, NewProjectForm, ProjectFormError};
use slr_core::{Paper, Project, QueryHistoryEntry, QuerySuggestion, ReviewStatus};

/// Commands sent from the TUI to the backend task. Each one runs on its own
/// tokio task; replies arrive as [`BackendEvent`]s in completion order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    CheckConnection,
    LoadProjects,
    CreateProject(NewProjectForm),
    /// Remember the selected project across sessions.
    SelectProject(String),
    LoadPapers { project_id: String },
    ToggleStatus(Paper),
    RemovePaper { paper_id: String },
    LoadHistory { project_id: String },
    GenerateQueries(QueryForm),
    SaveApiKey(String),
    /// Open a Scholar search; `log_to` records it in that project's history.
    OpenQuery {
        query: String,
        log_to: Option<String>,
    },
    OpenUrl(String),
}

/// Events flowing from the backend task to the TUI.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    Connection(ConnectionStatus),
    /// `Err` carries a message; the current options stay as they are.
    Projects(Result<Vec<Project>, String>),
    ProjectCreated(Result<Project, ProjectFormError>),
    Papers {
        project_id: String,
        loaded: LoadedPapers,
    },
    StatusToggled {
        paper_id: String,
        result: Result<ReviewStatus, String>,
    },
    PaperRemoved {
        paper_id: String,
        result: Result<(), String>,
    },
    History {
        project_id: String,
        entries: Vec<QueryHistoryEntry>,
    },
    Queries(Result<Vec<QuerySuggestion>, AssistantError>),
    /// Anything that only needs a notice (browser launch failures, storage errors).
    Failed(String),
    /// Papers changed in another process or task.
    PapersChanged,
}
