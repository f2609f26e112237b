//! Connection status, project selection and project creation.

use thiserror::Error;

use crate::backend::Backend;
use crate::{CoreError, DEFAULT_PROJECT_ID, Project};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Offline,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Offline => "Offline",
        }
    }

    pub fn is_connected(&self) -> bool {
        *self == ConnectionStatus::Connected
    }
}

/// Probe the backend. Anything but a 2xx answer counts as offline.
pub async fn check_connection(backend: &dyn Backend) -> ConnectionStatus {
    match backend.health().await {
        Ok(true) => ConnectionStatus::Connected,
        Ok(false) => ConnectionStatus::Offline,
        Err(e) => {
            tracing::error!(error = %e, "connection check failed");
            ConnectionStatus::Offline
        }
    }
}

/// Fetch the project list. On failure the caller keeps what it has.
pub async fn load_projects(backend: &dyn Backend) -> Result<Vec<Project>, CoreError> {
    backend.list_projects().await.inspect_err(|e| {
        tracing::error!(error = %e, "failed to load projects");
    })
}

/// The project drop-down.
#[derive(Debug, Clone, Default)]
pub struct ProjectSelector {
    options: Vec<Project>,
    selected: Option<String>,
}

impl ProjectSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `project_id` selected, e.g. the stored `currentProject`.
    pub fn with_selected(project_id: impl Into<String>) -> Self {
        Self {
            options: Vec::new(),
            selected: Some(project_id.into()),
        }
    }

    /// Repopulate in the given order. The previous selection survives if it
    /// is still offered; otherwise the first option becomes selected.
    pub fn replace_options(&mut self, projects: Vec<Project>) {
        let keep = self
            .selected
            .as_ref()
            .is_some_and(|id| projects.iter().any(|p| &p.id == id));
        if !keep {
            self.selected = projects.first().map(|p| p.id.clone());
        }
        self.options = projects;
    }

    pub fn options(&self) -> &[Project] {
        &self.options
    }

    /// Select `project_id` if it is one of the options.
    pub fn select(&mut self, project_id: &str) -> bool {
        if self.options.iter().any(|p| p.id == project_id) {
            self.selected = Some(project_id.to_string());
            true
        } else {
            false
        }
    }

    /// Id of the selected project, `default` when there is none.
    pub fn selected_id(&self) -> &str {
        self.selected.as_deref().unwrap_or(DEFAULT_PROJECT_ID)
    }

    pub fn selected(&self) -> Option<&Project> {
        let id = self.selected.as_deref()?;
        self.options.iter().find(|p| p.id == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let id = self.selected.as_deref()?;
        self.options.iter().position(|p| p.id == id)
    }

    /// Move the selection one option down, wrapping around.
    pub fn select_next(&mut self) {
        if self.options.is_empty() {
            return;
        }
        let next = self
            .selected_index()
            .map_or(0, |i| (i + 1) % self.options.len());
        self.selected = Some(self.options[next].id.clone());
    }

    pub fn select_prev(&mut self) {
        if self.options.is_empty() {
            return;
        }
        let len = self.options.len();
        let prev = self.selected_index().map_or(0, |i| (i + len - 1) % len);
        self.selected = Some(self.options[prev].id.clone());
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectFormError {
    #[error("Please fill in both fields")]
    MissingFields,
    #[error("{0}")]
    Backend(String),
}

/// Contents of the "new project" modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProjectForm {
    pub id: String,
    pub name: String,
}

impl NewProjectForm {
    pub fn validate(&self) -> Result<Project, ProjectFormError> {
        let id = self.id.trim();
        let name = self.name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(ProjectFormError::MissingFields);
        }
        Ok(Project::new(id, name))
    }

    pub fn clear(&mut self) {
        self.id.clear();
        self.name.clear();
    }
}

/// Validate and create a project. Nothing is sent when a field is blank.
pub async fn create_project(
    backend: &dyn Backend,
    form: &NewProjectForm,
) -> Result<Project, ProjectFormError> {
    let project = form.validate()?;
    match backend.create_project(&project).await {
        Ok(created) => {
            tracing::info!(project_id = %created.id, "project created");
            Ok(created)
        }
        Err(e) => {
            tracing::error!(project_id = %project.id, error = %e, "failed to create project");
            let message = match &e {
                CoreError::Status {
                    detail: Some(detail),
                    ..
                } => detail.clone(),
                _ => "Failed to create project".to_string(),
            };
            Err(ProjectFormError::Backend(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Endpoint, MockBackend, MockFailure};

    fn projects() -> Vec<Project> {
        vec![
            Project::new("default", "Default Project"),
            Project::new("thesis", "Thesis"),
        ]
    }

    #[tokio::test]
    async fn selector_keeps_order_and_selection() {
        let backend = MockBackend::new().with_projects(projects());
        let mut selector = ProjectSelector::with_selected("thesis");

        selector.replace_options(load_projects(&backend).await.unwrap());

        let ids: Vec<_> = selector.options().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["default", "thesis"]);
        assert_eq!(selector.selected_id(), "thesis");
    }

    #[test]
    fn vanished_selection_falls_back_to_first() {
        let mut selector = ProjectSelector::with_selected("gone");
        selector.replace_options(projects());
        assert_eq!(selector.selected_id(), "default");
        assert_eq!(selector.selected_index(), Some(0));
    }

    #[test]
    fn empty_selector_reports_default() {
        let mut selector = ProjectSelector::new();
        selector.select_next();
        assert_eq!(selector.selected_id(), DEFAULT_PROJECT_ID);
        assert!(!selector.select("thesis"));
    }

    #[test]
    fn next_and_prev_wrap() {
        let mut selector = ProjectSelector::new();
        selector.replace_options(projects());
        selector.select_next();
        assert_eq!(selector.selected_id(), "thesis");
        selector.select_next();
        assert_eq!(selector.selected_id(), "default");
        selector.select_prev();
        assert_eq!(selector.selected_id(), "thesis");
    }

    #[tokio::test]
    async fn connection_states() {
        assert_eq!(
            check_connection(&MockBackend::new()).await,
            ConnectionStatus::Connected
        );
        let rejected = MockBackend::new().failing(Endpoint::Health, MockFailure::Status(503, None));
        assert_eq!(check_connection(&rejected).await, ConnectionStatus::Offline);
        let down = MockBackend::new().failing(Endpoint::Health, MockFailure::Unreachable);
        assert_eq!(check_connection(&down).await.label(), "Offline");
    }

    #[tokio::test]
    async fn blank_form_sends_nothing() {
        let backend = MockBackend::new();
        let form = NewProjectForm {
            id: "x".into(),
            name: "  ".into(),
        };
        let err = create_project(&backend, &form).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in both fields");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_surfaces_detail() {
        let backend = MockBackend::new().with_projects(projects());
        let form = NewProjectForm {
            id: "thesis".into(),
            name: "Again".into(),
        };
        let err = create_project(&backend, &form).await.unwrap_err();
        assert_eq!(
            err,
            ProjectFormError::Backend("Project ID already exists".into())
        );
    }

    #[tokio::test]
    async fn unreachable_uses_generic_message() {
        let backend = MockBackend::new().failing(Endpoint::CreateProject, MockFailure::Unreachable);
        let form = NewProjectForm {
            id: "new".into(),
            name: "New".into(),
        };
        assert_eq!(
            create_project(&backend, &form).await.unwrap_err().to_string(),
            "Failed to create project"
        );
    }
}
