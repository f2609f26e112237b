use slr_core::sidebar::ProjectFormError;
use slr_core::Notice;

use super::{App, AssistantFocus, InputMode};
use crate::tui_event::{BackendCommand, BackendEvent};

impl App {
    /// Process a backend event and update model state.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::Connection(status) => {
                self.connection = status;
            }
            BackendEvent::Projects(Ok(projects)) => {
                let before = self.current_project().to_string();
                self.projects.replace_options(projects);
                if let Some(id) = self.pending_select.take() {
                    self.projects.select(&id);
                }
                if self.current_project() != before {
                    self.send(BackendCommand::SelectProject(
                        self.current_project().to_string(),
                    ));
                }
                self.reload_project_data();
            }
            BackendEvent::Projects(Err(message)) => {
                self.pending_select = None;
                self.notice = Some(Notice::error(message));
                if !self.papers_loaded {
                    self.reload_project_data();
                }
            }
            BackendEvent::ProjectCreated(Ok(project)) => {
                self.modal = None;
                self.input_mode = InputMode::Normal;
                self.pending_select = Some(project.id);
                self.notice = Some(Notice::success("Project created!"));
                self.send(BackendCommand::LoadProjects);
            }
            BackendEvent::ProjectCreated(Err(e)) => {
                if let Some(modal) = &mut self.modal {
                    modal.submitting = false;
                }
                self.notice = Some(match &e {
                    ProjectFormError::MissingFields => Notice::warning(e.to_string()),
                    ProjectFormError::Backend(message) => Notice::error(message.clone()),
                });
            }
            BackendEvent::Papers { project_id, loaded } => {
                if project_id != self.current_project() {
                    tracing::debug!(%project_id, "dropping papers of a project no longer selected");
                    return;
                }
                self.papers.replace(loaded.papers);
                self.paper_source = loaded.source;
                self.papers_loaded = true;
                let visible = self.visible_papers().len();
                self.paper_cursor = self.paper_cursor.min(visible.saturating_sub(1));
            }
            BackendEvent::StatusToggled { result, .. } => match result {
                Ok(_) => self.reload_papers(),
                Err(message) => self.notice = Some(Notice::error(message)),
            },
            BackendEvent::PaperRemoved { result, .. } => match result {
                Ok(()) => {
                    self.notice = Some(Notice::success("Paper removed"));
                    self.reload_papers();
                }
                Err(message) => self.notice = Some(Notice::error(message)),
            },
            BackendEvent::History {
                project_id,
                entries,
            } => {
                if project_id != self.current_project() {
                    return;
                }
                self.history = entries;
                self.history_cursor = self
                    .history_cursor
                    .min(self.history.len().saturating_sub(1));
            }
            BackendEvent::Queries(result) => {
                self.assistant.generating = false;
                self.assistant.generated = true;
                match result {
                    Ok(queries) => {
                        self.assistant.queries = queries;
                        self.assistant.error = None;
                        if let AssistantFocus::Query(i) = self.assistant.focus
                            && i >= self.assistant.queries.len()
                        {
                            self.assistant.focus = AssistantFocus::Generate;
                        }
                    }
                    Err(e) if e.is_warning() => {
                        self.notice = Some(Notice::warning(e.to_string()));
                    }
                    Err(e) => {
                        self.assistant.queries.clear();
                        if matches!(self.assistant.focus, AssistantFocus::Query(_)) {
                            self.assistant.focus = AssistantFocus::Generate;
                        }
                        self.assistant.error = Some(format!("Error: {}", e));
                    }
                }
            }
            BackendEvent::Failed(message) => {
                self.notice = Some(Notice::error(message));
            }
            BackendEvent::PapersChanged => self.reload_papers(),
        }
    }
}
