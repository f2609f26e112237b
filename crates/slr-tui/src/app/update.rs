use slr_core::Notice;
use slr_core::sidebar::ConnectionStatus;

use super::{App, AssistantFocus, DbTab, EditTarget, InputMode, ModalField, ProjectModal, Tab};
use crate::action::Action;
use crate::tui_event::BackendCommand;

impl App {
    /// Process a user action and update state. Returns true if the app should quit.
    pub fn update(&mut self, action: Action) -> bool {
        match action {
            Action::Tick => {
                self.tick = self.tick.wrapping_add(1);
                if self.notice.as_ref().is_some_and(|n| n.is_expired()) {
                    self.notice = None;
                }
                return false;
            }
            Action::Resize(_w, h) => {
                self.visible_rows = (h as usize).saturating_sub(6);
                return false;
            }
            Action::Quit => {
                self.should_quit = true;
                return true;
            }
            _ => {}
        }

        // Help overlay swallows everything until closed
        if self.show_help {
            if matches!(action, Action::ToggleHelp | Action::NavigateBack) {
                self.show_help = false;
            }
            return false;
        }

        if self.modal.is_some() {
            self.update_modal(action);
            return false;
        }

        if let Some(target) = self.editing {
            self.update_editing(target, action);
            return false;
        }

        match action {
            Action::NextTab => {
                self.tab = match self.tab {
                    Tab::Assistant => Tab::Database,
                    Tab::Database => Tab::Assistant,
                };
            }
            Action::ShowAssistant => self.tab = Tab::Assistant,
            Action::ShowDatabase => self.tab = Tab::Database,
            Action::ToggleHelp => self.show_help = true,
            Action::CycleTheme => self.cycle_theme(),
            Action::NewProject => {
                self.modal = Some(ProjectModal::new());
                self.input_mode = InputMode::TextInput;
            }
            Action::NextProject | Action::PrevProject => {
                let before = self.current_project().to_string();
                if action == Action::NextProject {
                    self.projects.select_next();
                } else {
                    self.projects.select_prev();
                }
                if self.current_project() != before {
                    self.switch_project();
                }
            }
            Action::Reconnect => {
                self.connection = ConnectionStatus::Connecting;
                self.send(BackendCommand::CheckConnection);
            }
            _ => match self.tab {
                Tab::Assistant => self.update_assistant(action),
                Tab::Database => self.update_database(action),
            },
        }
        false
    }

    /// The selection changed: remember it and load the new project's data.
    fn switch_project(&mut self) {
        self.paper_cursor = 0;
        self.history_cursor = 0;
        self.papers_loaded = false;
        self.send(BackendCommand::SelectProject(
            self.current_project().to_string(),
        ));
        self.reload_project_data();
    }

    fn start_editing(&mut self, target: EditTarget) {
        self.editing = Some(target);
        self.input_mode = InputMode::TextInput;
    }

    fn stop_editing(&mut self) {
        self.editing = None;
        self.input_mode = InputMode::Normal;
    }

    fn update_editing(&mut self, target: EditTarget, action: Action) {
        let buffer = match target {
            EditTarget::Abstract => &mut self.assistant.form.abstract_text,
            EditTarget::ApiKey => &mut self.assistant.form.api_key,
            EditTarget::Filter => {
                let mut filter = self.papers.filter().to_string();
                match action {
                    Action::Input(c) => filter.push(c),
                    Action::Backspace => {
                        filter.pop();
                    }
                    Action::Cancel => filter.clear(),
                    Action::Submit | Action::NextField => {}
                    _ => return,
                }
                self.papers.set_filter(&filter);
                self.paper_cursor = 0;
                if matches!(action, Action::Submit | Action::Cancel | Action::NextField) {
                    self.stop_editing();
                }
                return;
            }
        };

        match action {
            Action::Input(c) => buffer.push(c),
            Action::Backspace => {
                buffer.pop();
            }
            Action::Submit | Action::Cancel | Action::NextField => {
                self.stop_editing();
                if target == EditTarget::ApiKey {
                    let key = self.assistant.form.api_key.trim().to_string();
                    self.send(BackendCommand::SaveApiKey(key));
                }
                if action == Action::NextField {
                    self.assistant.move_focus(1);
                }
            }
            _ => {}
        }
    }

    fn update_modal(&mut self, action: Action) {
        let Some(modal) = &mut self.modal else {
            return;
        };
        match action {
            Action::Input(c) => modal.buffer().push(c),
            Action::Backspace => {
                modal.buffer().pop();
            }
            Action::NextField => {
                modal.field = match modal.field {
                    ModalField::Id => ModalField::Name,
                    ModalField::Name => ModalField::Id,
                };
            }
            Action::Submit => {
                if modal.submitting {
                    return;
                }
                match modal.form.validate() {
                    Ok(_) => {
                        modal.submitting = true;
                        let form = modal.form.clone();
                        self.send(BackendCommand::CreateProject(form));
                    }
                    Err(e) => self.notice = Some(Notice::warning(e.to_string())),
                }
            }
            Action::Cancel | Action::NavigateBack => {
                self.modal = None;
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
    }

    fn generate(&mut self) {
        if self.assistant.generating {
            return;
        }
        match self.assistant.form.validate() {
            Ok(_) => {
                self.assistant.generating = true;
                self.assistant.error = None;
                self.assistant.queries.clear();
                self.send(BackendCommand::GenerateQueries(self.assistant.form.clone()));
            }
            Err(e) => self.notice = Some(Notice::warning(e.to_string())),
        }
    }

    fn open_query(&mut self, query: String) {
        self.notice = Some(Notice::info("Opening Google Scholar..."));
        self.send(BackendCommand::OpenQuery {
            query,
            log_to: Some(self.current_project().to_string()),
        });
    }

    fn copy(&mut self, text: String, message: &str) {
        self.pending_copy = Some(text);
        self.notice = Some(Notice::success(message));
    }

    fn update_assistant(&mut self, action: Action) {
        let focus = self.assistant.focus;
        match action {
            Action::MoveDown => self.assistant.move_focus(1),
            Action::MoveUp => self.assistant.move_focus(-1),
            Action::GoTop => self.assistant.focus = AssistantFocus::Abstract,
            Action::GoBottom => self.assistant.focus_last(),
            Action::Left if focus == AssistantFocus::Strategy => self.assistant.cycle_strategy(-1),
            Action::Right if focus == AssistantFocus::Strategy => self.assistant.cycle_strategy(1),
            Action::Refresh => self.send(BackendCommand::LoadProjects),
            Action::Toggle => {
                if let AssistantFocus::Site(i) = focus {
                    self.assistant.toggle_site(i);
                }
            }
            Action::Activate | Action::OpenLink => match focus {
                AssistantFocus::Abstract if action == Action::Activate => {
                    self.start_editing(EditTarget::Abstract)
                }
                AssistantFocus::ApiKey if action == Action::Activate => {
                    self.start_editing(EditTarget::ApiKey)
                }
                AssistantFocus::Strategy => self.assistant.cycle_strategy(1),
                AssistantFocus::Site(i) => self.assistant.toggle_site(i),
                AssistantFocus::Generate => self.generate(),
                AssistantFocus::Query(_) => {
                    if let Some(q) = self.assistant.focused_query() {
                        let query = q.query.clone();
                        self.open_query(query);
                    }
                }
                _ => {}
            },
            Action::CopyToClipboard => {
                if let Some(q) = self.assistant.focused_query() {
                    let query = q.query.clone();
                    self.copy(query, "Query copied!");
                }
            }
            _ => {}
        }
    }

    fn list_len(&self) -> usize {
        match self.db_tab {
            DbTab::Papers => self.visible_papers().len(),
            DbTab::History => self.history.len(),
        }
    }

    fn cursor_mut(&mut self) -> &mut usize {
        match self.db_tab {
            DbTab::Papers => &mut self.paper_cursor,
            DbTab::History => &mut self.history_cursor,
        }
    }

    fn update_database(&mut self, action: Action) {
        let len = self.list_len();
        match action {
            Action::Left | Action::Right => {
                self.db_tab = match self.db_tab {
                    DbTab::Papers => DbTab::History,
                    DbTab::History => DbTab::Papers,
                };
            }
            Action::MoveDown => {
                let cursor = self.cursor_mut();
                if *cursor + 1 < len {
                    *cursor += 1;
                }
            }
            Action::MoveUp => {
                let cursor = self.cursor_mut();
                *cursor = cursor.saturating_sub(1);
            }
            Action::GoTop => *self.cursor_mut() = 0,
            Action::GoBottom => *self.cursor_mut() = len.saturating_sub(1),
            Action::Refresh => self.reload_project_data(),
            _ => match self.db_tab {
                DbTab::Papers => self.update_papers(action),
                DbTab::History => self.update_history(action),
            },
        }
    }

    fn update_papers(&mut self, action: Action) {
        match action {
            Action::StartFilter => {
                self.start_editing(EditTarget::Filter);
                return;
            }
            Action::NavigateBack => {
                if !self.papers.filter().is_empty() {
                    self.papers.set_filter("");
                    self.paper_cursor = 0;
                }
                return;
            }
            _ => {}
        }

        let Some(paper) = self.selected_paper().cloned() else {
            return;
        };
        match action {
            Action::Toggle => self.send(BackendCommand::ToggleStatus(paper)),
            Action::RemovePaper => self.send(BackendCommand::RemovePaper { paper_id: paper.id }),
            Action::Activate | Action::OpenLink => {
                if paper.url.is_empty() {
                    self.notice = Some(Notice::info("This paper has no link"));
                } else {
                    self.send(BackendCommand::OpenUrl(paper.url));
                }
            }
            Action::OpenPdf => match paper.pdf_url {
                Some(url) => self.send(BackendCommand::OpenUrl(url)),
                None => self.notice = Some(Notice::info("No PDF available")),
            },
            Action::CopyToClipboard => {
                let text = if paper.url.is_empty() {
                    paper.title
                } else {
                    paper.url
                };
                self.copy(text, "Copied!");
            }
            _ => {}
        }
    }

    fn update_history(&mut self, action: Action) {
        let Some(entry) = self.selected_history().cloned() else {
            return;
        };
        match action {
            Action::Activate | Action::OpenLink => {
                self.notice = Some(Notice::info("Opening Google Scholar..."));
                self.send(BackendCommand::OpenQuery {
                    query: entry.query,
                    log_to: None,
                });
            }
            Action::CopyToClipboard => self.copy(entry.query, "Query copied!"),
            _ => {}
        }
    }
}
