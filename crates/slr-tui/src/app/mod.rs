mod events;
mod update;

use std::io::Write;

use ratatui::layout::{Constraint, Layout};
use slr_core::assistant::{DEFAULT_SITES, QueryForm, STRATEGIES};
use slr_core::curation::{PaperCollection, PaperSource};
use slr_core::sidebar::{ConnectionStatus, NewProjectForm, ProjectSelector};
use slr_core::{Notice, Paper, QueryHistoryEntry, QuerySuggestion};
use tokio::sync::mpsc;

use crate::theme::Theme;
use crate::tui_event::BackendCommand;

/// Main tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Assistant,
    Database,
}

/// Sub-tabs of the Database tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbTab {
    Papers,
    History,
}

/// Input mode determines how keyboard input is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    TextInput,
}

/// Which text buffer keystrokes go to while in [`InputMode::TextInput`]
/// outside the project modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Abstract,
    ApiKey,
    Filter,
}

/// Focusable rows of the Assistant tab, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantFocus {
    Abstract,
    ApiKey,
    Strategy,
    Site(usize),
    Generate,
    Query(usize),
}

#[derive(Debug, Clone)]
pub struct AssistantState {
    pub form: QueryForm,
    pub focus: AssistantFocus,
    pub queries: Vec<QuerySuggestion>,
    pub generating: bool,
    /// Inline error from the last generation attempt.
    pub error: Option<String>,
    /// At least one generation has finished, so an empty result is meaningful.
    pub generated: bool,
}

impl AssistantState {
    pub fn new(strategy: &str, sites: Vec<String>, api_key: Option<String>) -> Self {
        Self {
            form: QueryForm {
                abstract_text: String::new(),
                strategy: strategy.to_string(),
                sites,
                api_key: api_key.unwrap_or_default(),
            },
            focus: AssistantFocus::Abstract,
            queries: Vec::new(),
            generating: false,
            error: None,
            generated: false,
        }
    }

    fn focus_order(&self) -> Vec<AssistantFocus> {
        let mut order = vec![
            AssistantFocus::Abstract,
            AssistantFocus::ApiKey,
            AssistantFocus::Strategy,
        ];
        order.extend((0..DEFAULT_SITES.len()).map(AssistantFocus::Site));
        order.push(AssistantFocus::Generate);
        order.extend((0..self.queries.len()).map(AssistantFocus::Query));
        order
    }

    pub fn move_focus(&mut self, delta: isize) {
        let order = self.focus_order();
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = (pos as isize + delta).clamp(0, order.len() as isize - 1) as usize;
        self.focus = order[next];
    }

    pub fn focus_last(&mut self) {
        if let Some(last) = self.focus_order().last() {
            self.focus = *last;
        }
    }

    pub fn strategy_index(&self) -> usize {
        STRATEGIES
            .iter()
            .position(|(value, _)| *value == self.form.strategy)
            .unwrap_or(0)
    }

    pub fn strategy_label(&self) -> &'static str {
        STRATEGIES[self.strategy_index()].1
    }

    pub fn cycle_strategy(&mut self, delta: isize) {
        let len = STRATEGIES.len() as isize;
        let next = (self.strategy_index() as isize + delta).rem_euclid(len) as usize;
        self.form.strategy = STRATEGIES[next].0.to_string();
    }

    pub fn site_selected(&self, site: &str) -> bool {
        self.form.sites.iter().any(|s| s == site)
    }

    /// Flip one site checkbox. Selected sites keep the display order.
    pub fn toggle_site(&mut self, index: usize) {
        let Some(site) = DEFAULT_SITES.get(index) else {
            return;
        };
        let selected = !self.site_selected(site);
        self.form.sites = DEFAULT_SITES
            .iter()
            .filter(|s| if **s == *site { selected } else { self.site_selected(s) })
            .map(|s| s.to_string())
            .collect();
    }

    pub fn focused_query(&self) -> Option<&QuerySuggestion> {
        match self.focus {
            AssistantFocus::Query(i) => self.queries.get(i),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalField {
    Id,
    Name,
}

/// The "new project" modal.
#[derive(Debug, Clone)]
pub struct ProjectModal {
    pub form: NewProjectForm,
    pub field: ModalField,
    pub submitting: bool,
}

impl ProjectModal {
    fn new() -> Self {
        Self {
            form: NewProjectForm::default(),
            field: ModalField::Id,
            submitting: false,
        }
    }

    fn buffer(&mut self) -> &mut String {
        match self.field {
            ModalField::Id => &mut self.form.id,
            ModalField::Name => &mut self.form.name,
        }
    }
}

pub struct App {
    pub tab: Tab,
    pub db_tab: DbTab,
    pub input_mode: InputMode,
    pub editing: Option<EditTarget>,
    pub theme: Theme,
    pub theme_name: String,
    pub tick: usize,
    pub should_quit: bool,
    pub show_help: bool,
    pub visible_rows: usize,

    pub connection: ConnectionStatus,
    pub projects: ProjectSelector,
    /// Project to select once the next project list arrives.
    pub pending_select: Option<String>,

    pub papers: PaperCollection,
    pub paper_source: PaperSource,
    pub paper_cursor: usize,
    pub papers_loaded: bool,
    pub history: Vec<QueryHistoryEntry>,
    pub history_cursor: usize,

    pub assistant: AssistantState,
    pub modal: Option<ProjectModal>,
    pub notice: Option<Notice>,

    /// Text waiting to be copied with OSC 52 after the next draw.
    pub pending_copy: Option<String>,
    pub backend_cmd_tx: Option<mpsc::UnboundedSender<BackendCommand>>,
}

impl App {
    pub fn new(theme_name: &str) -> Self {
        Self {
            tab: Tab::Assistant,
            db_tab: DbTab::Papers,
            input_mode: InputMode::Normal,
            editing: None,
            theme: Theme::by_name(theme_name),
            theme_name: theme_name.to_string(),
            tick: 0,
            should_quit: false,
            show_help: false,
            visible_rows: 20,
            connection: ConnectionStatus::Connecting,
            projects: ProjectSelector::new(),
            pending_select: None,
            papers: PaperCollection::default(),
            paper_source: PaperSource::Backend,
            paper_cursor: 0,
            papers_loaded: false,
            history: Vec::new(),
            history_cursor: 0,
            assistant: AssistantState::new(slr_core::assistant::DEFAULT_STRATEGY, Vec::new(), None),
            modal: None,
            notice: None,
            pending_copy: None,
            backend_cmd_tx: None,
        }
    }

    fn send(&self, cmd: BackendCommand) {
        match &self.backend_cmd_tx {
            Some(tx) => {
                if tx.send(cmd).is_err() {
                    tracing::warn!("backend task is gone, command dropped");
                }
            }
            None => tracing::debug!(?cmd, "no backend attached"),
        }
    }

    /// Initial requests: connectivity and the project list. Papers and
    /// history follow once the projects are known.
    pub fn start(&mut self) {
        self.connection = ConnectionStatus::Connecting;
        self.send(BackendCommand::CheckConnection);
        self.send(BackendCommand::LoadProjects);
    }

    pub fn current_project(&self) -> &str {
        self.projects.selected_id()
    }

    fn reload_papers(&self) {
        self.send(BackendCommand::LoadPapers {
            project_id: self.current_project().to_string(),
        });
    }

    fn reload_project_data(&self) {
        self.reload_papers();
        self.send(BackendCommand::LoadHistory {
            project_id: self.current_project().to_string(),
        });
    }

    pub fn visible_papers(&self) -> Vec<&Paper> {
        self.papers.visible()
    }

    pub fn selected_paper(&self) -> Option<&Paper> {
        self.visible_papers().get(self.paper_cursor).copied()
    }

    pub fn selected_history(&self) -> Option<&QueryHistoryEntry> {
        self.history.get(self.history_cursor)
    }

    fn cycle_theme(&mut self) {
        self.theme_name = if self.theme_name == "modern" {
            "hacker".to_string()
        } else {
            "modern".to_string()
        };
        self.theme = Theme::by_name(&self.theme_name);
    }

    /// Write any pending clipboard text to the terminal.
    pub fn flush_clipboard(&mut self) {
        if let Some(text) = self.pending_copy.take() {
            osc52_copy(&text);
        }
    }

    pub fn view(&mut self, f: &mut ratatui::Frame) {
        let chunks = Layout::vertical([
            Constraint::Length(1), // status bar
            Constraint::Length(1), // tabs
            Constraint::Min(3),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

        crate::view::status_bar::render_status(f, chunks[0], self);
        crate::view::status_bar::render_tabs(f, chunks[1], self);
        self.visible_rows = chunks[2].height.saturating_sub(2) as usize;
        match self.tab {
            Tab::Assistant => crate::view::assistant::render_in(f, self, chunks[2]),
            Tab::Database => crate::view::database::render_in(f, self, chunks[2]),
        }
        crate::view::status_bar::render_footer(f, chunks[3], self);

        if let Some(modal) = &self.modal {
            crate::view::modal::render(f, modal, &self.theme);
        }
        if self.show_help {
            crate::view::help::render(f, &self.theme);
        }
    }
}

/// Copy text to the system clipboard via OSC 52 escape sequence.
/// Works in Ghostty, iTerm2, kitty, WezTerm, and most modern terminals.
fn osc52_copy(text: &str) {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    let mut out = std::io::stdout();
    let _ = out.write_all(format!("\x1b]52;c;{}\x07", encoded).as_bytes());
    let _ = out.flush();
}

#[cfg(test)]
mod tests;
