use super::*;
use crate::action::Action;
use crate::tui_event::BackendEvent;
use slr_core::assistant::AssistantError;
use slr_core::curation::LoadedPapers;
use slr_core::sidebar::ProjectFormError;
use slr_core::{NoticeKind, Project, ReviewStatus};

/// App wired to a command channel so tests can see what it asks for.
fn test_app() -> (App, mpsc::UnboundedReceiver<BackendCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = App::new("hacker");
    app.backend_cmd_tx = Some(tx);
    (app, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<BackendCommand>) -> Vec<BackendCommand> {
    let mut cmds = Vec::new();
    while let Ok(cmd) = rx.try_recv() {
        cmds.push(cmd);
    }
    cmds
}

fn projects() -> Vec<Project> {
    vec![
        Project::new("default", "Default Project"),
        Project::new("thesis", "Thesis"),
    ]
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        app.update(Action::Input(c));
    }
}

fn papers_event(project_id: &str, papers: Vec<Paper>) -> BackendEvent {
    BackendEvent::Papers {
        project_id: project_id.into(),
        loaded: LoadedPapers {
            papers,
            source: PaperSource::Backend,
        },
    }
}

fn paper(id: &str, title: &str, authors: &str) -> Paper {
    let mut p = Paper::new(id, title);
    p.authors = authors.into();
    p.url = format!("https://example.org/{id}");
    p
}

// ── Startup and projects ───────────────────────────────────────

#[test]
fn start_checks_connection_and_loads_projects() {
    let (mut app, mut rx) = test_app();
    app.start();
    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::CheckConnection, BackendCommand::LoadProjects]
    );
    assert_eq!(app.connection, ConnectionStatus::Connecting);
}

#[test]
fn project_list_keeps_selection_and_loads_data() {
    let (mut app, mut rx) = test_app();
    app.projects = ProjectSelector::with_selected("thesis");

    app.handle_backend_event(BackendEvent::Projects(Ok(projects())));

    assert_eq!(app.projects.options().len(), 2);
    assert_eq!(app.current_project(), "thesis");
    assert_eq!(
        drain(&mut rx),
        vec![
            BackendCommand::LoadPapers {
                project_id: "thesis".into()
            },
            BackendCommand::LoadHistory {
                project_id: "thesis".into()
            },
        ]
    );
}

#[test]
fn vanished_project_falls_back_and_is_remembered() {
    let (mut app, mut rx) = test_app();
    app.projects = ProjectSelector::with_selected("gone");

    app.handle_backend_event(BackendEvent::Projects(Ok(projects())));

    assert_eq!(app.current_project(), "default");
    assert_eq!(
        drain(&mut rx)[0],
        BackendCommand::SelectProject("default".into())
    );
}

#[test]
fn switching_project_reloads() {
    let (mut app, mut rx) = test_app();
    app.handle_backend_event(BackendEvent::Projects(Ok(projects())));
    drain(&mut rx);

    app.update(Action::NextProject);

    assert_eq!(app.current_project(), "thesis");
    let cmds = drain(&mut rx);
    assert!(cmds.contains(&BackendCommand::SelectProject("thesis".into())));
    assert!(cmds.contains(&BackendCommand::LoadPapers {
        project_id: "thesis".into()
    }));
}

#[test]
fn reconnect_shows_connecting() {
    let (mut app, mut rx) = test_app();
    app.handle_backend_event(BackendEvent::Connection(ConnectionStatus::Offline));
    app.update(Action::Reconnect);
    assert_eq!(app.connection, ConnectionStatus::Connecting);
    assert_eq!(drain(&mut rx), vec![BackendCommand::CheckConnection]);
}

// ── New project modal ──────────────────────────────────────────

#[test]
fn blank_modal_warns_without_request() {
    let (mut app, mut rx) = test_app();
    app.update(Action::NewProject);
    assert_eq!(app.input_mode, InputMode::TextInput);
    type_text(&mut app, "thesis");

    app.update(Action::Submit);

    assert!(drain(&mut rx).is_empty());
    let notice = app.notice.as_ref().unwrap();
    assert_eq!(notice.message, "Please fill in both fields");
    assert_eq!(notice.kind, NoticeKind::Warning);
    assert!(app.modal.is_some());
}

#[test]
fn modal_typing_goes_to_fields_not_commands() {
    let (mut app, mut rx) = test_app();
    app.update(Action::NewProject);
    type_text(&mut app, "q1");
    app.update(Action::NextField);
    type_text(&mut app, "Quick review");
    app.update(Action::Submit);

    assert!(!app.should_quit);
    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::CreateProject(NewProjectForm {
            id: "q1".into(),
            name: "Quick review".into(),
        })]
    );
    assert!(app.modal.as_ref().unwrap().submitting);
}

#[test]
fn created_project_is_selected_after_reload() {
    let (mut app, mut rx) = test_app();
    app.update(Action::NewProject);
    app.handle_backend_event(BackendEvent::ProjectCreated(Ok(Project::new("thesis", "Thesis"))));

    assert!(app.modal.is_none());
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(drain(&mut rx), vec![BackendCommand::LoadProjects]);

    app.handle_backend_event(BackendEvent::Projects(Ok(projects())));
    assert_eq!(app.current_project(), "thesis");
}

#[test]
fn duplicate_project_keeps_modal_open() {
    let (mut app, _rx) = test_app();
    app.update(Action::NewProject);
    app.handle_backend_event(BackendEvent::ProjectCreated(Err(ProjectFormError::Backend(
        "Project ID already exists".into(),
    ))));
    assert!(app.modal.is_some());
    let notice = app.notice.as_ref().unwrap();
    assert_eq!(notice.message, "Project ID already exists");
    assert_eq!(notice.kind, NoticeKind::Error);
}

#[test]
fn esc_closes_modal() {
    let (mut app, _rx) = test_app();
    app.update(Action::NewProject);
    app.update(Action::Cancel);
    assert!(app.modal.is_none());
    assert_eq!(app.input_mode, InputMode::Normal);
}

// ── Assistant ──────────────────────────────────────────────────

#[test]
fn generate_with_empty_abstract_sends_nothing() {
    let (mut app, mut rx) = test_app();
    app.assistant.form.api_key = "key".into();
    app.assistant.focus = AssistantFocus::Generate;

    app.update(Action::Activate);

    assert!(drain(&mut rx).is_empty());
    assert_eq!(
        app.notice.as_ref().unwrap().message,
        "Please enter an idea or abstract"
    );
    assert!(!app.assistant.generating);
}

#[test]
fn generate_sends_form_once() {
    let (mut app, mut rx) = test_app();
    app.update(Action::Activate); // edit abstract
    type_text(&mut app, "LLMs for code review");
    app.update(Action::Submit);
    app.assistant.form.api_key = "key".into();
    app.assistant.focus = AssistantFocus::Generate;

    app.update(Action::Activate);
    app.update(Action::Activate);

    let cmds = drain(&mut rx);
    assert_eq!(cmds.len(), 1);
    match &cmds[0] {
        BackendCommand::GenerateQueries(form) => {
            assert_eq!(form.abstract_text, "LLMs for code review")
        }
        other => panic!("unexpected command {:?}", other),
    }
    assert!(app.assistant.generating);
}

#[test]
fn api_key_is_saved_when_editing_ends() {
    let (mut app, mut rx) = test_app();
    app.assistant.focus = AssistantFocus::ApiKey;
    app.update(Action::Activate);
    type_text(&mut app, " abc ");
    app.update(Action::Submit);
    assert_eq!(drain(&mut rx), vec![BackendCommand::SaveApiKey("abc".into())]);
}

#[test]
fn queries_arrive_and_open_logs_to_current_project() {
    let (mut app, mut rx) = test_app();
    app.assistant.generating = true;
    app.handle_backend_event(BackendEvent::Queries(Ok(vec![QuerySuggestion {
        query: "\"code review\" LLM".into(),
        description: Some("RQ1".into()),
    }])));
    assert!(!app.assistant.generating);

    app.update(Action::GoBottom);
    assert_eq!(app.assistant.focus, AssistantFocus::Query(0));
    app.update(Action::Activate);

    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::OpenQuery {
            query: "\"code review\" LLM".into(),
            log_to: Some("default".into()),
        }]
    );
}

#[test]
fn generation_failure_is_shown_inline() {
    let (mut app, _rx) = test_app();
    app.assistant.generating = true;
    app.handle_backend_event(BackendEvent::Queries(Err(AssistantError::Backend(
        "Invalid API key".into(),
    ))));
    assert_eq!(app.assistant.error.as_deref(), Some("Error: Invalid API key"));
    assert!(app.assistant.queries.is_empty());
}

#[test]
fn copy_query_sets_clipboard() {
    let (mut app, _rx) = test_app();
    app.handle_backend_event(BackendEvent::Queries(Ok(vec![QuerySuggestion {
        query: "graph neural networks".into(),
        description: None,
    }])));
    app.assistant.focus = AssistantFocus::Query(0);
    app.update(Action::CopyToClipboard);
    assert_eq!(app.pending_copy.as_deref(), Some("graph neural networks"));
    assert_eq!(app.notice.as_ref().unwrap().message, "Query copied!");
}

#[test]
fn strategy_cycles_and_sites_toggle_in_order() {
    let (mut app, _rx) = test_app();
    app.assistant.focus = AssistantFocus::Strategy;
    let first = app.assistant.form.strategy.clone();
    app.update(Action::Right);
    assert_ne!(app.assistant.form.strategy, first);
    app.update(Action::Left);
    assert_eq!(app.assistant.form.strategy, first);

    app.assistant.focus = AssistantFocus::Site(2);
    app.update(Action::Toggle);
    app.assistant.focus = AssistantFocus::Site(0);
    app.update(Action::Toggle);
    assert_eq!(
        app.assistant.form.sites,
        vec![
            slr_core::assistant::DEFAULT_SITES[0].to_string(),
            slr_core::assistant::DEFAULT_SITES[2].to_string(),
        ]
    );
    app.update(Action::Toggle);
    assert_eq!(app.assistant.form.sites.len(), 1);
}

// ── Database ───────────────────────────────────────────────────

#[test]
fn stale_papers_are_dropped() {
    let (mut app, _rx) = test_app();
    app.handle_backend_event(papers_event("other", vec![paper("a", "A", "")]));
    assert!(app.papers.is_empty());
    assert!(!app.papers_loaded);
}

#[test]
fn filter_narrows_and_esc_clears() {
    let (mut app, _rx) = test_app();
    app.tab = Tab::Database;
    app.handle_backend_event(papers_event(
        "default",
        vec![
            paper("a", "Attention is all you need", "A Vaswani"),
            paper("b", "BERT", "J Devlin"),
        ],
    ));

    app.update(Action::StartFilter);
    type_text(&mut app, "devlin");
    assert_eq!(app.visible_papers().len(), 1);
    app.update(Action::Submit);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert_eq!(app.selected_paper().unwrap().id, "b");

    app.update(Action::NavigateBack);
    assert_eq!(app.visible_papers().len(), 2);
}

#[test]
fn space_toggles_selected_paper() {
    let (mut app, mut rx) = test_app();
    app.tab = Tab::Database;
    app.handle_backend_event(papers_event(
        "default",
        vec![paper("a", "A", ""), paper("b", "B", "")],
    ));
    app.update(Action::MoveDown);
    app.update(Action::Toggle);

    match drain(&mut rx).as_slice() {
        [BackendCommand::ToggleStatus(p)] => assert_eq!(p.id, "b"),
        other => panic!("unexpected commands {:?}", other),
    }

    app.handle_backend_event(BackendEvent::StatusToggled {
        paper_id: "b".into(),
        result: Ok(ReviewStatus::Reviewed),
    });
    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::LoadPapers {
            project_id: "default".into()
        }]
    );
}

#[test]
fn remove_then_notice_and_reload() {
    let (mut app, mut rx) = test_app();
    app.tab = Tab::Database;
    app.handle_backend_event(papers_event("default", vec![paper("a", "A", "")]));
    app.update(Action::RemovePaper);
    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::RemovePaper {
            paper_id: "a".into()
        }]
    );

    app.handle_backend_event(BackendEvent::PaperRemoved {
        paper_id: "a".into(),
        result: Ok(()),
    });
    assert_eq!(app.notice.as_ref().unwrap().message, "Paper removed");
    assert_eq!(drain(&mut rx).len(), 1);
}

#[test]
fn cursor_is_clamped_after_reload() {
    let (mut app, _rx) = test_app();
    app.tab = Tab::Database;
    app.handle_backend_event(papers_event(
        "default",
        vec![paper("a", "A", ""), paper("b", "B", ""), paper("c", "C", "")],
    ));
    app.update(Action::GoBottom);
    assert_eq!(app.paper_cursor, 2);
    app.handle_backend_event(papers_event("default", vec![paper("a", "A", "")]));
    assert_eq!(app.paper_cursor, 0);
}

#[test]
fn history_rerun_is_not_logged_again() {
    let (mut app, mut rx) = test_app();
    app.tab = Tab::Database;
    app.update(Action::Right);
    assert_eq!(app.db_tab, DbTab::History);
    app.handle_backend_event(BackendEvent::History {
        project_id: "default".into(),
        entries: vec![QueryHistoryEntry {
            query: "llm review".into(),
            timestamp: "2024-05-01T10:00:00Z".into(),
            project_id: "default".into(),
        }],
    });

    app.update(Action::Activate);

    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::OpenQuery {
            query: "llm review".into(),
            log_to: None,
        }]
    );
}

#[test]
fn papers_changed_elsewhere_reloads() {
    let (mut app, mut rx) = test_app();
    app.handle_backend_event(BackendEvent::PapersChanged);
    assert_eq!(
        drain(&mut rx),
        vec![BackendCommand::LoadPapers {
            project_id: "default".into()
        }]
    );
}

// ── Global ─────────────────────────────────────────────────────

#[test]
fn help_swallows_keys_until_closed() {
    let (mut app, mut rx) = test_app();
    app.update(Action::ToggleHelp);
    app.update(Action::NewProject);
    assert!(app.modal.is_none());
    app.update(Action::NavigateBack);
    assert!(!app.show_help);
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn tab_switches_main_tabs() {
    let (mut app, _rx) = test_app();
    assert_eq!(app.tab, Tab::Assistant);
    app.update(Action::NextTab);
    assert_eq!(app.tab, Tab::Database);
    app.update(Action::ShowAssistant);
    assert_eq!(app.tab, Tab::Assistant);
}

#[test]
fn quit_returns_true() {
    let (mut app, _rx) = test_app();
    assert!(app.update(Action::Quit));
    assert!(app.should_quit);
}

#[test]
fn fresh_notice_survives_a_tick() {
    let (mut app, _rx) = test_app();
    app.notice = Some(Notice::info("hello"));
    app.update(Action::Tick);
    assert!(app.notice.is_some());
}
