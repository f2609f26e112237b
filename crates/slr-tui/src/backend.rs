use std::sync::Arc;

use slr_core::assistant;
use slr_core::curation;
use slr_core::scholar::scholar_search_url;
use slr_core::sidebar;
use slr_core::{Backend, LocalStore};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::tui_event::{BackendCommand, BackendEvent};

/// Receive commands until the channel closes or `cancel` fires. Every command
/// gets its own task, so a slow request never blocks the next one.
pub async fn run(
    mut cmd_rx: mpsc::UnboundedReceiver<BackendCommand>,
    event_tx: mpsc::UnboundedSender<BackendEvent>,
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
    cancel: CancellationToken,
) {
    loop {
        let cmd = tokio::select! {
            _ = cancel.cancelled() => break,
            cmd = cmd_rx.recv() => match cmd {
                Some(cmd) => cmd,
                None => break,
            },
        };
        let backend = backend.clone();
        let store = store.clone();
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Some(event) = execute(cmd, backend, &store).await {
                // The UI may already be gone.
                let _ = tx.send(event);
            }
        });
    }
    tracing::debug!("backend command loop stopped");
}

/// Run one command to completion.
pub async fn execute(
    cmd: BackendCommand,
    backend: Arc<dyn Backend>,
    store: &LocalStore,
) -> Option<BackendEvent> {
    let b = backend.as_ref();
    match cmd {
        BackendCommand::CheckConnection => Some(BackendEvent::Connection(
            sidebar::check_connection(b).await,
        )),
        BackendCommand::LoadProjects => Some(BackendEvent::Projects(
            sidebar::load_projects(b)
                .await
                .map_err(|_| "Failed to load projects".to_string()),
        )),
        BackendCommand::CreateProject(form) => Some(BackendEvent::ProjectCreated(
            sidebar::create_project(b, &form).await,
        )),
        BackendCommand::SelectProject(project_id) => store
            .set_current_project(&project_id)
            .err()
            .map(|e| BackendEvent::Failed(format!("Could not remember project: {}", e))),
        BackendCommand::LoadPapers { project_id } => {
            let loaded = curation::load_papers(b, store, &project_id).await;
            Some(BackendEvent::Papers { project_id, loaded })
        }
        BackendCommand::ToggleStatus(paper) => {
            let result = curation::toggle_status(b, &paper)
                .await
                .map_err(|_| "Failed to update status".to_string());
            Some(BackendEvent::StatusToggled {
                paper_id: paper.id,
                result,
            })
        }
        BackendCommand::RemovePaper { paper_id } => {
            let result = curation::remove_paper(b, store, &paper_id)
                .await
                .map_err(|_| "Failed to remove paper".to_string());
            Some(BackendEvent::PaperRemoved { paper_id, result })
        }
        BackendCommand::LoadHistory { project_id } => {
            let entries = curation::load_history(b, &project_id).await;
            Some(BackendEvent::History {
                project_id,
                entries,
            })
        }
        BackendCommand::GenerateQueries(form) => Some(BackendEvent::Queries(
            assistant::generate_queries(b, &form).await,
        )),
        BackendCommand::SaveApiKey(key) => store
            .set_api_key(&key)
            .err()
            .map(|e| BackendEvent::Failed(format!("Could not save API key: {}", e))),
        BackendCommand::OpenQuery { query, log_to } => {
            let opened = match log_to {
                Some(project_id) => assistant::open_in_scholar(backend, &query, &project_id),
                None => assistant::open_url(&scholar_search_url(&query)),
            };
            opened
                .err()
                .map(|e| BackendEvent::Failed(format!("Could not open browser: {}", e)))
        }
        BackendCommand::OpenUrl(url) => assistant::open_url(&url)
            .err()
            .map(|e| BackendEvent::Failed(format!("Could not open browser: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slr_core::mock::{Endpoint, MockBackend, MockCall, MockFailure};
    use slr_core::sidebar::{ConnectionStatus, NewProjectForm, ProjectFormError};
    use slr_core::{Paper, Project, ReviewStatus};
    use std::time::Duration;

    fn mock(m: MockBackend) -> (Arc<MockBackend>, Arc<dyn Backend>) {
        let backend = Arc::new(m);
        let dyn_backend: Arc<dyn Backend> = backend.clone();
        (backend, dyn_backend)
    }

    #[tokio::test]
    async fn connection_reports_offline() {
        let (_, backend) =
            mock(MockBackend::new().failing(Endpoint::Health, MockFailure::Unreachable));
        let store = LocalStore::in_memory();
        match execute(BackendCommand::CheckConnection, backend, &store).await {
            Some(BackendEvent::Connection(status)) => assert_eq!(status, ConnectionStatus::Offline),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn project_load_failure_is_a_message() {
        let (_, backend) = mock(
            MockBackend::new().failing(Endpoint::ListProjects, MockFailure::Status(500, None)),
        );
        let store = LocalStore::in_memory();
        match execute(BackendCommand::LoadProjects, backend, &store).await {
            Some(BackendEvent::Projects(Err(msg))) => assert_eq!(msg, "Failed to load projects"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_project_carries_detail() {
        let (_, backend) = mock(
            MockBackend::new().with_projects(vec![Project::new("default", "Default Project")]),
        );
        let store = LocalStore::in_memory();
        let form = NewProjectForm {
            id: "default".into(),
            name: "Again".into(),
        };
        match execute(BackendCommand::CreateProject(form), backend, &store).await {
            Some(BackendEvent::ProjectCreated(Err(ProjectFormError::Backend(detail)))) => {
                assert_eq!(detail, "Project ID already exists")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn select_project_is_stored_silently() {
        let (_, backend) = mock(MockBackend::new());
        let store = LocalStore::in_memory();
        let event = execute(BackendCommand::SelectProject("thesis".into()), backend, &store).await;
        assert!(event.is_none());
        assert_eq!(store.current_project().unwrap().as_deref(), Some("thesis"));
    }

    #[tokio::test]
    async fn toggle_reports_new_status() {
        let paper = Paper::new("p", "P");
        let (mock_backend, backend) = mock(MockBackend::new().with_papers(vec![paper.clone()]));
        let store = LocalStore::in_memory();
        match execute(BackendCommand::ToggleStatus(paper), backend, &store).await {
            Some(BackendEvent::StatusToggled { paper_id, result }) => {
                assert_eq!(paper_id, "p");
                assert_eq!(result, Ok(ReviewStatus::Reviewed));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            mock_backend.calls(),
            vec![MockCall::UpdateStatus("p".into(), ReviewStatus::Reviewed)]
        );
    }

    #[tokio::test]
    async fn remove_clears_local_buffer() {
        let paper = Paper::new("p", "P");
        let (_, backend) = mock(MockBackend::new().with_papers(vec![paper.clone()]));
        let store = LocalStore::in_memory();
        store.append_paper(&paper).unwrap();
        let event = execute(
            BackendCommand::RemovePaper {
                paper_id: "p".into(),
            },
            backend,
            &store,
        )
        .await;
        assert!(matches!(
            event,
            Some(BackendEvent::PaperRemoved { result: Ok(()), .. })
        ));
        assert!(store.saved_papers().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_key_is_persisted() {
        let (_, backend) = mock(MockBackend::new());
        let store = LocalStore::in_memory();
        let event = execute(BackendCommand::SaveApiKey("k".into()), backend, &store).await;
        assert!(event.is_none());
        assert_eq!(store.api_key().unwrap().as_deref(), Some("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_requests_run_side_by_side() {
        let (_, backend) = mock(
            MockBackend::new()
                .with_projects(vec![Project::new("default", "Default Project")])
                .with_delay(Duration::from_secs(1)),
        );
        let store = Arc::new(LocalStore::in_memory());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(run(cmd_rx, event_tx, backend, store, cancel.clone()));

        let started = tokio::time::Instant::now();
        cmd_tx.send(BackendCommand::LoadProjects).unwrap();
        cmd_tx.send(BackendCommand::CheckConnection).unwrap();
        let mut connected = false;
        let mut projects = false;
        for _ in 0..2 {
            match event_rx.recv().await {
                Some(BackendEvent::Connection(status)) => connected = status.is_connected(),
                Some(BackendEvent::Projects(Ok(list))) => projects = list.len() == 1,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(connected && projects);
        assert!(started.elapsed() < Duration::from_secs(2));
        cancel.cancel();
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let (_, backend) = mock(MockBackend::new());
        let store = Arc::new(LocalStore::in_memory());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(cmd_rx, event_tx, backend, store, cancel.clone()));

        cmd_tx.send(BackendCommand::CheckConnection).unwrap();
        assert!(matches!(
            event_rx.recv().await,
            Some(BackendEvent::Connection(ConnectionStatus::Connected))
        ));

        cancel.cancel();
        task.await.unwrap();
    }
}
