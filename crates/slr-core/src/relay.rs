//! Background relay: buffers selected papers locally and mirrors them to the
//! backend.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::backend::Backend;
use crate::store::LocalStore;
use crate::{DEFAULT_PROJECT_ID, Paper};

/// Messages exchanged between the scraper, the relay and the views.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeMessage {
    /// A paper was chosen on a results page.
    PaperSelected(Paper),
    /// A previously chosen paper was deselected.
    PaperRemoved(Paper),
    /// The set of saved papers changed; views should reload.
    PapersUpdated,
}

/// Buffered capacity of the update broadcast. Slow receivers only miss
/// "reload" hints, so lagging is harmless.
const UPDATE_CAPACITY: usize = 16;

pub struct Relay {
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
    updates: broadcast::Sender<RuntimeMessage>,
    /// Project to file selections under instead of the stored `currentProject`.
    project: Option<String>,
}

impl Relay {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<LocalStore>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            backend,
            store,
            updates,
            project: None,
        }
    }

    /// File every selection under `project_id`, ignoring `currentProject`.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project = Some(project_id.into());
        self
    }

    fn target_project(&self) -> String {
        if let Some(project) = &self.project {
            return project.clone();
        }
        match self.store.current_project() {
            Ok(Some(p)) => p,
            Ok(None) => DEFAULT_PROJECT_ID.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read current project, using default");
                DEFAULT_PROJECT_ID.to_string()
            }
        }
    }

    /// Receive [`RuntimeMessage::PapersUpdated`] broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<RuntimeMessage> {
        self.updates.subscribe()
    }

    /// The broadcast sender, for components that announce changes themselves.
    pub fn updates(&self) -> broadcast::Sender<RuntimeMessage> {
        self.updates.clone()
    }

    fn notify(&self) {
        // No subscribers is fine; nobody needs to reload.
        let _ = self.updates.send(RuntimeMessage::PapersUpdated);
    }

    /// Run the relay on its own task. Messages are handled one at a time in
    /// arrival order; the task ends when every sender is dropped.
    pub fn spawn(self) -> (async_channel::Sender<RuntimeMessage>, JoinHandle<()>) {
        let (tx, rx) = async_channel::unbounded();
        let handle = tokio::spawn(async move {
            while let Ok(message) = rx.recv().await {
                self.handle(message).await;
            }
            tracing::debug!("relay channel closed");
        });
        (tx, handle)
    }

    /// Handle one message. Never fails; every error is logged.
    pub async fn handle(&self, message: RuntimeMessage) {
        match message {
            RuntimeMessage::PaperSelected(paper) => self.paper_selected(paper).await,
            RuntimeMessage::PaperRemoved(paper) => self.paper_removed(paper).await,
            RuntimeMessage::PapersUpdated => {}
        }
    }

    async fn paper_selected(&self, paper: Paper) {
        match self.store.append_paper(&paper) {
            Ok(true) => self.notify(),
            Ok(false) => tracing::debug!(paper_id = %paper.id, "paper already buffered"),
            Err(e) => tracing::error!(paper_id = %paper.id, error = %e, "failed to buffer paper"),
        }

        let project_id = self.target_project();
        let paper = paper.with_project(&project_id);
        match self.backend.save_paper(&paper).await {
            Ok(_) => tracing::info!(paper_id = %paper.id, project_id = %project_id, "paper saved to backend"),
            Err(e) => tracing::error!(paper_id = %paper.id, error = %e, "backend save failed"),
        }
    }

    async fn paper_removed(&self, paper: Paper) {
        match self.store.remove_paper(&paper.id) {
            Ok(true) => self.notify(),
            Ok(false) => tracing::debug!(paper_id = %paper.id, "paper was not buffered"),
            Err(e) => tracing::error!(paper_id = %paper.id, error = %e, "failed to unbuffer paper"),
        }
        if let Err(e) = self.backend.delete_paper(&paper.id).await {
            tracing::error!(paper_id = %paper.id, error = %e, "backend delete failed");
        }
    }
}
