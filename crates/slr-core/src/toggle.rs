//! The per-result "Add" affordance.

use tokio::sync::broadcast;

use crate::Paper;
use crate::backend::Backend;
use crate::relay::RuntimeMessage;
use crate::store::LocalStore;

/// Visual state of an add/remove button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    #[default]
    New,
    Saving,
    Saved,
}

impl ButtonState {
    pub fn label(&self) -> &'static str {
        match self {
            ButtonState::New => "+ Add",
            ButtonState::Saving => "Saving...",
            ButtonState::Saved => "Saved",
        }
    }

    /// Marker class a page renderer puts on the button.
    pub fn css_class(&self) -> &'static str {
        match self {
            ButtonState::New => "slr-add-btn",
            ButtonState::Saving => "slr-add-btn saving",
            ButtonState::Saved => "slr-add-btn saved",
        }
    }
}

/// Add/remove toggle bound to one scraped paper.
///
/// Every activation sends exactly one request and walks through `Saving`.
/// A failed request rolls the state back; nothing is retried.
#[derive(Debug, Clone)]
pub struct AddToggle {
    paper: Paper,
    state: ButtonState,
    transitions: Vec<ButtonState>,
}

impl AddToggle {
    pub fn new(paper: Paper) -> Self {
        Self {
            paper,
            state: ButtonState::New,
            transitions: vec![ButtonState::New],
        }
    }

    /// A toggle for a paper that is already stored.
    pub fn saved(paper: Paper) -> Self {
        Self {
            paper,
            state: ButtonState::Saved,
            transitions: vec![ButtonState::Saved],
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    /// Every state the button has shown, oldest first.
    pub fn transitions(&self) -> &[ButtonState] {
        &self.transitions
    }

    fn set(&mut self, state: ButtonState) {
        self.state = state;
        self.transitions.push(state);
    }

    /// Handle a click.
    ///
    /// Adding POSTs the paper, then buffers it locally and broadcasts
    /// [`RuntimeMessage::PapersUpdated`]. Removing DELETEs it and leaves the
    /// local buffer alone. Clicks while a request is in flight are ignored.
    pub async fn activate(
        &mut self,
        backend: &dyn Backend,
        store: &LocalStore,
        updates: &broadcast::Sender<RuntimeMessage>,
    ) -> ButtonState {
        match self.state {
            ButtonState::Saving => {}
            ButtonState::New => {
                self.set(ButtonState::Saving);
                let result = backend.save_paper(&self.paper).await;
                match result {
                    Ok(_) => {
                        self.set(ButtonState::Saved);
                        if let Err(e) = store.append_paper(&self.paper) {
                            tracing::warn!(
                                paper_id = %self.paper.id,
                                error = %e,
                                "saved to backend but not to local storage"
                            );
                        }
                        let _ = updates.send(RuntimeMessage::PapersUpdated);
                    }
                    Err(e) => {
                        tracing::error!(paper_id = %self.paper.id, error = %e, "error saving paper");
                        self.set(ButtonState::New);
                    }
                }
            }
            ButtonState::Saved => {
                self.set(ButtonState::Saving);
                let result = backend.delete_paper(&self.paper.id).await;
                match result {
                    Ok(()) => self.set(ButtonState::New),
                    Err(e) => {
                        tracing::error!(paper_id = %self.paper.id, error = %e, "error removing paper");
                        self.set(ButtonState::Saved);
                    }
                }
            }
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Endpoint, MockBackend, MockCall, MockFailure};
    use super::ButtonState::*;

    fn paper() -> Paper {
        Paper::new("TQgYirikUcIJ", "Attention is all you need")
    }

    #[tokio::test]
    async fn add_success_saves_and_broadcasts() {
        let backend = MockBackend::new();
        let store = LocalStore::in_memory();
        let (tx, mut rx) = broadcast::channel(4);
        let mut toggle = AddToggle::new(paper());

        assert_eq!(toggle.activate(&backend, &store, &tx).await, Saved);

        assert_eq!(toggle.transitions(), &[New, Saving, Saved]);
        assert_eq!(backend.calls(), vec![MockCall::SavePaper(paper())]);
        assert_eq!(store.saved_papers().unwrap().len(), 1);
        assert_eq!(rx.try_recv().unwrap(), RuntimeMessage::PapersUpdated);
    }

    #[tokio::test]
    async fn add_failure_reverts_without_touching_store() {
        let backend =
            MockBackend::new().failing(Endpoint::SavePaper, MockFailure::Status(500, None));
        let store = LocalStore::in_memory();
        let (tx, mut rx) = broadcast::channel(4);
        let mut toggle = AddToggle::new(paper());

        assert_eq!(toggle.activate(&backend, &store, &tx).await, New);

        assert_eq!(toggle.transitions(), &[New, Saving, New]);
        assert_eq!(backend.call_count(Endpoint::SavePaper), 1);
        assert!(store.saved_papers().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remove_after_add_issues_one_delete() {
        let backend = MockBackend::new();
        let store = LocalStore::in_memory();
        let (tx, _rx) = broadcast::channel(4);
        let mut toggle = AddToggle::new(paper());
        toggle.activate(&backend, &store, &tx).await;

        assert_eq!(toggle.activate(&backend, &store, &tx).await, New);

        assert_eq!(toggle.transitions(), &[New, Saving, Saved, Saving, New]);
        assert_eq!(backend.call_count(Endpoint::DeletePaper), 1);
        assert_eq!(backend.call_count(Endpoint::SavePaper), 1);
        // The remove path leaves the local buffer as it was.
        assert_eq!(store.saved_papers().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn remove_failure_rolls_back_to_saved() {
        let backend = MockBackend::new().failing(Endpoint::DeletePaper, MockFailure::Unreachable);
        let store = LocalStore::in_memory();
        let (tx, _rx) = broadcast::channel(4);
        let mut toggle = AddToggle::saved(paper());

        assert_eq!(toggle.activate(&backend, &store, &tx).await, Saved);
        assert_eq!(toggle.transitions(), &[Saved, Saving, Saved]);
    }

    #[test]
    fn labels_and_classes() {
        assert_eq!(New.label(), "+ Add");
        assert_eq!(Saved.css_class(), "slr-add-btn saved");
        assert_eq!(ButtonState::default(), New);
    }
}
