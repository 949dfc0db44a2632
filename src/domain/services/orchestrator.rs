#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::ActiveView;
use super::InvocationToken;
use super::SessionStore;
use crate::domain::models::BackendBox;
use crate::domain::models::DesignError;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignId;
use crate::domain::models::DesignSession;
use crate::domain::models::ImageState;
use crate::domain::models::Plant;
use crate::domain::models::RequestOptions;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Both the design and its plant list came back.
    Completed {
        item: DesignHistoryItem,
        plants: Vec<Plant>,
    },
    /// The design was saved, but plant identification failed.
    PartiallyCompleted {
        item: DesignHistoryItem,
        warning: DesignError,
    },
    Failed(DesignError),
    /// Nothing was attempted.
    Rejected(DesignError),
    /// A newer submission or view change took over before this one finished.
    /// A design that made it this far is still in the session history.
    Superseded { item: Option<DesignHistoryItem> },
}

impl GenerationOutcome {
    pub fn item(&self) -> Option<&DesignHistoryItem> {
        match self {
            GenerationOutcome::Completed { item, .. } => return Some(item),
            GenerationOutcome::PartiallyCompleted { item, .. } => return Some(item),
            GenerationOutcome::Superseded { item } => return item.as_ref(),
            _ => return None,
        }
    }
}

pub struct DesignState {
    pub store: SessionStore,
    pub view: ActiveView,
    in_flight: Option<(InvocationToken, CancellationToken)>,
}

/// Drives uploads, session switches and the two-phase generate-then-identify
/// flow. State lives behind a mutex that is never held across a remote call.
pub struct Orchestrator {
    backend: BackendBox,
    state: Arc<Mutex<DesignState>>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(backend: BackendBox, store: SessionStore, timeout: Duration) -> Orchestrator {
        return Orchestrator {
            backend,
            state: Arc::new(Mutex::new(DesignState {
                store,
                view: ActiveView::default(),
                in_flight: None,
            })),
            timeout,
        };
    }

    pub fn backend(&self) -> BackendBox {
        return self.backend.clone();
    }

    pub async fn view(&self) -> ActiveView {
        return self.state.lock().await.view.clone();
    }

    pub async fn sessions(&self) -> Vec<Arc<DesignSession>> {
        return self.state.lock().await.store.sessions().to_vec();
    }

    pub async fn active_session(&self) -> Option<Arc<DesignSession>> {
        return self.state.lock().await.store.active_session();
    }

    /// Rebuilds the view from whatever session was active when storage was
    /// last written.
    pub async fn restore(&self) -> Option<Arc<DesignSession>> {
        let mut state = self.state.lock().await;
        let session = state.store.active_session()?;
        state.view.show_session(&session);

        return Some(session);
    }

    /// Starts a new session rooted at `image`.
    pub async fn upload_image(&self, image: ImageState) -> Arc<DesignSession> {
        let mut state = self.state.lock().await;
        state.view.show_upload(image.clone());
        return state.store.create_session(image).await;
    }

    pub async fn resume_session(
        &self,
        session_id: DesignId,
    ) -> Result<Arc<DesignSession>, DesignError> {
        let mut state = self.state.lock().await;
        let session = match state.store.session(session_id) {
            Some(session) => session,
            None => {
                let err = DesignError::UnknownSession(session_id);
                state.view.show_error(&err);
                return Err(err);
            }
        };

        state.store.set_active(Some(session.id)).await;
        state.view.show_session(&session);

        return Ok(session);
    }

    /// Loads a past design as the image to edit next. The session owning the
    /// design becomes active.
    pub async fn branch_from_item(
        &self,
        item_id: DesignId,
    ) -> Result<DesignHistoryItem, DesignError> {
        let mut state = self.state.lock().await;
        let (session_id, item) = match state.store.find_history_item(item_id) {
            Some(found) => found,
            None => {
                let err = DesignError::UnknownHistoryItem(item_id);
                state.view.show_error(&err);
                return Err(err);
            }
        };

        state.store.set_active(Some(session_id)).await;
        state.view.show_branch(&item);

        tracing::info!(session_id, item_id, "Branched from design");
        return Ok(item);
    }

    /// Back to the upload prompt. Stored sessions are kept.
    pub async fn start_over(&self) {
        let mut state = self.state.lock().await;
        state.view.reset();
        state.store.set_active(None).await;
    }

    /// Cancels the in-flight submission. Returns false when there was none.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        match state.in_flight.take() {
            Some((_, cancel)) => {
                cancel.cancel();
                return true;
            }
            None => return false,
        }
    }

    /// Generates a design for `prompt` from the current original image, then
    /// identifies its plants. Failures end up in the view and the returned
    /// outcome, never as an error.
    pub async fn submit_prompt(&self, prompt: &str) -> GenerationOutcome {
        let options = RequestOptions::new(self.timeout);

        let (token, session_id, original) = {
            let mut state = self.state.lock().await;
            let session_id = state.store.active_session_id();
            let original = state.view.original_image.clone();

            let (session_id, original) = match (session_id, original) {
                (Some(session_id), Some(original)) => (session_id, original),
                _ => {
                    state.view.show_error(&DesignError::NoImage);
                    return GenerationOutcome::Rejected(DesignError::NoImage);
                }
            };

            let token = state.view.begin_generation();
            state.in_flight = Some((token, options.cancel.clone()));
            (token, session_id, original)
        };

        tracing::info!(session_id, prompt, "Generating design");
        let res = options
            .guard(self.backend.generate_image(&original, prompt, &options))
            .await;

        let generated = match res {
            Ok(generated) => generated,
            Err(err) => {
                tracing::error!(session_id, error = ?err, "Design generation failed");
                let err = DesignError::generation(&err);

                let mut state = self.state.lock().await;
                state.finish(token);
                if !state.view.apply_generation_failure(token, &err) {
                    return GenerationOutcome::Superseded { item: None };
                }
                return GenerationOutcome::Failed(err);
            }
        };

        // The design is committed before identification starts, so a flaky
        // second phase never loses it.
        let item = {
            let mut state = self.state.lock().await;
            let item = DesignHistoryItem {
                id: state.store.next_id(),
                original_image: original,
                prompt: prompt.to_string(),
                generated_image: generated.clone(),
            };
            if !state
                .store
                .append_history_item(session_id, item.clone())
                .await
            {
                let err = DesignError::UnknownSession(session_id);
                tracing::error!(session_id, item_id = item.id, "Design generated for a missing session");
                state.finish(token);
                if !state.view.apply_generation_failure(token, &err) {
                    return GenerationOutcome::Superseded { item: None };
                }
                return GenerationOutcome::Failed(err);
            }

            if !state.view.apply_generated(token, generated.clone()) {
                state.finish(token);
                return GenerationOutcome::Superseded { item: Some(item) };
            }

            item
        };

        let res = options
            .guard(self.backend.identify_plants(&generated, &options))
            .await;

        let mut state = self.state.lock().await;
        state.finish(token);

        match res {
            Ok(plants) => {
                tracing::info!(item_id = item.id, plants = plants.len(), "Identified plants");
                if !state.view.apply_plants(token, plants.clone()) {
                    return GenerationOutcome::Superseded { item: Some(item) };
                }
                return GenerationOutcome::Completed { item, plants };
            }
            Err(err) => {
                tracing::warn!(item_id = item.id, error = ?err, "Plant identification failed");
                let warning = DesignError::identification();
                if !state.view.apply_identification_failure(token, &warning) {
                    return GenerationOutcome::Superseded { item: Some(item) };
                }
                return GenerationOutcome::PartiallyCompleted { item, warning };
            }
        }
    }
}

impl DesignState {
    fn finish(&mut self, token: InvocationToken) {
        if let Some((current, _)) = &self.in_flight {
            if *current == token {
                self.in_flight = None;
            }
        }
    }
}
