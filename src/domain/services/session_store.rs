#[cfg(test)]
#[path = "session_store_test.rs"]
mod tests;

use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::IdClock;
use crate::domain::models::DesignError;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignId;
use crate::domain::models::DesignSession;
use crate::domain::models::ImageState;
use crate::domain::models::StorageBox;

pub const SESSIONS_KEY: &str = "design-sessions";
pub const ACTIVE_SESSION_KEY: &str = "active-session-id";

/// Authoritative list of design sessions and which one is active. Every
/// change is written through to storage on a best effort basis; the in-memory
/// copy always wins.
pub struct SessionStore {
    storage: StorageBox,
    sessions: Vec<Arc<DesignSession>>,
    active_session_id: Option<DesignId>,
    clock: IdClock,
}

impl SessionStore {
    pub fn new(storage: StorageBox) -> SessionStore {
        return SessionStore {
            storage,
            sessions: vec![],
            active_session_id: None,
            clock: IdClock::default(),
        };
    }

    /// Creates a store and rehydrates it from storage.
    pub async fn open(storage: StorageBox) -> SessionStore {
        let mut store = SessionStore::new(storage);
        store.load().await;
        return store;
    }

    pub fn sessions(&self) -> &[Arc<DesignSession>] {
        return &self.sessions;
    }

    pub fn session(&self, session_id: DesignId) -> Option<Arc<DesignSession>> {
        return self
            .sessions
            .iter()
            .find(|session| return session.id == session_id)
            .cloned();
    }

    pub fn active_session_id(&self) -> Option<DesignId> {
        return self.active_session_id;
    }

    pub fn active_session(&self) -> Option<Arc<DesignSession>> {
        return self.session(self.active_session_id?);
    }

    /// Scans every session for the item, returning the owning session id.
    pub fn find_history_item(&self, item_id: DesignId) -> Option<(DesignId, DesignHistoryItem)> {
        return self.sessions.iter().find_map(|session| {
            return session
                .item(item_id)
                .map(|item| return (session.id, item.clone()));
        });
    }

    pub fn next_id(&mut self) -> DesignId {
        return self.clock.next();
    }

    pub async fn create_session(&mut self, base_image: ImageState) -> Arc<DesignSession> {
        let session = Arc::new(DesignSession::new(self.clock.next(), base_image));
        self.sessions.push(session.clone());
        self.active_session_id = Some(session.id);

        tracing::info!(session_id = session.id, "Created design session");
        self.save().await;

        return session;
    }

    /// Appends `item` to the session's history. The stored session is
    /// replaced with a new value so earlier snapshots stay as they were.
    /// Returns false when no session has the id.
    pub async fn append_history_item(
        &mut self,
        session_id: DesignId,
        item: DesignHistoryItem,
    ) -> bool {
        let idx = match self
            .sessions
            .iter()
            .position(|session| return session.id == session_id)
        {
            Some(idx) => idx,
            None => {
                tracing::warn!(
                    session_id,
                    item_id = item.id,
                    "Dropped history item for unknown session"
                );
                return false;
            }
        };

        self.clock.observe(item.id);
        let item_id = item.id;
        self.sessions[idx] = Arc::new(self.sessions[idx].with_item(item));

        tracing::info!(session_id, item_id, "Appended design to session history");
        self.save_sessions().await;

        return true;
    }

    /// Not validated here. Dangling ids are cleared the next time the store
    /// is loaded.
    pub async fn set_active(&mut self, session_id: Option<DesignId>) {
        self.active_session_id = session_id;
        self.save_active().await;
    }

    /// Rehydrates sessions and the active id. Missing or unreadable entries
    /// fall back to empty.
    pub async fn load(&mut self) {
        let sessions: Vec<DesignSession> = self.read_entry(SESSIONS_KEY).await.unwrap_or_default();
        let active_session_id: Option<DesignId> = self.read_entry(ACTIVE_SESSION_KEY).await;

        self.sessions = sessions
            .into_iter()
            .filter(|session| {
                if IdClock::accepts(session.max_id()) {
                    return true;
                }

                let err = DesignError::Persistence(format!(
                    "{SESSIONS_KEY}: session {} holds ids past {}",
                    session.id,
                    IdClock::LIMIT
                ));
                tracing::error!(error = %err, "Dropped stored session");
                return false;
            })
            .map(Arc::new)
            .collect();
        for session in self.sessions.iter() {
            self.clock.observe(session.max_id());
        }

        self.active_session_id = None;
        if let Some(session_id) = active_session_id {
            if self.session(session_id).is_some() {
                self.active_session_id = Some(session_id);
            } else {
                tracing::warn!(
                    session_id,
                    "Stored active session does not exist, clearing it"
                );
                self.save_active().await;
            }
        }

        tracing::debug!(
            sessions = self.sessions.len(),
            active_session_id = ?self.active_session_id,
            "Loaded design sessions"
        );
    }

    pub async fn save(&self) {
        self.save_sessions().await;
        self.save_active().await;
    }

    async fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match self.storage.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(err) => {
                tracing::error!(key, error = ?err, "Failed to read from storage");
                return None;
            }
        };

        if payload.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<T>(&payload) {
            Ok(value) => return Some(value),
            Err(err) => {
                tracing::error!(key, error = ?err, "Failed to parse stored entry, ignoring it");
                return None;
            }
        }
    }

    async fn save_sessions(&self) {
        let sessions = self
            .sessions
            .iter()
            .map(|session| return session.as_ref())
            .collect::<Vec<&DesignSession>>();

        let payload = match serde_json::to_string(&sessions) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to serialize design sessions");
                return;
            }
        };

        if let Err(err) = self.storage.set(SESSIONS_KEY, &payload).await {
            let err = DesignError::Persistence(format!("{SESSIONS_KEY}: {err}"));
            tracing::error!(error = %err, "Failed to write to storage");
        }
    }

    async fn save_active(&self) {
        let res = match self.active_session_id {
            Some(session_id) => {
                self.storage
                    .set(ACTIVE_SESSION_KEY, &session_id.to_string())
                    .await
            }
            None => self.storage.remove(ACTIVE_SESSION_KEY).await,
        };

        if let Err(err) = res {
            let err = DesignError::Persistence(format!("{ACTIVE_SESSION_KEY}: {err}"));
            tracing::error!(error = %err, "Failed to write to storage");
        }
    }
}
