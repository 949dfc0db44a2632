use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use test_utils::jpeg_fixture;
use test_utils::png_fixture;

use super::SessionStore;
use super::ACTIVE_SESSION_KEY;
use super::SESSIONS_KEY;
use crate::domain::models::DesignHistoryItem;
use crate::domain::models::DesignSession;
use crate::domain::models::ImageState;
use crate::domain::models::Storage;
use crate::infrastructure::storage::MemoryStorage;

struct BrokenStorage {}

#[async_trait]
impl Storage for BrokenStorage {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        bail!("disk on fire");
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        bail!("disk on fire");
    }

    async fn remove(&self, _key: &str) -> Result<()> {
        bail!("disk on fire");
    }
}

fn upload() -> ImageState {
    return ImageState::new(png_fixture(), "image/png");
}

fn design(id: u64, prompt: &str) -> DesignHistoryItem {
    return DesignHistoryItem {
        id,
        original_image: upload(),
        prompt: prompt.to_string(),
        generated_image: ImageState::new(jpeg_fixture(), "image/jpeg"),
    };
}

#[tokio::test]
async fn it_creates_and_activates_sessions() {
    let storage = Arc::new(MemoryStorage::default());
    let mut store = SessionStore::new(Box::new(storage.clone()));

    let first = store.create_session(upload()).await;
    let second = store.create_session(upload()).await;

    assert!(second.id > first.id);
    assert_eq!(store.sessions().len(), 2);
    assert_eq!(store.active_session_id(), Some(second.id));
    assert!(second.history.is_empty());

    assert!(storage.get(SESSIONS_KEY).await.unwrap().is_some());
    assert_eq!(
        storage.get(ACTIVE_SESSION_KEY).await.unwrap(),
        Some(second.id.to_string())
    );
}

#[tokio::test]
async fn it_appends_history_copy_on_write() {
    let mut store = SessionStore::new(Box::<MemoryStorage>::default());
    let session = store.create_session(upload()).await;
    let item_id = store.next_id();

    assert!(
        store
            .append_history_item(session.id, design(item_id, "add roses"))
            .await
    );

    // The handle taken before the append is a stable snapshot.
    assert!(session.history.is_empty());

    let updated = store.session(session.id).unwrap();
    assert_eq!(updated.history.len(), 1);
    assert_eq!(updated.history[0].prompt, "add roses");
}

#[tokio::test]
async fn it_ignores_appends_to_unknown_sessions() {
    let mut store = SessionStore::new(Box::<MemoryStorage>::default());
    let session = store.create_session(upload()).await;

    assert!(!store.append_history_item(42, design(43, "nope")).await);
    assert!(store.session(session.id).unwrap().history.is_empty());
}

#[tokio::test]
async fn it_keeps_sessions_isolated() {
    let mut store = SessionStore::new(Box::<MemoryStorage>::default());
    let a = store.create_session(upload()).await;
    let b = store.create_session(upload()).await;

    store.set_active(Some(a.id)).await;
    let item_id = store.next_id();
    store
        .append_history_item(a.id, design(item_id, "a only"))
        .await;

    assert_eq!(store.session(a.id).unwrap().history.len(), 1);
    assert!(store.session(b.id).unwrap().history.is_empty());
}

#[tokio::test]
async fn it_finds_history_items_across_sessions() {
    let mut store = SessionStore::new(Box::<MemoryStorage>::default());
    let a = store.create_session(upload()).await;
    let b = store.create_session(upload()).await;
    let a_item = store.next_id();
    let b_item = store.next_id();
    store.append_history_item(a.id, design(a_item, "a")).await;
    store.append_history_item(b.id, design(b_item, "b")).await;

    let (owner, item) = store.find_history_item(a_item).unwrap();
    assert_eq!(owner, a.id);
    assert_eq!(item.prompt, "a");

    let (owner, _) = store.find_history_item(b_item).unwrap();
    assert_eq!(owner, b.id);

    assert!(store.find_history_item(1).is_none());
}

#[tokio::test]
async fn it_round_trips_through_storage() {
    let storage = Arc::new(MemoryStorage::default());
    let mut store = SessionStore::new(Box::new(storage.clone()));
    let session = store.create_session(upload()).await;
    let item_id = store.next_id();
    store
        .append_history_item(session.id, design(item_id, "add roses"))
        .await;

    let reloaded = SessionStore::open(Box::new(storage.clone())).await;
    assert_eq!(reloaded.active_session_id(), Some(session.id));
    assert_eq!(
        reloaded.sessions()[0].as_ref(),
        store.sessions()[0].as_ref()
    );
}

#[tokio::test]
async fn it_never_reuses_ids_after_reload() {
    let storage = Arc::new(MemoryStorage::default());
    let far_future = 4_000_000_000_000;
    let session = DesignSession::new(far_future, upload()).with_item(design(far_future + 7, "x"));
    storage
        .set(SESSIONS_KEY, &serde_json::to_string(&vec![session]).unwrap())
        .await
        .unwrap();

    let mut store = SessionStore::open(Box::new(storage.clone())).await;
    assert_eq!(store.next_id(), far_future + 8);
}

#[tokio::test]
async fn it_drops_sessions_with_exhausted_ids_on_load() {
    let storage = Arc::new(MemoryStorage::default());
    let sessions = vec![
        DesignSession::new(u64::MAX, upload()),
        DesignSession::new(200, upload()).with_item(design(u64::MAX - 1, "x")),
        DesignSession::new(100, upload()),
    ];
    storage
        .set(SESSIONS_KEY, &serde_json::to_string(&sessions).unwrap())
        .await
        .unwrap();
    storage.set(ACTIVE_SESSION_KEY, &u64::MAX.to_string()).await.unwrap();

    let mut store = SessionStore::open(Box::new(storage.clone())).await;
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.sessions()[0].id, 100);
    assert_eq!(store.active_session_id(), None);

    let created = store.create_session(upload()).await;
    assert!(created.id > 100);
    assert!(created.id < u64::MAX - 1);
}

#[tokio::test]
async fn it_clears_dangling_active_session_on_load() {
    let storage = Arc::new(MemoryStorage::default());
    let session = DesignSession::new(100, upload());
    storage
        .set(SESSIONS_KEY, &serde_json::to_string(&vec![session]).unwrap())
        .await
        .unwrap();
    storage.set(ACTIVE_SESSION_KEY, "999").await.unwrap();

    let store = SessionStore::open(Box::new(storage.clone())).await;

    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.active_session_id(), None);
    assert_eq!(storage.get(ACTIVE_SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn it_falls_back_to_empty_on_corrupted_data() {
    let storage = Arc::new(MemoryStorage::default());
    storage.set(SESSIONS_KEY, "[{\"id\": ").await.unwrap();
    storage.set(ACTIVE_SESSION_KEY, "not-a-number").await.unwrap();

    let store = SessionStore::open(Box::new(storage.clone())).await;

    assert!(store.sessions().is_empty());
    assert_eq!(store.active_session_id(), None);
}

#[tokio::test]
async fn it_falls_back_to_empty_on_blank_data() {
    let storage = Arc::new(MemoryStorage::default());
    storage.set(SESSIONS_KEY, "   ").await.unwrap();

    let store = SessionStore::open(Box::new(storage)).await;
    assert!(store.sessions().is_empty());
}

#[tokio::test]
async fn it_keeps_working_in_memory_when_storage_fails() {
    let mut store = SessionStore::open(Box::new(BrokenStorage {})).await;
    assert!(store.sessions().is_empty());

    let session = store.create_session(upload()).await;
    let item_id = store.next_id();
    assert!(
        store
            .append_history_item(session.id, design(item_id, "still works"))
            .await
    );

    assert_eq!(store.active_session().unwrap().history.len(), 1);
}
