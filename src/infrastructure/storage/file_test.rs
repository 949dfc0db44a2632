use anyhow::Result;

use super::FileStorage;
use crate::domain::models::Storage;

#[tokio::test]
async fn it_returns_none_for_missing_keys() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::new(dir.path().join("storage"));

    assert_eq!(storage.get("design-sessions").await?, None);
    storage.remove("design-sessions").await?;

    return Ok(());
}

#[tokio::test]
async fn it_writes_reads_and_removes_entries() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = FileStorage::new(dir.path().join("nested/storage"));

    storage.set("active-session-id", "1700000000000").await?;
    assert_eq!(
        storage.get("active-session-id").await?,
        Some("1700000000000".to_string())
    );
    assert!(dir
        .path()
        .join("nested/storage/active-session-id.json")
        .exists());
    assert!(!dir
        .path()
        .join("nested/storage/active-session-id.json.tmp")
        .exists());

    storage.set("active-session-id", "1700000000001").await?;
    assert_eq!(
        storage.get("active-session-id").await?,
        Some("1700000000001".to_string())
    );

    storage.remove("active-session-id").await?;
    assert_eq!(storage.get("active-session-id").await?, None);

    return Ok(());
}
