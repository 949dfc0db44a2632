use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Durable key/value storage the session store persists through.
#[async_trait]
pub trait Storage {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T> Storage for Arc<T>
where
    T: Storage + Send + Sync + ?Sized,
{
    #[allow(clippy::implicit_return)]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        return self.as_ref().get(key).await;
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        return self.as_ref().set(key, value).await;
    }

    #[allow(clippy::implicit_return)]
    async fn remove(&self, key: &str) -> Result<()> {
        return self.as_ref().remove(key).await;
    }
}

pub type StorageBox = Box<dyn Storage + Send + Sync>;
