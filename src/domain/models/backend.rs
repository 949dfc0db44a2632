#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::ImageState;
use super::Plant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendName {
    Gemini,
}

/// Deadline and cancellation signal handed to every remote call.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl RequestOptions {
    pub fn new(timeout: Duration) -> RequestOptions {
        return RequestOptions {
            timeout,
            cancel: CancellationToken::new(),
        };
    }

    /// Drives `fut` until it resolves, the deadline passes, or the request is
    /// cancelled, whichever happens first.
    pub async fn guard<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let res = tokio::select! {
            _ = self.cancel.cancelled() => Err(anyhow!("The request was cancelled.")),
            res = tokio::time::timeout(self.timeout, fut) => res.unwrap_or_else(|_| {
                return Err(anyhow!(
                    "The request timed out after {}ms.",
                    self.timeout.as_millis()
                ));
            }),
        };

        return res;
    }
}

#[async_trait]
pub trait Backend {
    /// Used before any remote call to verify all configurations are
    /// available to work with the backend.
    async fn health_check(&self) -> Result<()>;

    /// Redesigns `image` according to `prompt`. Fails when the service
    /// errors or returns no image.
    async fn generate_image(
        &self,
        image: &ImageState,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<ImageState>;

    /// Lists the plants visible in `image`. An empty list is a valid answer.
    async fn identify_plants(
        &self,
        image: &ImageState,
        options: &RequestOptions,
    ) -> Result<Vec<Plant>>;

    /// Sends a message to the gardening assistant. The backend keeps the
    /// conversation so far and replays it on every call.
    async fn send_chat_message(&self, text: &str) -> Result<String>;
}

pub type BackendBox = Arc<dyn Backend + Send + Sync>;
