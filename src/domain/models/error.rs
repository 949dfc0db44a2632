use thiserror::Error;

use super::DesignId;

pub const GENERATION_FALLBACK: &str = "An unknown error occurred during image generation.";
pub const IDENTIFICATION_WARNING: &str = "Could not identify plants, but here's your new garden!";
pub const CHAT_FALLBACK: &str = "Something went wrong.";

/// Everything a user can be told went wrong while designing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DesignError {
    #[error("Please upload an image first.")]
    NoImage,
    #[error("Please select a valid image file.")]
    InvalidImage,
    #[error("No design session found for id {0}.")]
    UnknownSession(DesignId),
    #[error("No design found for id {0}.")]
    UnknownHistoryItem(DesignId),
    #[error("{0}")]
    Generation(String),
    #[error("{0}")]
    Identification(String),
    #[error("Failed to persist {0}")]
    Persistence(String),
    #[error("{0}")]
    Chat(String),
}

impl DesignError {
    /// Uses the collaborator's message, or a generic one when it has none.
    pub fn generation(err: &anyhow::Error) -> DesignError {
        let message = err.to_string();
        if message.trim().is_empty() {
            return DesignError::Generation(GENERATION_FALLBACK.to_string());
        }

        return DesignError::Generation(message);
    }

    pub fn identification() -> DesignError {
        return DesignError::Identification(IDENTIFICATION_WARNING.to_string());
    }

    pub fn chat(err: &anyhow::Error) -> DesignError {
        let message = err.to_string();
        if message.trim().is_empty() {
            return DesignError::Chat(CHAT_FALLBACK.to_string());
        }

        return DesignError::Chat(message);
    }
}
