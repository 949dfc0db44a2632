#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use crate::domain::models::BackendBox;
use crate::domain::models::ChatMessage;
use crate::domain::models::ChatRole;
use crate::domain::models::DesignError;

pub const CHAT_GREETING: &str = "Hi! I'm Bloom, your gardening assistant. Ask me anything!";

/// Transcript of a conversation with the gardening assistant. Failed replies
/// show up as assistant messages and the conversation carries on.
pub struct ChatService {
    backend: BackendBox,
    messages: Vec<ChatMessage>,
}

impl ChatService {
    pub fn new(backend: BackendBox) -> ChatService {
        return ChatService {
            backend,
            messages: vec![ChatMessage::new(ChatRole::Model, CHAT_GREETING)],
        };
    }

    pub fn messages(&self) -> &[ChatMessage] {
        return &self.messages;
    }

    /// Returns the assistant's reply, or None when `text` is blank.
    pub async fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::new(ChatRole::User, text));

        let reply = match self.backend.send_chat_message(text).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(error = ?err, "Error sending chat message");
                DesignError::chat(&err).to_string()
            }
        };

        self.messages.push(ChatMessage::new(ChatRole::Model, &reply));
        return self.messages.last();
    }
}
