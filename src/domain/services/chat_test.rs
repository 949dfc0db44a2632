use std::sync::Arc;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;

use super::ChatService;
use crate::domain::models::Backend;
use crate::domain::models::ChatMessage;
use crate::domain::models::ChatRole;
use crate::domain::models::ImageState;
use crate::domain::models::Plant;
use crate::domain::models::RequestOptions;

#[derive(Default)]
struct EchoBackend {
    fail_next: Mutex<bool>,
}

#[async_trait]
impl Backend for EchoBackend {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate_image(
        &self,
        _image: &ImageState,
        _prompt: &str,
        _options: &RequestOptions,
    ) -> Result<ImageState> {
        bail!("not used");
    }

    #[allow(clippy::implicit_return)]
    async fn identify_plants(
        &self,
        _image: &ImageState,
        _options: &RequestOptions,
    ) -> Result<Vec<Plant>> {
        bail!("not used");
    }

    #[allow(clippy::implicit_return)]
    async fn send_chat_message(&self, text: &str) -> Result<String> {
        let fail = std::mem::take(&mut *self.fail_next.lock().unwrap());
        if fail {
            bail!("Sorry, I couldn't process your message right now.");
        }
        return Ok(format!("You said: {text}"));
    }
}

#[tokio::test]
async fn it_starts_with_a_greeting() {
    let chat = ChatService::new(Arc::new(EchoBackend::default()));
    assert_eq!(chat.messages().len(), 1);
    assert_eq!(chat.messages()[0].role, ChatRole::Model);
}

#[tokio::test]
async fn it_records_both_sides_of_the_conversation() {
    let mut chat = ChatService::new(Arc::new(EchoBackend::default()));
    let reply = chat.send("  When do I prune roses? ").await.cloned();

    assert_eq!(
        reply,
        Some(ChatMessage::new(
            ChatRole::Model,
            "You said: When do I prune roses?"
        ))
    );
    assert_eq!(chat.messages().len(), 3);
    assert_eq!(chat.messages()[1].role, ChatRole::User);
}

#[tokio::test]
async fn it_ignores_blank_messages() {
    let mut chat = ChatService::new(Arc::new(EchoBackend::default()));
    assert!(chat.send("   ").await.is_none());
    assert_eq!(chat.messages().len(), 1);
}

#[tokio::test]
async fn it_turns_failures_into_assistant_replies() {
    let backend = EchoBackend::default();
    *backend.fail_next.lock().unwrap() = true;
    let mut chat = ChatService::new(Arc::new(backend));

    let reply = chat.send("Hello?").await.cloned().unwrap();
    assert_eq!(reply.role, ChatRole::Model);
    insta::assert_snapshot!(reply.text, @"Sorry, I couldn't process your message right now.");

    let reply = chat.send("Still there?").await.cloned().unwrap();
    assert_eq!(reply.text, "You said: Still there?");
    assert_eq!(chat.messages().len(), 5);
}
