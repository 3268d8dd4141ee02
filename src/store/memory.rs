use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::models::chat::{ ChatMessage, Conversation };
use super::{ ConversationStore, StoreError };

/// Conversations kept in creation order behind a single lock, so every
/// append lands atomically.
#[derive(Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<Vec<Conversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(conversations: Vec<Conversation>) -> Self {
        Self {
            conversations: RwLock::new(conversations),
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        Ok(self.conversations.read().await.clone())
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let guard = self.conversations.read().await;
        Ok(
            guard
                .iter()
                .find(|c| c.id == conversation_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default()
        )
    }

    async fn upsert_conversation(&self, conversation_id: &str, name: &str) -> Result<bool, StoreError> {
        let mut guard = self.conversations.write().await;
        if guard.iter().any(|c| c.id == conversation_id) {
            return Ok(false);
        }
        guard.push(Conversation {
            id: conversation_id.to_string(),
            name: name.to_string(),
            messages: Vec::new(),
        });
        Ok(true)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage
    ) -> Result<(), StoreError> {
        let mut guard = self.conversations.write().await;
        match guard.iter_mut().find(|c| c.id == conversation_id) {
            Some(conv) => {
                conv.messages.push(message.clone());
                Ok(())
            }
            None => Err(StoreError::Unavailable(format!("unknown conversation '{}'", conversation_id))),
        }
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, StoreError> {
        let mut guard = self.conversations.write().await;
        let before = guard.len();
        guard.retain(|c| c.id != conversation_id);
        Ok(guard.len() != before)
    }
}
