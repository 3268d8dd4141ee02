pub mod fixtures;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use thiserror::Error as ThisError;
use crate::cli::Args;
use crate::models::chat::{ ChatMessage, Conversation };

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("failed to (de)serialize stored record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// All conversations, oldest first, each with its messages attached.
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError>;

    /// Messages of one conversation in insertion order. Unknown ids yield an empty list.
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Creates the conversation if it does not exist yet. Returns true when it was created.
    async fn upsert_conversation(&self, conversation_id: &str, name: &str) -> Result<bool, StoreError>;

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage
    ) -> Result<(), StoreError>;

    /// Removes the conversation and all of its messages. Returns false if it did not exist.
    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, StoreError>;
}

pub fn create_store(
    args: &Args
) -> Result<Option<Arc<dyn ConversationStore>>, Box<dyn Error + Send + Sync>> {
    match args.store_type.to_lowercase().as_str() {
        "redis" => {
            match args.store_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                Some(url) => {
                    let store = redis::RedisConversationStore::new(url, &args.store_redis_prefix)?;
                    Ok(Some(Arc::new(store)))
                }
                None => Ok(None),
            }
        }
        "memory" => {
            let store = if args.seed_fixtures {
                memory::MemoryConversationStore::with_conversations(fixtures::conversations())
            } else {
                memory::MemoryConversationStore::new()
            };
            Ok(Some(Arc::new(store)))
        }
        "none" | "mock" => Ok(None),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported store type: {}", args.store_type)
                    )
                )
            ),
    }
}

pub fn initialize_store(
    args: &Args
) -> Result<Option<Arc<dyn ConversationStore>>, Box<dyn Error + Send + Sync>> {
    info!(
        "Conversations will be stored in: {} at {}",
        args.store_type,
        args.store_url.as_deref().unwrap_or("(none)")
    );
    create_store(args)
}
