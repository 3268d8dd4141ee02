use async_trait::async_trait;
use chrono::{ DateTime, Utc };
use log::{ debug, error };
use redis::{ Client, AsyncCommands };
use redis::aio::MultiplexedConnection;
use serde::{ Serialize, Deserialize };
use tokio::sync::OnceCell;
use crate::models::chat::{ Author, ChatMessage, Conversation };
use super::{ ConversationStore, StoreError };

#[derive(Serialize, Deserialize)]
struct StoredConversation {
    name: String,
    created_at: i64,
}

#[derive(Serialize, Deserialize)]
struct StoredMessage {
    id: String,
    author: Author,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<&ChatMessage> for StoredMessage {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            id: msg.id.clone(),
            author: msg.author,
            text: msg.content.clone(),
            created_at: msg.timestamp,
        }
    }
}

impl From<StoredMessage> for ChatMessage {
    fn from(msg: StoredMessage) -> Self {
        Self {
            id: msg.id,
            author: msg.author,
            content: msg.text,
            timestamp: msg.created_at,
        }
    }
}

/// Layout under `key_prefix`:
/// `conversations` sorted set of ids scored by creation time,
/// `conversation:<id>` JSON record, `messages:<id>` list of JSON messages (RPUSH order).
pub struct RedisConversationStore {
    client: Client,
    conn: OnceCell<MultiplexedConnection>,
    key_prefix: String,
}

impl RedisConversationStore {
    pub fn new(url: &str, key_prefix: &str) -> Result<Self, StoreError> {
        Ok(Self {
            client: Client::open(url)?,
            conn: OnceCell::new(),
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let conn = self.conn
            .get_or_try_init(|| async {
                debug!("Opening Redis connection");
                self.client.get_multiplexed_async_connection().await
            }).await?;
        Ok(conn.clone())
    }

    fn index_key(&self) -> String {
        format!("{}conversations", self.key_prefix)
    }

    fn conversation_key(&self, conversation_id: &str) -> String {
        format!("{}conversation:{}", self.key_prefix, conversation_id)
    }

    fn messages_key(&self, conversation_id: &str) -> String {
        format!("{}messages:{}", self.key_prefix, conversation_id)
    }

    fn decode_messages(entries: &[String]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_str::<StoredMessage>(entry) {
                Ok(msg) => messages.push(msg.into()),
                Err(e) => {
                    error!("Error parsing stored message: {}", e);
                }
            }
        }
        messages
    }

    fn decode_conversation_name(record: &str) -> Option<String> {
        match serde_json::from_str::<StoredConversation>(record) {
            Ok(stored) => Some(stored.name),
            Err(e) => {
                error!("Error parsing stored conversation: {}", e);
                None
            }
        }
    }

    /// `SETNX` record then `ZADD NX` index entry in one MULTI/EXEC. The index
    /// write runs on every upsert so an id whose record exists but is missing
    /// from the index gets re-added.
    fn upsert_pipeline(&self, conversation_id: &str, record: String, created_at: i64) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .set_nx(self.conversation_key(conversation_id), record)
            .cmd("ZADD")
            .arg(self.index_key())
            .arg("NX")
            .arg(created_at)
            .arg(conversation_id);
        pipe
    }
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut conn = self.get_connection().await?;
        let ids: Vec<String> = conn.zrange(self.index_key(), 0, -1).await?;
        let mut conversations = Vec::with_capacity(ids.len());

        for id in ids {
            let record: Option<String> = conn.get(self.conversation_key(&id)).await?;
            let Some(name) = record.as_deref().and_then(Self::decode_conversation_name) else {
                continue;
            };
            let entries: Vec<String> = conn.lrange(self.messages_key(&id), 0, -1).await?;
            conversations.push(Conversation {
                id,
                name,
                messages: Self::decode_messages(&entries),
            });
        }

        Ok(conversations)
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let mut conn = self.get_connection().await?;
        let entries: Vec<String> = conn.lrange(self.messages_key(conversation_id), 0, -1).await?;
        Ok(Self::decode_messages(&entries))
    }

    async fn upsert_conversation(&self, conversation_id: &str, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.get_connection().await?;
        let created_at = Utc::now().timestamp_millis();
        let record = serde_json::to_string(&StoredConversation {
            name: name.to_string(),
            created_at,
        })?;

        let (created, _): (bool, i64) = self
            .upsert_pipeline(conversation_id, record, created_at)
            .query_async(&mut conn).await?;
        Ok(created)
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        message: &ChatMessage
    ) -> Result<(), StoreError> {
        let mut conn = self.get_connection().await?;
        let json_msg = serde_json::to_string(&StoredMessage::from(message))?;
        let _: i64 = conn.rpush(self.messages_key(conversation_id), json_msg).await?;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.get_connection().await?;
        let (removed, _, _): (i64, i64, i64) = redis::pipe()
            .atomic()
            .del(self.conversation_key(conversation_id))
            .del(self.messages_key(conversation_id))
            .zrem(self.index_key(), conversation_id)
            .query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}
