use log::{ error, info, warn };
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::llm::chat::{ CompletionClient, ProviderError };
use crate::models::chat::{ default_conversation_name, Author, ChatMessage, Conversation };
use crate::store::{ fixtures, ConversationStore, StoreError };

pub const MESSAGE_ADDED: &str = "Message added successfully";
pub const MESSAGE_DROPPED: &str = "Message dropped";
pub const MOCK_REPLY: &str = "This is a mock response";
pub const PROVIDER_FAILURE_REPLY: &str = "Failed to communicate with the AI";
pub const NO_STORE_REPLY: &str = "Database not defined";
pub const NOT_IMPLEMENTED: &str = "not implemented";
pub const CONVERSATION_DELETED: &str = "Conversation deleted";

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A response value, tagged with whether it came from the store or from
/// the fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum Served<T> {
    Live(T),
    Degraded {
        value: T,
        reason: String,
    },
}

impl<T> Served<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Served::Degraded { value, reason: reason.into() }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Served::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Served::Live(_) => None,
            Served::Degraded { reason, .. } => Some(reason.as_str()),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Served::Live(value) | Served::Degraded { value, .. } => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Served<U> {
        match self {
            Served::Live(value) => Served::Live(f(value)),
            Served::Degraded { value, reason } => Served::Degraded { value: f(value), reason },
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Served::Live(value) | Served::Degraded { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub message: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    NotImplemented,
    Deleted,
}

impl DeleteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            DeleteOutcome::NotImplemented => NOT_IMPLEMENTED,
            DeleteOutcome::Deleted => CONVERSATION_DELETED,
        }
    }
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub store: Option<Arc<dyn ConversationStore>>,
    pub provider: Option<Arc<dyn CompletionClient>>,
    pub provider_timeout: Duration,
    pub enable_delete: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: None,
            provider: None,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            enable_delete: false,
        }
    }
}

#[derive(Clone)]
pub struct ConversationService {
    store: Option<Arc<dyn ConversationStore>>,
    provider: Option<Arc<dyn CompletionClient>>,
    provider_timeout: Duration,
    enable_delete: bool,
}

fn require_id(conversation_id: &str) -> Result<(), ServiceError> {
    if conversation_id.trim().is_empty() {
        return Err(ServiceError::BadRequest("Missing conversationId".to_string()));
    }
    Ok(())
}

/// Message text is taken as-is; only an empty string counts as missing.
fn require_text(text: &str) -> Result<(), ServiceError> {
    if text.is_empty() {
        return Err(ServiceError::BadRequest("Missing message".to_string()));
    }
    Ok(())
}

impl ConversationService {
    pub fn new(config: ServiceConfig) -> Self {
        if config.store.is_none() {
            warn!("No conversation store configured, serving mock data.");
        }
        if config.provider.is_none() {
            warn!("No completion provider configured, using mock replies.");
        }
        Self {
            store: config.store,
            provider: config.provider,
            provider_timeout: config.provider_timeout,
            enable_delete: config.enable_delete,
        }
    }

    pub async fn list_conversations(&self) -> Served<Vec<Conversation>> {
        let Some(store) = &self.store else {
            return Served::degraded(fixtures::conversations(), "no conversation store configured");
        };
        match store.list_conversations().await {
            Ok(conversations) => Served::Live(conversations),
            Err(e) => {
                warn!("Could not list conversations, returning mock data: {}", e);
                Served::degraded(fixtures::conversations(), e.to_string())
            }
        }
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &str
    ) -> Result<Served<Vec<ChatMessage>>, ServiceError> {
        require_id(conversation_id)?;
        let Some(store) = &self.store else {
            return Ok(
                Served::degraded(
                    fixtures::messages_for(conversation_id),
                    "no conversation store configured"
                )
            );
        };
        match store.get_messages(conversation_id).await {
            Ok(messages) => Ok(Served::Live(messages)),
            Err(e) => {
                warn!("Could not fetch conversation {}, returning mock data: {}", conversation_id, e);
                Ok(Served::degraded(fixtures::messages_for(conversation_id), e.to_string()))
            }
        }
    }

    /// Upserts the conversation, persists the human message, then asks the
    /// provider for a reply and persists that too. The human message is
    /// always written before the provider is contacted.
    pub async fn post_message(
        &self,
        conversation_id: &str,
        text: &str
    ) -> Result<Served<PostedMessage>, ServiceError> {
        require_id(conversation_id)?;
        require_text(text)?;

        let Some(store) = &self.store else {
            warn!("No conversation store configured, dropping message for {}", conversation_id);
            return Ok(
                Served::degraded(
                    PostedMessage {
                        message: MESSAGE_DROPPED.to_string(),
                        answer: NO_STORE_REPLY.to_string(),
                    },
                    "no conversation store configured"
                )
            );
        };

        if let Err(e) = Self::persist_human_message(store.as_ref(), conversation_id, text).await {
            warn!("Could not save message for {}, answering with mock data: {}", conversation_id, e);
            return Ok(
                Served::degraded(
                    PostedMessage {
                        message: MESSAGE_DROPPED.to_string(),
                        answer: MOCK_REPLY.to_string(),
                    },
                    e.to_string()
                )
            );
        }

        let answer = self.generate_reply(text).await;

        let ai_message = ChatMessage::new(Uuid::new_v4().to_string(), Author::Assistant, answer.clone());
        if let Err(e) = store.append_message(conversation_id, &ai_message).await {
            error!("Error saving AI message for {}: {}", conversation_id, e);
        }

        Ok(
            Served::Live(PostedMessage {
                message: MESSAGE_ADDED.to_string(),
                answer,
            })
        )
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<DeleteOutcome, ServiceError> {
        require_id(conversation_id)?;
        if !self.enable_delete {
            return Ok(DeleteOutcome::NotImplemented);
        }
        let Some(store) = &self.store else {
            return Ok(DeleteOutcome::NotImplemented);
        };

        let existed = store.delete_conversation(conversation_id).await?;
        info!("Deleted conversation {} (existed: {})", conversation_id, existed);
        Ok(DeleteOutcome::Deleted)
    }

    async fn persist_human_message(
        store: &dyn ConversationStore,
        conversation_id: &str,
        text: &str
    ) -> Result<(), StoreError> {
        if store.upsert_conversation(conversation_id, &default_conversation_name(conversation_id)).await? {
            info!("Created conversation {}", conversation_id);
        }
        let message = ChatMessage::new(Uuid::new_v4().to_string(), Author::Human, text);
        store.append_message(conversation_id, &message).await
    }

    async fn generate_reply(&self, text: &str) -> String {
        let Some(provider) = &self.provider else {
            return MOCK_REPLY.to_string();
        };

        let result = match tokio::time::timeout(self.provider_timeout, provider.complete(text)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.provider_timeout.as_secs())),
        };

        match result {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error calling the AI ({}): {}", provider.get_model(), e);
                PROVIDER_FAILURE_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryConversationStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Store whose every call fails.
    struct DownStore;

    #[async_trait]
    impl ConversationStore for DownStore {
        async fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn get_messages(&self, _: &str) -> Result<Vec<ChatMessage>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn upsert_conversation(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn append_message(&self, _: &str, _: &ChatMessage) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        async fn delete_conversation(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    /// Provider that records what the store held when it was called.
    struct ObservingProvider {
        store: Arc<MemoryConversationStore>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
        reply: Result<String, ()>,
    }

    #[async_trait]
    impl CompletionClient for ObservingProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            let snapshot = self.store.get_messages("42").await.unwrap_or_default();
            self.seen.lock().unwrap().push(snapshot);
            self.reply.clone().map_err(|_| ProviderError::EmptyResponse)
        }
        fn get_model(&self) -> String {
            "observer".into()
        }
        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl CompletionClient for HangingProvider {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            std::future::pending().await
        }
        fn get_model(&self) -> String {
            "hang".into()
        }
        fn get_base_url(&self) -> Option<String> {
            None
        }
    }

    fn service_with(store: Arc<dyn ConversationStore>) -> ConversationService {
        ConversationService::new(ServiceConfig {
            store: Some(store),
            ..ServiceConfig::default()
        })
    }

    #[tokio::test]
    async fn post_without_provider_appends_human_then_mock_reply() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = service_with(store.clone());

        let posted = service.post_message("42", "Hello").await.unwrap();
        assert_eq!(
            posted,
            Served::Live(PostedMessage {
                message: "Message added successfully".into(),
                answer: "This is a mock response".into(),
            })
        );

        let messages = store.get_messages("42").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!((messages[0].author, messages[0].content.as_str()), (Author::Human, "Hello"));
        assert_eq!(
            (messages[1].author, messages[1].content.as_str()),
            (Author::Assistant, "This is a mock response")
        );
    }

    #[tokio::test]
    async fn post_creates_unknown_conversation_with_default_name() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = service_with(store.clone());

        service.post_message("fresh", "hi").await.unwrap();

        let listed = service.list_conversations().await;
        assert!(!listed.is_degraded());
        let convs = listed.into_value();
        assert_eq!(convs.len(), 1);
        assert_eq!(convs[0].id, "fresh");
        assert_eq!(convs[0].name, "Conversation fresh");
    }

    #[tokio::test]
    async fn human_message_is_persisted_before_provider_call() {
        let store = Arc::new(MemoryConversationStore::new());
        let provider = Arc::new(ObservingProvider {
            store: store.clone(),
            seen: Mutex::new(Vec::new()),
            reply: Err(()),
        });
        let service = ConversationService::new(ServiceConfig {
            store: Some(store.clone()),
            provider: Some(provider.clone()),
            ..ServiceConfig::default()
        });

        let posted = service.post_message("42", "Hello").await.unwrap().into_value();
        assert_eq!(posted.message, MESSAGE_ADDED);
        assert_eq!(posted.answer, PROVIDER_FAILURE_REPLY);

        let seen = provider.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0][0].author, Author::Human);
        assert_eq!(seen[0][0].content, "Hello");

        let messages = store.get_messages("42").await.unwrap();
        assert_eq!(messages.last().unwrap().content, PROVIDER_FAILURE_REPLY);
    }

    #[tokio::test]
    async fn provider_reply_is_persisted_as_assistant_message() {
        let store = Arc::new(MemoryConversationStore::new());
        let provider = Arc::new(ObservingProvider {
            store: store.clone(),
            seen: Mutex::new(Vec::new()),
            reply: Ok("General Kenobi".into()),
        });
        let service = ConversationService::new(ServiceConfig {
            store: Some(store.clone()),
            provider: Some(provider),
            ..ServiceConfig::default()
        });

        let posted = service.post_message("42", "Hello there").await.unwrap();
        assert_eq!(posted.value().answer, "General Kenobi");

        let messages = store.get_messages("42").await.unwrap();
        assert_eq!(messages[1].author, Author::Assistant);
        assert_eq!(messages[1].content, "General Kenobi");
    }

    #[tokio::test]
    async fn provider_timeout_keeps_human_message() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = ConversationService::new(ServiceConfig {
            store: Some(store.clone()),
            provider: Some(Arc::new(HangingProvider)),
            provider_timeout: Duration::from_millis(50),
            enable_delete: false,
        });

        let posted = service.post_message("42", "anyone?").await.unwrap().into_value();
        assert_eq!(posted.answer, PROVIDER_FAILURE_REPLY);

        let messages = store.get_messages("42").await.unwrap();
        assert_eq!(messages[0].content, "anyone?");
        assert_eq!(messages[0].author, Author::Human);
    }

    #[tokio::test]
    async fn posted_message_round_trips_through_get_conversation() {
        let service = service_with(Arc::new(MemoryConversationStore::new()));
        service.post_message("7", "round trip").await.unwrap();

        let messages = service.get_conversation("7").await.unwrap();
        assert!(!messages.is_degraded());
        let first = &messages.value()[0];
        assert_eq!(first.content, "round trip");
        assert_eq!(first.author, Author::Human);
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty_not_an_error() {
        let service = service_with(Arc::new(MemoryConversationStore::new()));
        let messages = service.get_conversation("nope").await.unwrap();
        assert_eq!(messages, Served::Live(Vec::new()));
    }

    #[tokio::test]
    async fn missing_fields_are_bad_requests() {
        let service = service_with(Arc::new(MemoryConversationStore::new()));
        assert!(matches!(service.get_conversation("  ").await, Err(ServiceError::BadRequest(_))));
        assert!(matches!(service.post_message("", "hi").await, Err(ServiceError::BadRequest(_))));
        assert!(matches!(service.post_message("1", "").await, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn whitespace_message_is_stored_verbatim() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = service_with(store.clone());

        let posted = service.post_message("42", "   ").await.unwrap();
        assert_eq!(posted.value().message, MESSAGE_ADDED);
        assert_eq!(store.get_messages("42").await.unwrap()[0].content, "   ");
    }

    #[tokio::test]
    async fn unreachable_store_degrades_reads_to_fixtures() {
        let service = service_with(Arc::new(DownStore));

        let listed = service.list_conversations().await;
        assert!(listed.is_degraded());
        assert_eq!(listed.value(), &fixtures::conversations());

        let messages = service.get_conversation("1").await.unwrap();
        assert!(messages.is_degraded());
        assert_eq!(messages.into_value(), fixtures::messages_for("1"));
    }

    #[tokio::test]
    async fn unreachable_store_degrades_writes_without_failing() {
        let service = service_with(Arc::new(DownStore));
        let posted = service.post_message("1", "hi").await.unwrap();
        assert!(posted.is_degraded());
        assert_eq!(posted.value().message, MESSAGE_DROPPED);
        assert_eq!(posted.value().answer, MOCK_REPLY);
    }

    #[tokio::test]
    async fn missing_store_serves_fixtures_and_drops_writes() {
        let service = ConversationService::new(ServiceConfig::default());

        assert_eq!(service.list_conversations().await.into_value().len(), 2);
        let posted = service.post_message("1", "hi").await.unwrap();
        assert_eq!(posted.reason(), Some("no conversation store configured"));
        assert_eq!(posted.value().answer, NO_STORE_REPLY);
    }

    #[tokio::test]
    async fn delete_is_a_stub_by_default() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = service_with(store.clone());
        service.post_message("42", "keep me").await.unwrap();

        let outcome = service.delete_conversation("42").await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotImplemented);
        assert_eq!(outcome.message(), "not implemented");
        assert_eq!(store.get_messages("42").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn enabled_delete_cascades() {
        let store = Arc::new(MemoryConversationStore::new());
        let service = ConversationService::new(ServiceConfig {
            store: Some(store.clone()),
            enable_delete: true,
            ..ServiceConfig::default()
        });
        service.post_message("42", "bye").await.unwrap();

        assert_eq!(service.delete_conversation("42").await.unwrap(), DeleteOutcome::Deleted);
        assert!(store.list_conversations().await.unwrap().is_empty());
        assert!(store.get_messages("42").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enabled_delete_reports_store_failure() {
        let service = ConversationService::new(ServiceConfig {
            store: Some(Arc::new(DownStore)),
            enable_delete: true,
            ..ServiceConfig::default()
        });
        assert!(matches!(service.delete_conversation("1").await, Err(ServiceError::Store(_))));
    }
}
