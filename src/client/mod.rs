//! Client-side mirror of the conversation list and the protocols that keep
//! it in step with the service: initial load, optimistic send, local
//! conversation creation and delete.

pub mod http;

use chrono::Utc;
use log::{ info, warn };
use uuid::Uuid;

use crate::models::chat::{ Author, ChatMessage, Conversation };
use crate::service::NOT_IMPLEMENTED;
use self::http::{ ClientError, ConversationApi };

const NEW_CONVERSATION_ID_LEN: usize = 4;

/// A send that has been applied locally and is waiting for the reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSend {
    pub conversation_id: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct ChatClient {
    conversations: Vec<Conversation>,
    active_conversation_id: Option<String>,
    draft: String,
    in_flight: usize,
    last_message_millis: i64,
}

impl ChatClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn active_conversation_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active_conversation_id.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// True while a reply is outstanding; drives the "composing" indicator.
    pub fn is_sending(&self) -> bool {
        self.in_flight > 0
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn select_conversation(&mut self, conversation_id: &str) -> bool {
        if self.conversations.iter().any(|c| c.id == conversation_id) {
            self.active_conversation_id = Some(conversation_id.to_string());
            true
        } else {
            false
        }
    }

    /// Single attempt; a failure leaves the client with no conversations.
    pub async fn load(&mut self, api: &dyn ConversationApi) {
        match api.fetch_conversations().await {
            Ok(conversations) => {
                info!("Loaded {} conversations", conversations.len());
                self.active_conversation_id = conversations.first().map(|c| c.id.clone());
                self.conversations = conversations;
            }
            Err(e) => {
                warn!("Error fetching conversations: {}", e);
                self.conversations.clear();
                self.active_conversation_id = None;
            }
        }
    }

    /// Applies the optimistic half of a send: clears the draft and appends
    /// the human message to the active conversation.
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if self.draft.trim().is_empty() {
            return None;
        }
        let conversation_id = self.active_conversation()?.id.clone();

        let text = std::mem::take(&mut self.draft);
        let message = ChatMessage::new(self.next_message_id(), Author::Human, text.clone());
        self.push_message(&conversation_id, message);
        self.in_flight += 1;

        Some(PendingSend { conversation_id, text })
    }

    /// Applies the reply to the conversation the send started in, whichever
    /// conversation is active now.
    pub fn finish_send(&mut self, pending: PendingSend, result: Result<String, ClientError>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match result {
            Ok(answer) => {
                let message = ChatMessage::new(self.next_message_id(), Author::Assistant, answer);
                self.push_message(&pending.conversation_id, message);
            }
            Err(e) => {
                warn!("Error adding message to {}: {}", pending.conversation_id, e);
            }
        }
    }

    /// Returns false when nothing was sent (empty draft or no active conversation).
    pub async fn send_message(&mut self, api: &dyn ConversationApi) -> bool {
        let Some(pending) = self.begin_send() else {
            return false;
        };
        let result = api
            .send_message(&pending.conversation_id, &pending.text).await
            .map(|resp| resp.answer);
        self.finish_send(pending, result);
        true
    }

    /// Creates an empty conversation locally and makes it active. The
    /// service learns about it with the first message.
    pub fn new_conversation(&mut self) -> String {
        let id = loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(NEW_CONVERSATION_ID_LEN)
                .collect();
            if !self.conversations.iter().any(|c| c.id == candidate) {
                break candidate;
            }
        };
        self.conversations.push(Conversation::new(id.clone()));
        self.active_conversation_id = Some(id.clone());
        id
    }

    /// Removes the conversation locally only when the service reports that
    /// it actually deleted it.
    pub async fn delete_conversation(&mut self, api: &dyn ConversationApi, conversation_id: &str) -> bool {
        match api.delete_conversation(conversation_id).await {
            Ok(resp) if resp.message == NOT_IMPLEMENTED => {
                info!("Delete of {} is not implemented by the service, keeping it", conversation_id);
                false
            }
            Ok(_) => {
                self.conversations.retain(|c| c.id != conversation_id);
                if self.active_conversation_id.as_deref() == Some(conversation_id) {
                    self.active_conversation_id = self.conversations.first().map(|c| c.id.clone());
                }
                true
            }
            Err(e) => {
                warn!("Error deleting conversation {}: {}", conversation_id, e);
                false
            }
        }
    }

    fn push_message(&mut self, conversation_id: &str, message: ChatMessage) {
        if let Some(conv) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
            conv.messages.push(message);
        }
    }

    /// Millisecond timestamp, bumped when two ids would land in the same millisecond.
    fn next_message_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_message_millis = now.max(self.last_message_millis + 1);
        self.last_message_millis.to_string()
    }
}
