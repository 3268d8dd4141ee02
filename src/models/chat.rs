use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use std::fmt;

/// Who wrote a message. Stored and sent as `human` / `ai`; the client
/// vocabulary (`user` / `system`) is accepted on input and produced by
/// [`Author::ui_label`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    #[serde(rename = "human", alias = "user")]
    Human,
    #[serde(rename = "ai", alias = "assistant", alias = "system")]
    Assistant,
}

impl Author {
    pub fn as_str(&self) -> &'static str {
        match self {
            Author::Human => "human",
            Author::Assistant => "ai",
        }
    }

    pub fn ui_label(&self) -> &'static str {
        match self {
            Author::Human => "user",
            Author::Assistant => "system",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: Author,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, author: Author, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: default_conversation_name(&id),
            id,
            messages: Vec::new(),
        }
    }
}

pub fn default_conversation_name(id: &str) -> String {
    format!("Conversation {}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_uses_store_vocabulary_on_the_wire() {
        assert_eq!(serde_json::to_string(&Author::Human).unwrap(), "\"human\"");
        assert_eq!(serde_json::to_string(&Author::Assistant).unwrap(), "\"ai\"");
    }

    #[test]
    fn author_accepts_client_vocabulary() {
        let user: Author = serde_json::from_str("\"user\"").unwrap();
        let system: Author = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(user, Author::Human);
        assert_eq!(system, Author::Assistant);
        assert_eq!(Author::Assistant.ui_label(), "system");
    }

    #[test]
    fn new_conversation_gets_templated_name() {
        let conv = Conversation::new("42");
        assert_eq!(conv.name, "Conversation 42");
        assert!(conv.messages.is_empty());
    }
}
