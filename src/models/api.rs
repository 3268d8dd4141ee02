use serde::{ Serialize, Deserialize };
use super::chat::{ ChatMessage, Conversation };

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConversationsResponse {
    pub conversations: Vec<Conversation>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PostMessageResponse {
    pub message: String,
    pub answer: String,
}

/// Body for acknowledgements and errors: `{ "message": ... }`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub message: String,
}
