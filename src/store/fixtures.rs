use chrono::{ DateTime, TimeZone, Utc };
use once_cell::sync::Lazy;
use crate::models::chat::{ Author, ChatMessage, Conversation };

static FIXTURE_EPOCH: Lazy<DateTime<Utc>> = Lazy::new(|| {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap_or_default()
});

static CONVERSATIONS: Lazy<Vec<Conversation>> = Lazy::new(|| {
    let at = |offset: i64| *FIXTURE_EPOCH + chrono::Duration::seconds(offset);
    vec![
        Conversation {
            id: "1".into(),
            name: "Conversation 1".into(),
            messages: vec![
                ChatMessage {
                    id: "1".into(),
                    author: Author::Assistant,
                    content: "Hello from Conversation 1!".into(),
                    timestamp: at(0),
                },
                ChatMessage {
                    id: "2".into(),
                    author: Author::Human,
                    content: "Hi there, how are you?".into(),
                    timestamp: at(30),
                }
            ],
        },
        Conversation {
            id: "2".into(),
            name: "Conversation 2".into(),
            messages: vec![ChatMessage {
                id: "3".into(),
                author: Author::Assistant,
                content: "Hello from Conversation 2!".into(),
                timestamp: at(60),
            }],
        }
    ]
});

/// The fixed data set served whenever no store can be reached.
pub fn conversations() -> Vec<Conversation> {
    CONVERSATIONS.clone()
}

pub fn messages_for(conversation_id: &str) -> Vec<ChatMessage> {
    CONVERSATIONS.iter()
        .filter(|c| c.id == conversation_id)
        .flat_map(|c| c.messages.iter().cloned())
        .collect()
}
