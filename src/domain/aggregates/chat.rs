//! Chat between marketplace users

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::store::{Collection, Document};

const PREVIEW_CHARS: usize = 80;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Always two user ids, sorted.
    pub participants: Vec<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread: BTreeMap<String, u32>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// The id is derived from the participants so both sides find the same thread.
    pub fn key(a: &str, b: &str) -> String {
        if a <= b { format!("{a}:{b}") } else { format!("{b}:{a}") }
    }

    pub fn between(a: &str, b: &str) -> Self {
        let mut participants = vec![a.to_string(), b.to_string()];
        participants.sort();
        Self {
            id: Self::key(a, b),
            participants,
            last_message: None,
            last_message_at: None,
            unread: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn includes(&self, user_id: &str) -> bool { self.participants.iter().any(|p| p == user_id) }

    pub fn record(&mut self, message: &ChatMessage) {
        self.last_message = Some(message.body.chars().take(PREVIEW_CHARS).collect());
        self.last_message_at = Some(message.created_at);
        *self.unread.entry(message.recipient_id.clone()).or_default() += 1;
    }

    pub fn unread_for(&self, user_id: &str) -> u32 { self.unread.get(user_id).copied().unwrap_or(0) }

    pub fn mark_read(&mut self, user_id: &str) { self.unread.remove(user_id); }
}

impl Document for Conversation {
    const COLLECTION: Collection = Collection::Conversations;
    const KIND: &'static str = "conversation";
    fn id(&self) -> &str { &self.id }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(conversation_id: &str, sender_id: &str, recipient_id: &str, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            body: body.into(),
            read: false,
            created_at: Utc::now(),
        }
    }
}

impl Document for ChatMessage {
    const COLLECTION: Collection = Collection::Messages;
    const KIND: &'static str = "message";
    fn id(&self) -> &str { &self.id }
}
