use serde::Deserialize;

use super::Marketplace;
use crate::domain::aggregates::{ChatMessage, Conversation, User};
use crate::domain::events::DomainEvent;
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessage {
    pub recipient_id: String,
    pub body: String,
}

impl Marketplace {
    pub async fn send_message(&self, actor: &User, input: SendMessage) -> Result<ChatMessage> {
        let body = input.body.trim();
        if body.is_empty() {
            return Err(MarketError::input("message body is empty"));
        }
        if body.chars().count() > MAX_MESSAGE_CHARS {
            return Err(MarketError::input(format!("message is longer than {MAX_MESSAGE_CHARS} characters")));
        }
        if input.recipient_id == actor.id {
            return Err(MarketError::input("you cannot message yourself"));
        }
        let recipient = self.require::<User>(&input.recipient_id).await?;

        let key = Conversation::key(&actor.id, &recipient.id);
        let mut conversation = match self.repo.get::<Conversation>(&key).await? {
            Some(existing) => existing,
            None => Conversation::between(&actor.id, &recipient.id),
        };
        let message = ChatMessage::new(&conversation.id, &actor.id, &recipient.id, body);
        conversation.record(&message);

        let mut batch = WriteBatch::new();
        batch.set(&message)?.set(&conversation)?;
        let event = DomainEvent::MessageSent {
            recipient_id: recipient.id.clone(),
            sender_name: actor.business_name.clone().unwrap_or_else(|| actor.name.clone()),
            conversation_id: conversation.id.clone(),
            preview: conversation.last_message.clone().unwrap_or_default(),
        };
        self.commit_with_events(batch, vec![event]).await?;
        tracing::debug!(conversation_id = %conversation.id, sender = %actor.id, "message sent");
        Ok(message)
    }

    /// The caller's conversations, most recent activity first.
    pub async fn list_conversations(&self, actor: &User) -> Result<Vec<Conversation>> {
        let filter = Filter::new().contains("participants", actor.id.as_str());
        let mut conversations = self.repo.find::<Conversation>(&filter).await?;
        conversations.sort_by(|a, b| {
            b.last_message_at.unwrap_or(b.created_at).cmp(&a.last_message_at.unwrap_or(a.created_at))
        });
        Ok(conversations)
    }

    pub async fn list_messages(&self, actor: &User, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        self.participant_conversation(actor, conversation_id).await?;
        let mut messages = self
            .repo
            .find::<ChatMessage>(&Filter::new().eq("conversation_id", conversation_id))
            .await?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(messages)
    }

    /// Clears the caller's unread counter and flags the messages sent to them as read.
    pub async fn mark_conversation_read(&self, actor: &User, conversation_id: &str) -> Result<Conversation> {
        let mut conversation = self.participant_conversation(actor, conversation_id).await?;
        let unread = Filter::new()
            .eq("conversation_id", conversation_id)
            .eq("recipient_id", actor.id.as_str())
            .eq("read", false);
        let messages = self.repo.find::<ChatMessage>(&unread).await?;

        conversation.mark_read(&actor.id);
        let mut batch = WriteBatch::new();
        batch.set(&conversation)?;
        for mut message in messages {
            message.read = true;
            batch.set(&message)?;
        }
        self.repo.commit(batch).await?;
        Ok(conversation)
    }

    async fn participant_conversation(&self, actor: &User, conversation_id: &str) -> Result<Conversation> {
        let conversation = self.require::<Conversation>(conversation_id).await?;
        if !conversation.includes(&actor.id) {
            // Outsiders cannot tell a foreign conversation from a missing one.
            return Err(MarketError::NotFound("conversation"));
        }
        Ok(conversation)
    }
}
