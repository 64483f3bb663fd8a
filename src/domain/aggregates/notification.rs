//! Notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AccountReviewed,
    OrderPlaced,
    OrderStatusChanged,
    PaymentReceived,
    NewRating,
    NewMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Id of the order, message, rating... the notification is about.
    pub reference_id: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: &str, kind: NotificationKind, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            kind,
            title: title.into(),
            body: body.into(),
            reference_id: None,
            read: false,
            created_at: Utc::now(),
        }
    }

    pub fn about(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }
}

impl Document for Notification {
    const COLLECTION: Collection = Collection::Notifications;
    const KIND: &'static str = "notification";
    fn id(&self) -> &str { &self.id }
}
