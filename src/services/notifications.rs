use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use super::Marketplace;
use crate::domain::aggregates::{Notification, User};
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

/// In-process pub/sub for notifications, optionally mirrored to NATS.
///
/// Delivery is best effort: a subscriber that falls behind the buffer loses
/// the oldest messages, and nothing is replayed after a restart. The stored
/// notification documents remain the source of truth.
#[derive(Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
    nats: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(buffer: usize, nats: Option<async_nats::Client>) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self { sender, nats }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> { self.sender.subscribe() }

    pub async fn dispatch(&self, notifications: &[Notification]) {
        for notification in notifications {
            // An error only means nobody is listening right now.
            let _ = self.sender.send(notification.clone());

            if let Some(nats) = &self.nats {
                let subject = format!("marketplace.notifications.{}", notification.user_id);
                match serde_json::to_vec(notification) {
                    Ok(payload) => {
                        if let Err(e) = nats.publish(subject, payload.into()).await {
                            tracing::warn!(error = %e, notification_id = %notification.id, "failed to publish notification to NATS");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to encode notification"),
                }
            }
        }
    }
}

impl Marketplace {
    pub async fn list_notifications(&self, actor: &User, unread_only: bool) -> Result<Vec<Notification>> {
        let mut filter = Filter::new().eq("user_id", actor.id.as_str());
        if unread_only {
            filter = filter.eq("read", false);
        }
        let mut notifications = self.repo.find::<Notification>(&filter).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(notifications)
    }

    pub async fn mark_notification_read(&self, actor: &User, notification_id: &str) -> Result<Notification> {
        let mut notification = self.require::<Notification>(notification_id).await?;
        if notification.user_id != actor.id {
            return Err(MarketError::NotFound("notification"));
        }
        if !notification.read {
            notification.read = true;
            let mut batch = WriteBatch::new();
            batch.set(&notification)?;
            self.repo.commit(batch).await?;
        }
        Ok(notification)
    }

    pub async fn mark_all_notifications_read(&self, actor: &User) -> Result<usize> {
        let unread = self.list_notifications(actor, true).await?;
        let mut batch = WriteBatch::new();
        for mut notification in unread {
            notification.read = true;
            batch.set(&notification)?;
        }
        let updated = batch.len();
        self.repo.commit(batch).await?;
        Ok(updated)
    }

    /// Live notifications for one user, starting from the moment of subscription.
    pub fn notification_stream(&self, user_id: String) -> impl Stream<Item = Notification> + Send + 'static {
        let receiver = self.notifier.subscribe();
        stream::unfold((receiver, user_id), |(mut receiver, user_id)| async move {
            loop {
                match receiver.recv().await {
                    Ok(notification) if notification.user_id == user_id => {
                        return Some((notification, (receiver, user_id)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, user_id = %user_id, "notification subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NotificationKind;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_only_yields_own_notifications() {
        let market = Marketplace::in_memory(None);
        let stream = market.notification_stream("alice".to_string());
        futures::pin_mut!(stream);

        let for_bob = Notification::new("bob", NotificationKind::NewMessage, "hi", "hello bob");
        let for_alice = Notification::new("alice", NotificationKind::NewMessage, "hi", "hello alice");
        market.notifier().dispatch(&[for_bob, for_alice.clone()]).await;

        assert_eq!(stream.next().await, Some(for_alice));
    }

    #[tokio::test]
    async fn test_dispatch_without_subscribers_is_fine() {
        let notifier = Notifier::new(4, None);
        notifier.dispatch(&[Notification::new("u", NotificationKind::NewRating, "t", "b")]).await;
    }
}
