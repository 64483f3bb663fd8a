//! Marketplace services.
//!
//! Each submodule adds one group of operations to [`Marketplace`]. Services
//! read documents, apply domain rules, and commit everything a request
//! changes as a single [`WriteBatch`]. Notifications raised by the request
//! are written in the same batch and published once it has committed.

pub mod cart;
pub mod catalog;
pub mod chat;
pub mod notifications;
pub mod orders;
pub mod ratings;
pub mod transactions;
pub mod users;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Notification, User};
use crate::domain::events::DomainEvent;
use crate::error::{MarketError, Result};
use crate::store::{Document, Repository, WriteBatch};

pub use notifications::Notifier;

#[derive(Clone)]
pub struct Marketplace {
    repo: Repository,
    notifier: Notifier,
    bootstrap_admin_email: Option<String>,
}

impl Marketplace {
    pub fn new(repo: Repository, notifier: Notifier, bootstrap_admin_email: Option<String>) -> Self {
        Self { repo, notifier, bootstrap_admin_email }
    }

    /// Memory-backed marketplace without NATS, as used by tests and local runs.
    pub fn in_memory(bootstrap_admin_email: Option<String>) -> Self {
        Self::new(Repository::in_memory(), Notifier::new(256, None), bootstrap_admin_email)
    }

    pub fn repository(&self) -> &Repository { &self.repo }
    pub fn notifier(&self) -> &Notifier { &self.notifier }

    /// Resolves the calling user from the identity supplied by the gateway.
    pub async fn authenticate(&self, user_id: Option<&str>) -> Result<User> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty()).ok_or(MarketError::Unauthenticated)?;
        self.repo.get::<User>(user_id).await?.ok_or(MarketError::Unauthenticated)
    }

    pub(crate) async fn require<D: Document>(&self, id: &str) -> Result<D> {
        self.repo.get::<D>(id).await?.ok_or(MarketError::NotFound(D::KIND))
    }

    /// Commits `batch` together with the notifications `events` fan out to,
    /// then publishes those notifications.
    pub(crate) async fn commit_with_events(&self, mut batch: WriteBatch, events: Vec<DomainEvent>) -> Result<Vec<Notification>> {
        let notifications: Vec<Notification> = events.iter().flat_map(DomainEvent::notifications).collect();
        for notification in &notifications {
            batch.set(notification)?;
        }
        if let Err(e) = self.repo.commit(batch).await {
            tracing::error!(error = %e, "write batch failed");
            return Err(e.into());
        }
        self.notifier.dispatch(&notifications).await;
        Ok(notifications)
    }
}

pub(crate) fn today() -> NaiveDate { Utc::now().date_naive() }

pub(crate) fn ensure_owner(actor: &User, owner_id: &str) -> Result<()> {
    if actor.id == owner_id || actor.is_admin() {
        Ok(())
    } else {
        Err(MarketError::forbidden("only the owner may change this resource"))
    }
}

pub(crate) fn ensure_admin(actor: &User) -> Result<()> {
    if actor.is_admin() && actor.is_approved() { Ok(()) } else { Err(MarketError::forbidden("admin only")) }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Page {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl Default for Page {
    fn default() -> Self { Self { page: Some(1), per_page: Some(20) } }
}

impl Page {
    pub fn number(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn size(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }

    pub fn apply<T>(&self, items: Vec<T>) -> Paginated<T> {
        let total = items.len();
        let skip = ((self.number() - 1) * self.size()) as usize;
        let data = items.into_iter().skip(skip).take(self.size() as usize).collect();
        Paginated { data, total, page: self.number() }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: usize,
    pub page: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let page = Page { page: Some(0), per_page: Some(500) };
        assert_eq!(page.number(), 1);
        assert_eq!(page.size(), 100);

        let second = Page { page: Some(2), per_page: Some(2) }.apply(vec![1, 2, 3, 4, 5]);
        assert_eq!(second.data, vec![3, 4]);
        assert_eq!(second.total, 5);
        assert_eq!(second.page, 2);
    }
}
