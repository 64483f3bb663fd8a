//! Payment transactions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::domain::value_objects::Money;
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    /// Cash is collected on delivery and confirmed by the seller afterwards.
    pub fn settles_immediately(self) -> bool { !matches!(self, Self::Cash) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub order_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn for_order(order: &Order, method: PaymentMethod, reference: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            order_id: order.id.clone(),
            buyer_id: order.buyer_id.clone(),
            seller_id: order.seller_id.clone(),
            amount: order.total_price,
            method,
            status: if method.settles_immediately() { TransactionStatus::Completed } else { TransactionStatus::Pending },
            reference,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete(&mut self) -> Result<(), TransactionError> { self.settle(TransactionStatus::Pending, TransactionStatus::Completed) }
    pub fn fail(&mut self) -> Result<(), TransactionError> { self.settle(TransactionStatus::Pending, TransactionStatus::Failed) }
    pub fn refund(&mut self) -> Result<(), TransactionError> { self.settle(TransactionStatus::Completed, TransactionStatus::Refunded) }

    fn settle(&mut self, expected: TransactionStatus, next: TransactionStatus) -> Result<(), TransactionError> {
        if self.status != expected {
            return Err(TransactionError::WrongStatus { current: self.status, expected });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Document for Transaction {
    const COLLECTION: Collection = Collection::Transactions;
    const KIND: &'static str = "transaction";
    fn id(&self) -> &str { &self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("transaction is {current:?}, expected {expected:?}")]
    WrongStatus { current: TransactionStatus, expected: TransactionStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_starts_pending() {
        let order = Order::place("b", "s", None);
        let mut tx = Transaction::for_order(&order, PaymentMethod::Cash, None);
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(tx.refund().is_err());
        tx.complete().unwrap();
        tx.refund().unwrap();
        assert_eq!(tx.status, TransactionStatus::Refunded);
    }

    #[test]
    fn test_card_settles_immediately() {
        let order = Order::place("b", "s", None);
        let mut tx = Transaction::for_order(&order, PaymentMethod::Card, Some("ch_123".into()));
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(
            tx.fail(),
            Err(TransactionError::WrongStatus { current: TransactionStatus::Completed, expected: TransactionStatus::Pending })
        );
    }
}
