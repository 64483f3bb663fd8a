use serde::Deserialize;

use super::Marketplace;
use crate::domain::aggregates::{Order, PaymentMethod, PaymentStatus, Transaction, TransactionStatus, User};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

#[derive(Debug, Clone, Deserialize)]
pub struct PayOrder {
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

fn paid_event(order: &Order, tx: &Transaction) -> DomainEvent {
    DomainEvent::Order(OrderEvent::Paid {
        order_id: order.id.clone(),
        order_number: order.order_number.clone(),
        seller_id: order.seller_id.clone(),
        amount: tx.amount,
        method: tx.method,
    })
}

impl Marketplace {
    pub async fn pay_order(&self, actor: &User, order_id: &str, input: PayOrder) -> Result<Transaction> {
        let mut order = self.require::<Order>(order_id).await?;
        if order.buyer_id != actor.id {
            return Err(MarketError::forbidden("only the buyer can pay for an order"));
        }
        if !order.status.accepts_payment() {
            return Err(MarketError::input(format!("an order that is {} cannot be paid", order.status)));
        }
        if order.payment_status != PaymentStatus::Unpaid {
            return Err(MarketError::input("order already has a payment"));
        }

        let tx = Transaction::for_order(&order, input.method, input.reference);
        let mut events = vec![];
        order.payment_status = match tx.status {
            TransactionStatus::Completed => {
                events.push(paid_event(&order, &tx));
                PaymentStatus::Paid
            }
            _ => PaymentStatus::Pending,
        };
        order.touch();

        let mut batch = WriteBatch::new();
        batch.set(&tx)?.set(&order)?;
        self.commit_with_events(batch, events).await?;
        tracing::info!(transaction_id = %tx.id, order_id, amount = %tx.amount, method = ?tx.method, status = ?tx.status, "payment recorded");
        Ok(tx)
    }

    /// The seller acknowledges cash collected on delivery.
    pub async fn confirm_cash_payment(&self, actor: &User, transaction_id: &str) -> Result<Transaction> {
        let mut tx = self.require::<Transaction>(transaction_id).await?;
        if tx.seller_id != actor.id && !actor.is_admin() {
            return Err(MarketError::forbidden("only the seller can confirm a payment"));
        }
        let mut order = self.require::<Order>(&tx.order_id).await?;
        tx.complete()?;
        order.payment_status = PaymentStatus::Paid;
        order.touch();

        let mut batch = WriteBatch::new();
        batch.set(&tx)?.set(&order)?;
        self.commit_with_events(batch, vec![paid_event(&order, &tx)]).await?;
        tracing::info!(transaction_id, order_id = %order.id, "cash payment confirmed");
        Ok(tx)
    }

    pub async fn fail_transaction(&self, actor: &User, transaction_id: &str) -> Result<Transaction> {
        let mut tx = self.require::<Transaction>(transaction_id).await?;
        if tx.seller_id != actor.id && tx.buyer_id != actor.id && !actor.is_admin() {
            return Err(MarketError::forbidden("not a party to this transaction"));
        }
        let mut order = self.require::<Order>(&tx.order_id).await?;
        tx.fail()?;
        order.payment_status = PaymentStatus::Unpaid;
        order.touch();

        let mut batch = WriteBatch::new();
        batch.set(&tx)?.set(&order)?;
        self.repo.commit(batch).await?;
        tracing::warn!(transaction_id, order_id = %order.id, by = %actor.id, "transaction failed");
        Ok(tx)
    }

    pub async fn get_transaction(&self, actor: &User, transaction_id: &str) -> Result<Transaction> {
        let tx = self.require::<Transaction>(transaction_id).await?;
        if tx.seller_id != actor.id && tx.buyer_id != actor.id && !actor.is_admin() {
            return Err(MarketError::forbidden("not a party to this transaction"));
        }
        Ok(tx)
    }

    /// Transactions where the caller paid or got paid, newest first. Admins see all.
    pub async fn list_transactions(&self, actor: &User) -> Result<Vec<Transaction>> {
        let mut transactions = if actor.is_admin() {
            self.repo.find::<Transaction>(&Filter::new()).await?
        } else {
            let mut both = self.repo.find::<Transaction>(&Filter::new().eq("buyer_id", actor.id.as_str())).await?;
            both.extend(self.repo.find::<Transaction>(&Filter::new().eq("seller_id", actor.id.as_str())).await?);
            both
        };
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(transactions)
    }
}
