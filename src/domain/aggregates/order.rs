//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::allocation::Allocation;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Address, Money};
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingConfirmation,
    Confirmed,
    RejectedBySeller,
    Cancelled,
    Shipped,
    Delivered,
}

/// Which side of an order performs a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Buyer,
    Seller,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::PendingConfirmation, Self::Confirmed, Self::RejectedBySeller,
        Self::Cancelled, Self::Shipped, Self::Delivered,
    ];

    /// The transition table.
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            PendingConfirmation => &[Confirmed, RejectedBySeller, Cancelled],
            Confirmed => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | RejectedBySeller | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool { self.allowed_next().contains(&next) }
    pub fn is_terminal(self) -> bool { self.allowed_next().is_empty() }

    /// Side allowed to move an order into this status.
    pub fn performed_by(self) -> Option<Party> {
        match self {
            Self::Confirmed | Self::RejectedBySeller | Self::Shipped => Some(Party::Seller),
            Self::Cancelled | Self::Delivered => Some(Party::Buyer),
            Self::PendingConfirmation => None,
        }
    }

    /// Entering this status hands the allocated stock back to the batches.
    pub fn releases_stock(self) -> bool { matches!(self, Self::Cancelled | Self::RejectedBySeller) }

    /// Statuses in which the buyer may pay.
    pub fn accepts_payment(self) -> bool { matches!(self, Self::Confirmed | Self::Shipped | Self::Delivered) }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingConfirmation => "pending_confirmation",
            Self::Confirmed => "confirmed",
            Self::RejectedBySeller => "rejected_by_seller",
            Self::Cancelled => "cancelled",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Pending,
    Paid,
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
    pub changed_by: String,
    pub note: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_quantity: u32,
    pub total_price: Money,
    pub shipping_address: Option<Address>,
    pub history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_kind: String,
    pub quantity: u32,
    pub total_price: Money,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderBatchItem {
    pub id: String,
    pub order_id: String,
    pub order_item_id: String,
    pub product_id: String,
    pub batch_id: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    #[serde(default)]
    pub serials: Vec<String>,
}

impl Document for Order {
    const COLLECTION: Collection = Collection::Orders;
    const KIND: &'static str = "order";
    fn id(&self) -> &str { &self.id }
}

impl Document for OrderItem {
    const COLLECTION: Collection = Collection::OrderItems;
    const KIND: &'static str = "order item";
    fn id(&self) -> &str { &self.id }
}

impl Document for OrderBatchItem {
    const COLLECTION: Collection = Collection::OrderBatchItems;
    const KIND: &'static str = "order batch item";
    fn id(&self) -> &str { &self.id }
}

impl Order {
    pub fn place(buyer_id: impl Into<String>, seller_id: impl Into<String>, shipping_address: Option<Address>) -> Self {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let buyer_id = buyer_id.into();
        let simple = id.simple().to_string();
        Self {
            id: id.to_string(),
            order_number: format!("ORD-{}", simple[simple.len() - 10..].to_uppercase()),
            seller_id: seller_id.into(),
            status: OrderStatus::PendingConfirmation,
            payment_status: PaymentStatus::Unpaid,
            total_quantity: 0, total_price: Money::ZERO, shipping_address,
            history: vec![StatusChange { status: OrderStatus::PendingConfirmation, changed_by: buyer_id.clone(), note: None, at: now }],
            buyer_id, created_at: now, updated_at: now,
        }
    }

    pub fn party_of(&self, user_id: &str) -> Option<Party> {
        if user_id == self.buyer_id { Some(Party::Buyer) }
        else if user_id == self.seller_id { Some(Party::Seller) }
        else { None }
    }

    pub fn counterparty(&self, user_id: &str) -> &str {
        if user_id == self.buyer_id { &self.seller_id } else { &self.buyer_id }
    }

    pub fn transition(&mut self, next: OrderStatus, changed_by: &str, note: Option<String>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        self.history.push(StatusChange { status: next, changed_by: changed_by.to_string(), note, at: Utc::now() });
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: OrderItem,
    pub batches: Vec<OrderBatchItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderView {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderView {
    pub fn new(order: Order) -> Self { Self { order, lines: vec![] } }

    pub fn assemble(order: Order, items: Vec<OrderItem>, batch_items: Vec<OrderBatchItem>) -> Self {
        let lines = items
            .into_iter()
            .map(|item| {
                let batches = batch_items.iter().filter(|b| b.order_item_id == item.id).cloned().collect();
                OrderLine { item, batches }
            })
            .collect();
        Self { order, lines }
    }

    /// Snapshots a product and the batches it was taken from.
    pub fn add_line(&mut self, product: &Product, taken: Vec<(Allocation, Vec<String>)>) {
        let item_id = Uuid::now_v7().to_string();
        let batches: Vec<OrderBatchItem> = taken
            .into_iter()
            .map(|(a, serials)| OrderBatchItem {
                id: format!("{}_{}", item_id, a.batch_id),
                order_id: self.order.id.clone(),
                order_item_id: item_id.clone(),
                product_id: product.id.clone(),
                subtotal: a.subtotal(),
                batch_id: a.batch_id,
                quantity: a.quantity,
                unit_price: a.unit_price,
                serials,
            })
            .collect();
        self.lines.push(OrderLine {
            item: OrderItem {
                id: item_id,
                order_id: self.order.id.clone(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                product_kind: product.kind.label().to_string(),
                quantity: batches.iter().map(|b| b.quantity).sum(),
                total_price: batches.iter().map(|b| b.subtotal).sum(),
            },
            batches,
        });
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.order.total_quantity = self.lines.iter().map(|l| l.item.quantity).sum();
        self.order.total_price = self.lines.iter().map(|l| l.item.total_price).sum();
    }

    pub fn batch_items(&self) -> impl Iterator<Item = &OrderBatchItem> {
        self.lines.iter().flat_map(|l| &l.batches)
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.lines.iter().any(|l| l.item.product_id == product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductKind;
    use rust_decimal::Decimal;

    fn money(units: i64) -> Money { Money::new(Decimal::new(units, 0)).unwrap() }

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        assert!(PendingConfirmation.can_transition_to(Confirmed));
        assert!(PendingConfirmation.can_transition_to(RejectedBySeller));
        assert!(PendingConfirmation.can_transition_to(Cancelled));
        assert!(!PendingConfirmation.can_transition_to(Shipped));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(!Confirmed.can_transition_to(RejectedBySeller));
        assert!(!Shipped.can_transition_to(Cancelled));
        for terminal in [Delivered, RejectedBySeller, Cancelled] {
            assert!(terminal.is_terminal());
            assert!(OrderStatus::ALL.iter().all(|s| !terminal.can_transition_to(*s)));
        }
        // nothing leads back to pending
        assert!(OrderStatus::ALL.iter().all(|s| !s.can_transition_to(PendingConfirmation)));
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::place("buyer", "seller", None);
        assert!(order.order_number.starts_with("ORD-"));
        order.transition(OrderStatus::Confirmed, "seller", None).unwrap();
        order.transition(OrderStatus::Shipped, "seller", Some("courier 42".into())).unwrap();
        assert_eq!(
            order.transition(OrderStatus::Cancelled, "buyer", None),
            Err(OrderError::InvalidTransition { from: OrderStatus::Shipped, to: OrderStatus::Cancelled })
        );
        order.transition(OrderStatus::Delivered, "buyer", None).unwrap();
        assert_eq!(order.history.len(), 4);
        assert_eq!(order.status, OrderStatus::Delivered);
    }

    #[test]
    fn test_parties() {
        let order = Order::place("buyer", "seller", None);
        assert_eq!(order.party_of("buyer"), Some(Party::Buyer));
        assert_eq!(order.party_of("seller"), Some(Party::Seller));
        assert_eq!(order.party_of("someone"), None);
        assert_eq!(order.counterparty("buyer"), "seller");
        assert_eq!(OrderStatus::Shipped.performed_by(), Some(Party::Seller));
        assert_eq!(OrderStatus::Delivered.performed_by(), Some(Party::Buyer));
    }

    #[test]
    fn test_lines_snapshot_totals() {
        let product = Product::create("seller", "Syringe 5ml", "consumables", ProductKind::Equipment { manufacturer: None, model: None });
        let mut view = OrderView::new(Order::place("buyer", "seller", None));
        view.add_line(&product, vec![
            (Allocation { batch_id: "b1".into(), quantity: 2, unit_price: money(3) }, vec!["S1".into(), "S2".into()]),
            (Allocation { batch_id: "b2".into(), quantity: 1, unit_price: money(4) }, vec![]),
        ]);
        assert_eq!(view.order.total_quantity, 3);
        assert_eq!(view.order.total_price, money(10));
        assert_eq!(view.lines[0].item.product_kind, "equipment");
        assert!(view.contains_product(&product.id));
        assert_eq!(view.batch_items().count(), 2);
    }
}
