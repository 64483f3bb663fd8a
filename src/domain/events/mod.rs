//! Domain events and the notifications they fan out to.

use crate::domain::aggregates::{ApprovalStatus, Notification, NotificationKind, OrderStatus, PaymentMethod};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Account(AccountEvent),
    Order(OrderEvent),
    Rated { user_id: String, rating_id: String, score: u8 },
    MessageSent { recipient_id: String, sender_name: String, conversation_id: String, preview: String },
}

#[derive(Clone, Debug, PartialEq)]
pub enum AccountEvent {
    Reviewed { user_id: String, approval: ApprovalStatus },
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Placed { order_id: String, order_number: String, seller_id: String, total: Money },
    StatusChanged { order_id: String, order_number: String, notify: String, status: OrderStatus },
    Paid { order_id: String, order_number: String, seller_id: String, amount: Money, method: PaymentMethod },
}

impl DomainEvent {
    /// The per-user notification records this event produces.
    pub fn notifications(&self) -> Vec<Notification> {
        let notification = match self {
            Self::Account(AccountEvent::Reviewed { user_id, approval }) => {
                let verdict = match approval {
                    ApprovalStatus::Approved => "approved",
                    ApprovalStatus::Rejected => "rejected",
                    ApprovalStatus::Pending => return vec![],
                };
                Notification::new(user_id, NotificationKind::AccountReviewed, "Account reviewed",
                    format!("Your account has been {verdict}."))
                    .about(user_id.clone())
            }
            Self::Order(OrderEvent::Placed { order_id, order_number, seller_id, total }) => {
                Notification::new(seller_id, NotificationKind::OrderPlaced, "New order",
                    format!("Order {order_number} was placed for {total}."))
                    .about(order_id.clone())
            }
            Self::Order(OrderEvent::StatusChanged { order_id, order_number, notify, status }) => {
                Notification::new(notify, NotificationKind::OrderStatusChanged, "Order updated",
                    format!("Order {order_number} is now {status}."))
                    .about(order_id.clone())
            }
            Self::Order(OrderEvent::Paid { order_id, order_number, seller_id, amount, method }) => {
                Notification::new(seller_id, NotificationKind::PaymentReceived, "Payment received",
                    format!("Payment of {amount} by {method:?} received for order {order_number}."))
                    .about(order_id.clone())
            }
            Self::Rated { user_id, rating_id, score } => {
                Notification::new(user_id, NotificationKind::NewRating, "New rating",
                    format!("You received a {score}-star rating."))
                    .about(rating_id.clone())
            }
            Self::MessageSent { recipient_id, sender_name, conversation_id, preview } => {
                Notification::new(recipient_id, NotificationKind::NewMessage,
                    format!("Message from {sender_name}"), preview.clone())
                    .about(conversation_id.clone())
            }
        };
        vec![notification]
    }
}
