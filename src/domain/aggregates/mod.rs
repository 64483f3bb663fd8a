//! Aggregates module
pub mod user;
pub mod product;
pub mod cart;
pub mod order;
pub mod transaction;
pub mod rating;
pub mod chat;
pub mod notification;

pub use user::{ApprovalStatus, Role, User};
pub use product::{Batch, BatchError, Product, ProductKind};
pub use cart::{Cart, CartBatchItem, CartError, CartItem, CartLine, CartView};
pub use order::{Order, OrderBatchItem, OrderError, OrderItem, OrderLine, OrderStatus, OrderView, Party, PaymentStatus, StatusChange};
pub use transaction::{PaymentMethod, Transaction, TransactionError, TransactionStatus};
pub use rating::{Rating, RatingTarget};
pub use chat::{ChatMessage, Conversation};
pub use notification::{Notification, NotificationKind};
