use thiserror::Error;

use crate::domain::aggregates::{BatchError, CartError, OrderError, OrderStatus, TransactionError};
use crate::domain::allocation::AllocationError;
use crate::domain::value_objects::{GeoError, MoneyError, ScoreError};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum MarketError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    UserInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not enough quantity: requested {requested}, available {available}")]
    NotEnoughQuantity { requested: u32, available: u32 },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl MarketError {
    pub fn forbidden(reason: impl Into<String>) -> Self { Self::Forbidden(reason.into()) }
    pub fn input(message: impl Into<String>) -> Self { Self::UserInput(message.into()) }
}

impl From<AllocationError> for MarketError {
    fn from(e: AllocationError) -> Self {
        match e {
            AllocationError::NotEnoughQuantity { requested, available } => Self::NotEnoughQuantity { requested, available },
            AllocationError::ZeroQuantity => Self::input(e.to_string()),
        }
    }
}

impl From<OrderError> for MarketError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
        }
    }
}

impl From<BatchError> for MarketError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::Insufficient { available, requested } => Self::NotEnoughQuantity { requested, available },
            other => Self::input(other.to_string()),
        }
    }
}

impl From<CartError> for MarketError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::NotFound("cart item"),
            CartError::QuantityOverflow => Self::input(e.to_string()),
        }
    }
}

impl From<TransactionError> for MarketError {
    fn from(e: TransactionError) -> Self { Self::input(e.to_string()) }
}

impl From<validator::ValidationErrors> for MarketError {
    fn from(e: validator::ValidationErrors) -> Self { Self::input(e.to_string()) }
}

impl From<MoneyError> for MarketError {
    fn from(e: MoneyError) -> Self { Self::input(e.to_string()) }
}

impl From<GeoError> for MarketError {
    fn from(e: GeoError) -> Self { Self::input(e.to_string()) }
}

impl From<ScoreError> for MarketError {
    fn from(e: ScoreError) -> Self { Self::input(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, MarketError>;
