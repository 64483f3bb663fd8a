//! Batch allocation.
//!
//! A requested quantity is spread over a product's batches in priority order:
//! earliest expiry first for drugs, earliest arrival first for equipment. Each
//! batch is drained before the next one is touched.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::domain::aggregates::{Batch, ProductKind};
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub batch_id: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl Allocation {
    pub fn subtotal(&self) -> Money { self.unit_price.times(self.quantity) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    #[error("not enough quantity: requested {requested}, available {available}")]
    NotEnoughQuantity { requested: u32, available: u32 },
}

/// Orders batches by the priority rule of the product kind.
pub fn priority(kind: &ProductKind, a: &Batch, b: &Batch) -> Ordering {
    let by_kind = match kind {
        // Batches without an expiry sort last.
        ProductKind::Drug { .. } => match (a.expiry_date, b.expiry_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        ProductKind::Equipment { .. } => a.received_at.cmp(&b.received_at),
    };
    by_kind.then_with(|| a.id.cmp(&b.id))
}

/// Batches that may be sold today, in allocation order.
pub fn eligible<'a>(kind: &ProductKind, batches: &'a [Batch], today: NaiveDate) -> Vec<&'a Batch> {
    let mut eligible: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.quantity > 0 && !b.is_expired(today))
        .collect();
    eligible.sort_by(|a, b| priority(kind, a, b));
    eligible
}

/// Sellable units; saturates at `u32::MAX`.
pub fn available(kind: &ProductKind, batches: &[Batch], today: NaiveDate) -> u32 {
    eligible(kind, batches, today).iter().fold(0, |total: u32, b| total.saturating_add(b.quantity))
}

pub fn allocate(
    kind: &ProductKind,
    batches: &[Batch],
    requested: u32,
    today: NaiveDate,
) -> Result<Vec<Allocation>, AllocationError> {
    if requested == 0 {
        return Err(AllocationError::ZeroQuantity);
    }

    let mut remaining = requested;
    let mut allocations = Vec::new();
    for batch in eligible(kind, batches, today) {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(batch.quantity);
        allocations.push(Allocation {
            batch_id: batch.id.clone(),
            quantity: take,
            unit_price: batch.selling_price,
        });
        remaining -= take;
    }

    if remaining > 0 {
        return Err(AllocationError::NotEnoughQuantity {
            requested,
            available: requested - remaining,
        });
    }
    Ok(allocations)
}
