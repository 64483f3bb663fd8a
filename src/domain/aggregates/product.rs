//! Product Aggregate

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::value_objects::{Money, RatingStats};
use crate::store::{Collection, Document};

/// Drugs and equipment differ in how their batches are tracked: drugs carry
/// an expiry date, equipment carries serial numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductKind {
    Drug {
        active_ingredient: String,
        dosage_form: Option<String>,
        strength: Option<String>,
    },
    Equipment {
        manufacturer: Option<String>,
        model: Option<String>,
    },
}

impl ProductKind {
    pub fn is_drug(&self) -> bool { matches!(self, Self::Drug { .. }) }
    pub fn label(&self) -> &'static str {
        match self {
            Self::Drug { .. } => "drug",
            Self::Equipment { .. } => "equipment",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub kind: ProductKind,
    pub images: Vec<String>,
    /// Sum of the quantities of this product's batches.
    pub total_quantity: u32,
    #[serde(default)]
    pub rating: RatingStats,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(owner_id: impl Into<String>, name: impl Into<String>, category: impl Into<String>, kind: ProductKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(), owner_id: owner_id.into(), name: name.into(),
            description: String::new(), category: category.into(), kind, images: vec![],
            total_quantity: 0, rating: RatingStats::default(), active: true,
            created_at: now, updated_at: now,
        }
    }

    pub fn is_in_stock(&self) -> bool { self.total_quantity > 0 }

    /// Re-sums the product's stock from its batches.
    pub fn recount(&mut self, batches: &[Batch]) -> Result<(), BatchError> {
        self.total_quantity = batches
            .iter()
            .filter(|b| b.product_id == self.id)
            .try_fold(0u32, |total, b| total.checked_add(b.quantity))
            .ok_or(BatchError::QuantityOverflow)?;
        self.touch();
        Ok(())
    }

    pub fn deactivate(&mut self) { self.active = false; self.touch(); }
    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl Document for Product {
    const COLLECTION: Collection = Collection::Products;
    const KIND: &'static str = "product";
    fn id(&self) -> &str { &self.id }
}

/// One inventory lot of a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub product_id: String,
    pub owner_id: String,
    pub quantity: u32,
    pub cost_price: Money,
    pub selling_price: Money,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub serials: Vec<String>,
    /// Set once at creation; units of a tracked batch always travel with a serial.
    #[serde(default)]
    pub serial_tracked: bool,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(product: &Product, quantity: u32, cost_price: Money, selling_price: Money) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(), product_id: product.id.clone(), owner_id: product.owner_id.clone(),
            quantity, cost_price, selling_price, expiry_date: None, serials: vec![], serial_tracked: false,
            received_at: now, updated_at: now,
        }
    }

    pub fn is_serial_tracked(&self) -> bool { self.serial_tracked || !self.serials.is_empty() }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < today)
    }

    /// Checks the batch against the tracking rules of its product kind.
    pub fn validate_for(&self, kind: &ProductKind, today: NaiveDate) -> Result<(), BatchError> {
        if self.selling_price.is_zero() { return Err(BatchError::ZeroPrice); }
        match kind {
            ProductKind::Drug { .. } => {
                let expiry = self.expiry_date.ok_or(BatchError::MissingExpiry)?;
                if expiry <= today { return Err(BatchError::AlreadyExpired(expiry)); }
                if !self.serials.is_empty() { return Err(BatchError::SerialsOnDrug); }
            }
            ProductKind::Equipment { .. } => {
                if self.expiry_date.is_some() { return Err(BatchError::ExpiryOnEquipment); }
                if !self.serials.is_empty() {
                    if self.serials.len() != self.quantity as usize {
                        return Err(BatchError::SerialCountMismatch { quantity: self.quantity, serials: self.serials.len() });
                    }
                    let unique: HashSet<&str> = self.serials.iter().map(String::as_str).collect();
                    if unique.len() != self.serials.len() { return Err(BatchError::DuplicateSerial); }
                }
            }
        }
        Ok(())
    }

    /// Takes `quantity` units out of the batch, returning the serials that go with them.
    pub fn take(&mut self, quantity: u32) -> Result<Vec<String>, BatchError> {
        if quantity > self.quantity {
            return Err(BatchError::Insufficient { available: self.quantity, requested: quantity });
        }
        let tracked = self.is_serial_tracked();
        if tracked && self.serials.len() != self.quantity as usize {
            return Err(BatchError::SerialsOutOfSync { quantity: self.quantity, serials: self.serials.len() });
        }
        self.quantity -= quantity;
        let serials = if tracked { self.serials.drain(..quantity as usize).collect() } else { vec![] };
        self.updated_at = Utc::now();
        Ok(serials)
    }

    /// Puts units back, e.g. when an order is cancelled.
    pub fn restore(&mut self, quantity: u32, serials: Vec<String>) -> Result<(), BatchError> {
        self.quantity = self.quantity.checked_add(quantity).ok_or(BatchError::QuantityOverflow)?;
        self.serials.extend(serials);
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl Document for Batch {
    const COLLECTION: Collection = Collection::Batches;
    const KIND: &'static str = "batch";
    fn id(&self) -> &str { &self.id }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("selling price must be greater than zero")]
    ZeroPrice,
    #[error("drug batches require an expiry date")]
    MissingExpiry,
    #[error("batch expiry date {0} is not in the future")]
    AlreadyExpired(NaiveDate),
    #[error("drug batches do not carry serial numbers")]
    SerialsOnDrug,
    #[error("equipment batches do not carry an expiry date")]
    ExpiryOnEquipment,
    #[error("batch quantity {quantity} does not match {serials} serial numbers")]
    SerialCountMismatch { quantity: u32, serials: usize },
    #[error("serial numbers must be unique")]
    DuplicateSerial,
    #[error("batch holds {available} units, {requested} requested")]
    Insufficient { available: u32, requested: u32 },
    #[error("batch holds {quantity} units but {serials} serial numbers")]
    SerialsOutOfSync { quantity: u32, serials: usize },
    #[error("quantity exceeds the supported stock level")]
    QuantityOverflow,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn price(units: i64) -> Money { Money::new(Decimal::new(units, 0)).unwrap() }

    fn drug() -> Product {
        Product::create("S1", "Amoxicillin 500mg", "antibiotics", ProductKind::Drug {
            active_ingredient: "amoxicillin".into(), dosage_form: Some("capsule".into()), strength: Some("500mg".into()),
        })
    }

    fn monitor() -> Product {
        Product::create("S1", "Patient monitor", "monitoring", ProductKind::Equipment { manufacturer: None, model: None })
    }

    fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2025, 1, 10).unwrap() }

    #[test]
    fn test_drug_batch_requires_future_expiry() {
        let product = drug();
        let mut batch = Batch::new(&product, 10, price(2), price(3));
        assert_eq!(batch.validate_for(&product.kind, today()), Err(BatchError::MissingExpiry));
        batch.expiry_date = Some(today());
        assert_eq!(batch.validate_for(&product.kind, today()), Err(BatchError::AlreadyExpired(today())));
        batch.expiry_date = today().succ_opt();
        assert_eq!(batch.validate_for(&product.kind, today()), Ok(()));
    }

    #[test]
    fn test_equipment_serials_must_match_quantity() {
        let product = monitor();
        let mut batch = Batch::new(&product, 2, price(100), price(150));
        batch.serials = vec!["SN1".into()];
        assert!(matches!(batch.validate_for(&product.kind, today()), Err(BatchError::SerialCountMismatch { .. })));
        batch.serials = vec!["SN1".into(), "SN1".into()];
        assert_eq!(batch.validate_for(&product.kind, today()), Err(BatchError::DuplicateSerial));
        batch.serials = vec!["SN1".into(), "SN2".into()];
        assert_eq!(batch.validate_for(&product.kind, today()), Ok(()));
    }

    #[test]
    fn test_take_and_restore_serials() {
        let product = monitor();
        let mut batch = Batch::new(&product, 3, price(100), price(150));
        batch.serials = vec!["A".into(), "B".into(), "C".into()];
        let taken = batch.take(2).unwrap();
        assert_eq!(taken, ["A", "B"]);
        assert_eq!(batch.quantity, 1);
        assert!(batch.take(2).is_err());
        batch.restore(2, taken).unwrap();
        assert_eq!(batch.quantity, 3);
        assert_eq!(batch.serials.len(), 3);
    }

    #[test]
    fn test_recount_sums_own_batches() {
        let mut product = drug();
        let other = drug();
        let batches = vec![
            Batch::new(&product, 4, price(1), price(2)),
            Batch::new(&product, 6, price(1), price(2)),
            Batch::new(&other, 100, price(1), price(2)),
        ];
        product.recount(&batches).unwrap();
        assert_eq!(product.total_quantity, 10);
        assert!(product.is_in_stock());
    }

    #[test]
    fn test_recount_rejects_overflowing_total() {
        let mut product = drug();
        let batches = vec![
            Batch::new(&product, 3_000_000_000, price(1), price(2)),
            Batch::new(&product, 3_000_000_000, price(1), price(2)),
        ];
        assert_eq!(product.recount(&batches), Err(BatchError::QuantityOverflow));
        assert_eq!(product.total_quantity, 0);

        let mut batch = Batch::new(&product, u32::MAX, price(1), price(2));
        assert_eq!(batch.restore(1, vec![]), Err(BatchError::QuantityOverflow));
        assert_eq!(batch.quantity, u32::MAX);
    }

    #[test]
    fn test_tracked_batch_refuses_take_when_serials_fall_behind() {
        let product = monitor();
        let mut batch = Batch::new(&product, 2, price(100), price(150));
        batch.serials = vec!["A".into(), "B".into()];
        batch.serial_tracked = true;

        let taken = batch.take(2).unwrap();
        assert!(batch.serials.is_empty());
        // Quantity bumped while every serial was out on an order.
        batch.quantity = 5;
        batch.restore(2, taken).unwrap();

        assert_eq!(batch.take(3), Err(BatchError::SerialsOutOfSync { quantity: 7, serials: 2 }));
        assert_eq!(batch.quantity, 7);
        assert_eq!(batch.serials, ["A", "B"]);
    }
}
