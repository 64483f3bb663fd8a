//! Cart Aggregate
//!
//! A cart is persisted as three collections: the cart header, one item per
//! product, and one batch item per batch the product quantity is allocated
//! to. Totals are denormalised upwards: batch items → item → cart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::allocation::Allocation;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;
use crate::store::{Collection, Document, StoreError, WriteBatch};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    /// Same as the owning user's id.
    pub id: String,
    pub user_id: String,
    pub total_quantity: u32,
    pub total_price: Money,
    pub item_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub product_id: String,
    pub seller_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartBatchItem {
    pub id: String,
    pub cart_id: String,
    pub cart_item_id: String,
    pub product_id: String,
    pub batch_id: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl Document for Cart {
    const COLLECTION: Collection = Collection::Carts;
    const KIND: &'static str = "cart";
    fn id(&self) -> &str { &self.id }
}

impl Document for CartItem {
    const COLLECTION: Collection = Collection::CartItems;
    const KIND: &'static str = "cart item";
    fn id(&self) -> &str { &self.id }
}

impl Document for CartBatchItem {
    const COLLECTION: Collection = Collection::CartBatchItems;
    const KIND: &'static str = "cart batch item";
    fn id(&self) -> &str { &self.id }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: CartItem,
    pub batches: Vec<CartBatchItem>,
}

/// The cart header together with all of its items and batch items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub cart: Cart,
    pub lines: Vec<CartLine>,
}

impl CartView {
    pub fn empty(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            cart: Cart {
                id: user_id.to_string(), user_id: user_id.to_string(), total_quantity: 0,
                total_price: Money::ZERO, item_count: 0, created_at: now, updated_at: now,
            },
            lines: vec![],
        }
    }

    /// Assembles a view from documents loaded out of the three collections.
    pub fn assemble(cart: Cart, items: Vec<CartItem>, batch_items: Vec<CartBatchItem>) -> Self {
        let lines = items
            .into_iter()
            .map(|item| {
                let batches = batch_items.iter().filter(|b| b.cart_item_id == item.id).cloned().collect();
                CartLine { item, batches }
            })
            .collect();
        Self { cart, lines }
    }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    pub fn line_for_product(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item.product_id == product_id)
    }

    pub fn line(&self, item_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item.id == item_id)
    }

    /// Replaces the allocation of `product` in the cart, creating the line if needed.
    pub fn set_line(&mut self, product: &Product, allocations: &[Allocation]) -> Result<(), CartError> {
        let others = self.lines.iter().filter(|l| l.item.product_id != product.id).map(|l| l.item.quantity);
        allocations
            .iter()
            .map(|a| a.quantity)
            .chain(others)
            .try_fold(0u32, |total, q| total.checked_add(q))
            .ok_or(CartError::QuantityOverflow)?;

        let index = match self.lines.iter().position(|l| l.item.product_id == product.id) {
            Some(index) => index,
            None => {
                self.lines.push(CartLine {
                    item: CartItem {
                        id: Uuid::now_v7().to_string(), cart_id: self.cart.id.clone(),
                        product_id: product.id.clone(), seller_id: product.owner_id.clone(),
                        product_name: product.name.clone(), quantity: 0, total_price: Money::ZERO,
                        created_at: Utc::now(),
                    },
                    batches: vec![],
                });
                self.lines.len() - 1
            }
        };
        let cart_id = self.cart.id.clone();
        let line = &mut self.lines[index];
        let item_id = line.item.id.clone();
        line.item.product_name = product.name.clone();
        line.batches = allocations
            .iter()
            .map(|a| CartBatchItem {
                id: format!("{}_{}", item_id, a.batch_id),
                cart_id: cart_id.clone(),
                cart_item_id: item_id.clone(),
                product_id: product.id.clone(),
                batch_id: a.batch_id.clone(),
                quantity: a.quantity,
                unit_price: a.unit_price,
                subtotal: a.subtotal(),
            })
            .collect();
        self.recalculate();
        Ok(())
    }

    pub fn remove_line(&mut self, item_id: &str) -> Result<CartLine, CartError> {
        let index = self.lines.iter().position(|l| l.item.id == item_id).ok_or(CartError::ItemNotFound)?;
        let line = self.lines.remove(index);
        self.recalculate();
        Ok(line)
    }

    pub fn clear(&mut self) { self.lines.clear(); self.recalculate(); }

    /// Re-sums every level from the batch items up. Quantities saturate;
    /// `set_line` refuses any allocation that would reach the limit.
    pub fn recalculate(&mut self) {
        for line in &mut self.lines {
            line.item.quantity = line.batches.iter().fold(0, |total: u32, b| total.saturating_add(b.quantity));
            line.item.total_price = line.batches.iter().map(|b| b.subtotal).sum();
        }
        self.cart.total_quantity = self.lines.iter().fold(0, |total: u32, l| total.saturating_add(l.item.quantity));
        self.cart.total_price = self.lines.iter().map(|l| l.item.total_price).sum();
        self.cart.item_count = self.lines.len() as u32;
        self.cart.updated_at = Utc::now();
    }

    /// Sum of every batch item subtotal; always equal to `cart.total_price`.
    pub fn batch_subtotal(&self) -> Money {
        self.lines.iter().flat_map(|l| &l.batches).map(|b| b.subtotal).sum()
    }

    /// Queues the writes that turn `before` into `self`: changed documents are
    /// set, documents that disappeared are deleted.
    pub fn write_changes(&self, before: &CartView, batch: &mut WriteBatch) -> Result<(), StoreError> {
        if self.cart != before.cart {
            batch.set(&self.cart)?;
        }
        for line in &before.lines {
            match self.line(&line.item.id) {
                None => {
                    batch.delete::<CartItem>(&line.item.id);
                    for b in &line.batches {
                        batch.delete::<CartBatchItem>(&b.id);
                    }
                }
                Some(current) => {
                    for b in &line.batches {
                        if !current.batches.iter().any(|c| c.id == b.id) {
                            batch.delete::<CartBatchItem>(&b.id);
                        }
                    }
                }
            }
        }
        for line in &self.lines {
            let previous = before.line(&line.item.id);
            if previous.map(|p| &p.item) != Some(&line.item) {
                batch.set(&line.item)?;
            }
            for b in &line.batches {
                let unchanged = previous.is_some_and(|p| p.batches.iter().any(|old| old == b));
                if !unchanged {
                    batch.set(b)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("cart item not found")]
    ItemNotFound,
    #[error("cart quantity exceeds the supported limit")]
    QuantityOverflow,
}
