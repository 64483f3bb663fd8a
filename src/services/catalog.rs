use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use super::{ensure_owner, today, Marketplace, Page, Paginated};
use crate::domain::aggregates::{Batch, Product, ProductKind, User};
use crate::domain::value_objects::Money;
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: String,
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    pub kind: ProductKind,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    pub images: Option<Vec<String>>,
}

/// Highest unit price a batch may carry.
pub const MAX_UNIT_PRICE: i64 = 10_000_000;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewBatch {
    #[validate(range(min = 1, max = 1_000_000))]
    pub quantity: u32,
    pub cost_price: Money,
    pub selling_price: Money,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub serials: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BatchUpdate {
    #[validate(range(max = 1_000_000))]
    pub quantity: Option<u32>,
    pub cost_price: Option<Money>,
    pub selling_price: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub kind: Option<String>,
    pub owner_id: Option<String>,
    pub search: Option<String>,
}

fn unit_price(price: Money) -> Result<Money> {
    let price = Money::new(price.amount())?;
    if price.amount() > Decimal::from(MAX_UNIT_PRICE) {
        return Err(MarketError::input(format!("unit price may not exceed {MAX_UNIT_PRICE}")));
    }
    Ok(price)
}

impl Marketplace {
    pub async fn create_product(&self, actor: &User, input: NewProduct) -> Result<Product> {
        if !actor.can_sell() {
            return Err(MarketError::forbidden("only approved sellers can list products"));
        }
        input.validate()?;

        let mut product = Product::create(&actor.id, input.name.trim(), input.category.trim().to_lowercase(), input.kind);
        product.description = input.description;
        product.images = input.images;

        let mut batch = WriteBatch::new();
        batch.set(&product)?;
        self.repo.commit(batch).await?;
        tracing::info!(product_id = %product.id, owner_id = %actor.id, kind = product.kind.label(), "product created");
        Ok(product)
    }

    pub async fn get_product(&self, product_id: &str) -> Result<Product> {
        self.require::<Product>(product_id).await
    }

    pub async fn update_product(&self, actor: &User, product_id: &str, update: ProductUpdate) -> Result<Product> {
        update.validate()?;
        let mut product = self.require::<Product>(product_id).await?;
        ensure_owner(actor, &product.owner_id)?;

        if let Some(name) = update.name { product.name = name.trim().to_string(); }
        if let Some(description) = update.description { product.description = description; }
        if let Some(category) = update.category { product.category = category.trim().to_lowercase(); }
        if let Some(images) = update.images { product.images = images; }
        product.touch();

        let mut batch = WriteBatch::new();
        batch.set(&product)?;
        self.repo.commit(batch).await?;
        Ok(product)
    }

    /// Soft delete: the product disappears from listings and carts can no longer add it.
    pub async fn deactivate_product(&self, actor: &User, product_id: &str) -> Result<Product> {
        let mut product = self.require::<Product>(product_id).await?;
        ensure_owner(actor, &product.owner_id)?;
        product.deactivate();

        let mut batch = WriteBatch::new();
        batch.set(&product)?;
        self.repo.commit(batch).await?;
        tracing::info!(product_id = %product.id, "product deactivated");
        Ok(product)
    }

    pub async fn list_products(&self, filter: ProductFilter, page: Page) -> Result<Paginated<Product>> {
        let mut query = Filter::new().eq("active", true);
        if let Some(category) = &filter.category { query = query.eq("category", category.to_lowercase()); }
        if let Some(kind) = &filter.kind { query = query.eq("kind.type", kind.as_str()); }
        if let Some(owner_id) = &filter.owner_id { query = query.eq("owner_id", owner_id.as_str()); }

        let mut products = self.repo.find::<Product>(&query).await?;
        if let Some(search) = filter.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty()) {
            products.retain(|p| p.name.to_lowercase().contains(&search));
        }
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.apply(products))
    }

    pub async fn list_batches(&self, product_id: &str) -> Result<Vec<Batch>> {
        Ok(self.repo.find::<Batch>(&Filter::new().eq("product_id", product_id)).await?)
    }

    pub async fn add_batch(&self, actor: &User, product_id: &str, input: NewBatch) -> Result<Batch> {
        input.validate()?;
        let mut product = self.require::<Product>(product_id).await?;
        ensure_owner(actor, &product.owner_id)?;

        let mut batch_doc = Batch::new(&product, input.quantity, unit_price(input.cost_price)?, unit_price(input.selling_price)?);
        batch_doc.expiry_date = input.expiry_date;
        batch_doc.serials = input.serials.into_iter().map(|s| s.trim().to_string()).collect();
        batch_doc.serial_tracked = !batch_doc.serials.is_empty();
        batch_doc.validate_for(&product.kind, today())?;

        let mut batches = self.list_batches(product_id).await?;
        batches.push(batch_doc.clone());
        product.recount(&batches)?;

        let mut batch = WriteBatch::new();
        batch.set(&batch_doc)?.set(&product)?;
        self.repo.commit(batch).await?;
        tracing::info!(product_id = %product.id, batch_id = %batch_doc.id, quantity = batch_doc.quantity, "batch added");
        Ok(batch_doc)
    }

    pub async fn update_batch(&self, actor: &User, batch_id: &str, update: BatchUpdate) -> Result<Batch> {
        update.validate()?;
        let mut batch_doc = self.require::<Batch>(batch_id).await?;
        ensure_owner(actor, &batch_doc.owner_id)?;
        let mut product = self.require::<Product>(&batch_doc.product_id).await?;

        if let Some(quantity) = update.quantity {
            if batch_doc.is_serial_tracked() && quantity != batch_doc.quantity {
                return Err(MarketError::input("serial-tracked batches change quantity only through orders"));
            }
            batch_doc.quantity = quantity;
        }
        if let Some(cost_price) = update.cost_price { batch_doc.cost_price = unit_price(cost_price)?; }
        if let Some(selling_price) = update.selling_price {
            let selling_price = unit_price(selling_price)?;
            if selling_price.is_zero() {
                return Err(MarketError::input("selling price must be greater than zero"));
            }
            batch_doc.selling_price = selling_price;
        }
        batch_doc.updated_at = chrono::Utc::now();

        let mut batches = self.list_batches(&product.id).await?;
        if let Some(existing) = batches.iter_mut().find(|b| b.id == batch_doc.id) {
            *existing = batch_doc.clone();
        }
        product.recount(&batches)?;

        let mut batch = WriteBatch::new();
        batch.set(&batch_doc)?.set(&product)?;
        self.repo.commit(batch).await?;
        Ok(batch_doc)
    }

    pub async fn remove_batch(&self, actor: &User, batch_id: &str) -> Result<Product> {
        let batch_doc = self.require::<Batch>(batch_id).await?;
        ensure_owner(actor, &batch_doc.owner_id)?;
        let mut product = self.require::<Product>(&batch_doc.product_id).await?;

        let mut batches = self.list_batches(&product.id).await?;
        batches.retain(|b| b.id != batch_doc.id);
        product.recount(&batches)?;

        let mut batch = WriteBatch::new();
        batch.delete::<Batch>(&batch_doc.id);
        batch.set(&product)?;
        self.repo.commit(batch).await?;
        tracing::info!(product_id = %product.id, batch_id = %batch_doc.id, "batch removed");
        Ok(product)
    }
}
