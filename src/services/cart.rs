use super::{today, Marketplace};
use crate::domain::aggregates::{Batch, Cart, CartBatchItem, CartItem, CartView, Product, User};
use crate::domain::allocation::allocate;
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

fn ensure_buyer(actor: &User) -> Result<()> {
    if actor.can_buy() { Ok(()) } else { Err(MarketError::forbidden("only approved buyers can use a cart")) }
}

impl Marketplace {
    pub(crate) async fn load_cart(&self, user_id: &str) -> Result<CartView> {
        let Some(cart) = self.repo.get::<Cart>(user_id).await? else {
            return Ok(CartView::empty(user_id));
        };
        let by_cart = Filter::new().eq("cart_id", user_id);
        let items = self.repo.find::<CartItem>(&by_cart).await?;
        let batch_items = self.repo.find::<CartBatchItem>(&by_cart).await?;
        Ok(CartView::assemble(cart, items, batch_items))
    }

    pub async fn get_cart(&self, actor: &User) -> Result<CartView> {
        ensure_buyer(actor)?;
        self.load_cart(&actor.id).await
    }

    /// Adds `quantity` units of a product, merging with an existing line.
    pub async fn add_to_cart(&self, actor: &User, product_id: &str, quantity: u32) -> Result<CartView> {
        ensure_buyer(actor)?;
        if quantity == 0 {
            return Err(MarketError::input("quantity must be greater than zero"));
        }
        let cart = self.load_cart(&actor.id).await?;
        let current = cart.line_for_product(product_id).map_or(0, |l| l.item.quantity);
        let total = current
            .checked_add(quantity)
            .ok_or_else(|| MarketError::input("quantity is too large"))?;
        self.reallocate_line(actor, cart, product_id, total).await
    }

    /// Sets the quantity of a cart line; zero removes it.
    pub async fn update_cart_item(&self, actor: &User, item_id: &str, quantity: u32) -> Result<CartView> {
        ensure_buyer(actor)?;
        if quantity == 0 {
            return self.remove_cart_item(actor, item_id).await;
        }
        let cart = self.load_cart(&actor.id).await?;
        let product_id = cart.line(item_id).ok_or(MarketError::NotFound("cart item"))?.item.product_id.clone();
        self.reallocate_line(actor, cart, &product_id, quantity).await
    }

    pub async fn remove_cart_item(&self, actor: &User, item_id: &str) -> Result<CartView> {
        ensure_buyer(actor)?;
        let before = self.load_cart(&actor.id).await?;
        let mut after = before.clone();
        after.remove_line(item_id)?;
        self.save_cart(&before, &after).await?;
        Ok(after)
    }

    pub async fn clear_cart(&self, actor: &User) -> Result<CartView> {
        ensure_buyer(actor)?;
        let before = self.load_cart(&actor.id).await?;
        let mut after = before.clone();
        after.clear();
        self.save_cart(&before, &after).await?;
        Ok(after)
    }

    async fn reallocate_line(&self, actor: &User, before: CartView, product_id: &str, quantity: u32) -> Result<CartView> {
        let product = self.require::<Product>(product_id).await?;
        if !product.active {
            return Err(MarketError::input(format!("{} is no longer available", product.name)));
        }
        if product.owner_id == actor.id {
            return Err(MarketError::forbidden("you cannot buy your own product"));
        }

        let batches = self.repo.find::<Batch>(&Filter::new().eq("product_id", product_id)).await?;
        let allocations = allocate(&product.kind, &batches, quantity, today()).map_err(|e| {
            tracing::warn!(product_id, quantity, error = %e, "cart allocation failed");
            MarketError::from(e)
        })?;

        let mut after = before.clone();
        after.set_line(&product, &allocations)?;
        self.save_cart(&before, &after).await?;
        tracing::info!(user_id = %actor.id, product_id, quantity, total = %after.cart.total_price, "cart updated");
        Ok(after)
    }

    async fn save_cart(&self, before: &CartView, after: &CartView) -> Result<()> {
        let mut batch = WriteBatch::new();
        after.write_changes(before, &mut batch)?;
        self.repo.commit(batch).await?;
        Ok(())
    }
}
