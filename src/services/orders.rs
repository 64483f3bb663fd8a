use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Deserialize;

use super::{today, Marketplace, Page, Paginated};
use crate::domain::aggregates::{
    Batch, Order, OrderBatchItem, OrderItem, OrderStatus, OrderView, Party, PaymentStatus, Product,
    Transaction, TransactionStatus, User,
};
use crate::domain::allocation::allocate;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::Address;
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Checkout {
    pub shipping_address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    /// Restrict to orders where the caller is this party; admins see all orders without it.
    pub view: Option<OrderSide>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buyer,
    Seller,
}

impl Marketplace {
    /// Turns the caller's cart into one order per seller.
    pub async fn checkout(&self, actor: &User, input: Checkout) -> Result<Vec<OrderView>> {
        if !actor.can_buy() {
            return Err(MarketError::forbidden("only approved buyers can place orders"));
        }
        let cart = self.load_cart(&actor.id).await?;
        if cart.is_empty() {
            return Err(MarketError::input("cart is empty"));
        }
        let shipping_address = input.shipping_address.or_else(|| actor.address.clone());

        let mut by_seller: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for line in &cart.lines {
            by_seller.entry(line.item.seller_id.as_str()).or_default().push(line.item.product_id.as_str());
        }

        let today = today();
        let mut touched_batches: HashMap<String, Batch> = HashMap::new();
        let mut touched_products: Vec<Product> = Vec::new();
        let mut views = Vec::new();

        for (seller_id, product_ids) in by_seller {
            let mut view = OrderView::new(Order::place(&actor.id, seller_id, shipping_address.clone()));
            for product_id in product_ids {
                let Some(line) = cart.line_for_product(product_id) else { continue };
                let mut product = self.require::<Product>(product_id).await?;
                if !product.active {
                    return Err(MarketError::input(format!("{} is no longer available", product.name)));
                }

                let mut batches = self.repo.find::<Batch>(&Filter::new().eq("product_id", product_id)).await?;
                let allocations = allocate(&product.kind, &batches, line.item.quantity, today).map_err(|e| {
                    tracing::warn!(user_id = %actor.id, product_id, error = %e, "checkout allocation failed");
                    MarketError::from(e)
                })?;

                let mut taken = Vec::with_capacity(allocations.len());
                for allocation in allocations {
                    let batch = batches
                        .iter_mut()
                        .find(|b| b.id == allocation.batch_id)
                        .ok_or(MarketError::NotFound("batch"))?;
                    let serials = batch.take(allocation.quantity)?;
                    touched_batches.insert(batch.id.clone(), batch.clone());
                    taken.push((allocation, serials));
                }
                product.recount(&batches)?;
                view.add_line(&product, taken);
                touched_products.push(product);
            }
            views.push(view);
        }

        let mut batch = WriteBatch::new();
        for b in touched_batches.values() {
            batch.set(b)?;
        }
        for product in &touched_products {
            batch.set(product)?;
        }
        let mut events = Vec::with_capacity(views.len());
        for view in &views {
            batch.set(&view.order)?;
            for line in &view.lines {
                batch.set(&line.item)?;
                for b in &line.batches {
                    batch.set(b)?;
                }
            }
            events.push(DomainEvent::Order(OrderEvent::Placed {
                order_id: view.order.id.clone(),
                order_number: view.order.order_number.clone(),
                seller_id: view.order.seller_id.clone(),
                total: view.order.total_price,
            }));
        }
        let mut emptied = cart.clone();
        emptied.clear();
        emptied.write_changes(&cart, &mut batch)?;

        self.commit_with_events(batch, events).await?;
        for view in &views {
            tracing::info!(order_id = %view.order.id, buyer_id = %actor.id, seller_id = %view.order.seller_id,
                total = %view.order.total_price, "order placed");
        }
        Ok(views)
    }

    pub(crate) async fn load_order(&self, order_id: &str) -> Result<OrderView> {
        let order = self.require::<Order>(order_id).await?;
        let by_order = Filter::new().eq("order_id", order_id);
        let items = self.repo.find::<OrderItem>(&by_order).await?;
        let batch_items = self.repo.find::<OrderBatchItem>(&by_order).await?;
        Ok(OrderView::assemble(order, items, batch_items))
    }

    pub async fn get_order(&self, actor: &User, order_id: &str) -> Result<OrderView> {
        let view = self.load_order(order_id).await?;
        if view.order.party_of(&actor.id).is_none() && !actor.is_admin() {
            return Err(MarketError::forbidden("not a party to this order"));
        }
        Ok(view)
    }

    pub async fn list_orders(&self, actor: &User, query: OrderQuery, page: Page) -> Result<Paginated<Order>> {
        let mut orders = match query.view {
            Some(OrderSide::Buyer) => self.repo.find::<Order>(&Filter::new().eq("buyer_id", actor.id.as_str())).await?,
            Some(OrderSide::Seller) => self.repo.find::<Order>(&Filter::new().eq("seller_id", actor.id.as_str())).await?,
            None if actor.is_admin() => self.repo.find::<Order>(&Filter::new()).await?,
            None => {
                let mut orders = self.repo.find::<Order>(&Filter::new().eq("buyer_id", actor.id.as_str())).await?;
                orders.extend(self.repo.find::<Order>(&Filter::new().eq("seller_id", actor.id.as_str())).await?);
                orders
            }
        };
        if let Some(status) = query.status {
            orders.retain(|o| o.status == status);
        }
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(page.apply(orders))
    }

    pub async fn update_order_status(&self, actor: &User, order_id: &str, next: OrderStatus, note: Option<String>) -> Result<Order> {
        let mut view = self.load_order(order_id).await?;
        let party = view.order.party_of(&actor.id);
        if party.is_none() && !actor.is_admin() {
            return Err(MarketError::forbidden("not a party to this order"));
        }
        let from = view.order.status;
        if !from.can_transition_to(next) {
            tracing::warn!(order_id, %from, to = %next, "rejected order transition");
            return Err(MarketError::InvalidTransition { from, to: next });
        }
        if !actor.is_admin() && party != next.performed_by() {
            let who = match next.performed_by() {
                Some(Party::Seller) => "seller",
                Some(Party::Buyer) => "buyer",
                None => "nobody",
            };
            return Err(MarketError::forbidden(format!("only the {who} may mark an order {next}")));
        }

        let mut batch = WriteBatch::new();
        if next.releases_stock() {
            self.release_stock(&view, &mut batch).await?;
            self.settle_payments_on_cancel(&mut view.order, &mut batch).await?;
        }
        view.order.transition(next, &actor.id, note)?;
        batch.set(&view.order)?;

        let events = [view.order.buyer_id.clone(), view.order.seller_id.clone()]
            .into_iter()
            .filter(|user_id| *user_id != actor.id)
            .map(|notify| DomainEvent::Order(OrderEvent::StatusChanged {
                order_id: view.order.id.clone(),
                order_number: view.order.order_number.clone(),
                notify,
                status: next,
            }))
            .collect();
        self.commit_with_events(batch, events).await?;
        tracing::info!(order_id, %from, to = %next, actor = %actor.id, "order status changed");
        Ok(view.order)
    }

    /// Hands allocated units and serials back to their batches.
    async fn release_stock(&self, view: &OrderView, batch: &mut WriteBatch) -> Result<()> {
        let mut batches: HashMap<String, Batch> = HashMap::new();
        for item in view.batch_items() {
            if !batches.contains_key(&item.batch_id) {
                match self.repo.get::<Batch>(&item.batch_id).await? {
                    Some(b) => { batches.insert(b.id.clone(), b); }
                    None => {
                        tracing::warn!(batch_id = %item.batch_id, order_id = %view.order.id, "batch removed before stock release; units dropped");
                        continue;
                    }
                }
            }
            if let Some(b) = batches.get_mut(&item.batch_id) {
                b.restore(item.quantity, item.serials.clone())?;
            }
        }

        let product_ids: HashSet<&str> = batches.values().map(|b| b.product_id.as_str()).collect();
        for product_id in product_ids {
            let Some(mut product) = self.repo.get::<Product>(product_id).await? else { continue };
            let mut siblings = self.repo.find::<Batch>(&Filter::new().eq("product_id", product_id)).await?;
            for sibling in &mut siblings {
                if let Some(updated) = batches.get(&sibling.id) {
                    *sibling = updated.clone();
                }
            }
            product.recount(&siblings)?;
            batch.set(&product)?;
        }
        for b in batches.values() {
            batch.set(b)?;
        }
        Ok(())
    }

    async fn settle_payments_on_cancel(&self, order: &mut Order, batch: &mut WriteBatch) -> Result<()> {
        if order.payment_status == PaymentStatus::Unpaid {
            return Ok(());
        }
        let transactions = self.repo.find::<Transaction>(&Filter::new().eq("order_id", order.id.as_str())).await?;
        for mut tx in transactions {
            match tx.status {
                TransactionStatus::Completed => { tx.refund()?; batch.set(&tx)?; }
                TransactionStatus::Pending => { tx.fail()?; batch.set(&tx)?; }
                TransactionStatus::Failed | TransactionStatus::Refunded => {}
            }
        }
        order.payment_status = match order.payment_status {
            PaymentStatus::Paid => PaymentStatus::Refunded,
            _ => PaymentStatus::Unpaid,
        };
        Ok(())
    }
}

