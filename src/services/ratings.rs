use serde::Deserialize;
use validator::Validate;

use super::Marketplace;
use crate::domain::aggregates::{Order, OrderItem, OrderStatus, Product, Rating, RatingTarget, User};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{RatingStats, Score};
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RateInput {
    pub target: RatingTarget,
    pub score: u8,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

enum Rated {
    User(User),
    Product(Product),
}

impl Rated {
    fn stats(&mut self) -> &mut RatingStats {
        match self {
            Self::User(user) => &mut user.rating,
            Self::Product(product) => &mut product.rating,
        }
    }
}

impl Marketplace {
    /// Records or replaces the caller's rating of a user or product.
    pub async fn rate(&self, actor: &User, input: RateInput) -> Result<Rating> {
        input.validate()?;
        let score = Score::new(input.score)?;

        let delivered = self.delivered_orders_of(&actor.id).await?;
        let mut rated = match &input.target {
            RatingTarget::User(user_id) => {
                if *user_id == actor.id {
                    return Err(MarketError::input("you cannot rate yourself"));
                }
                let user = self.require::<User>(user_id).await?;
                if !delivered.iter().any(|o| o.counterparty(&actor.id) == user_id.as_str()) {
                    return Err(MarketError::forbidden("rate a user after an order with them is delivered"));
                }
                Rated::User(user)
            }
            RatingTarget::Product(product_id) => {
                let product = self.require::<Product>(product_id).await?;
                if product.owner_id == actor.id {
                    return Err(MarketError::input("you cannot rate your own product"));
                }
                let items = self.repo.find::<OrderItem>(&Filter::new().eq("product_id", product_id.as_str())).await?;
                let received = items
                    .iter()
                    .any(|item| delivered.iter().any(|o| o.id == item.order_id && o.buyer_id == actor.id));
                if !received {
                    return Err(MarketError::forbidden("rate a product after receiving it"));
                }
                Rated::Product(product)
            }
        };

        let key = Rating::key(&actor.id, &input.target);
        let rating = match self.repo.get::<Rating>(&key).await? {
            Some(mut previous) => {
                rated.stats().replace(previous.score, score);
                previous.score = score;
                previous.comment = input.comment;
                previous.updated_at = chrono::Utc::now();
                previous
            }
            None => {
                rated.stats().record(score);
                Rating::new(&actor.id, input.target, score, input.comment)
            }
        };

        let mut batch = WriteBatch::new();
        batch.set(&rating)?;
        let notify = match &mut rated {
            Rated::User(user) => {
                user.touch();
                batch.set(&*user)?;
                user.id.clone()
            }
            Rated::Product(product) => {
                product.touch();
                batch.set(&*product)?;
                product.owner_id.clone()
            }
        };
        let event = DomainEvent::Rated { user_id: notify, rating_id: rating.id.clone(), score: score.value() };
        self.commit_with_events(batch, vec![event]).await?;
        tracing::info!(rating_id = %rating.id, rater = %actor.id, score = score.value(), "rating saved");
        Ok(rating)
    }

    pub async fn list_ratings(&self, target: &RatingTarget) -> Result<Vec<Rating>> {
        let kind = match target {
            RatingTarget::User(_) => "user",
            RatingTarget::Product(_) => "product",
        };
        let filter = Filter::new().eq("target.type", kind).eq("target.id", target.target_id());
        let mut ratings = self.repo.find::<Rating>(&filter).await?;
        ratings.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(ratings)
    }

    /// Delivered orders where the user was buyer or seller.
    async fn delivered_orders_of(&self, user_id: &str) -> Result<Vec<Order>> {
        let delivered = Filter::new().eq("status", OrderStatus::Delivered.as_str());
        let mut orders = self.repo.find::<Order>(&delivered.clone().eq("buyer_id", user_id)).await?;
        orders.extend(self.repo.find::<Order>(&delivered.eq("seller_id", user_id)).await?);
        Ok(orders)
    }
}
