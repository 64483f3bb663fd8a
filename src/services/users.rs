use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ensure_admin, Marketplace};
use crate::domain::aggregates::{ApprovalStatus, Role, User};
use crate::domain::events::{AccountEvent, DomainEvent};
use crate::domain::value_objects::{Address, GeoPoint};
use crate::error::{MarketError, Result};
use crate::store::{Filter, WriteBatch};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 32))]
    pub phone: Option<String>,
    pub role: Role,
    #[validate(length(min = 1, max = 200))]
    pub business_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub license_number: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 6, max = 32))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub business_name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Review {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbySeller {
    pub seller: User,
    pub distance_km: f64,
}

impl Marketplace {
    pub async fn register_user(&self, input: RegisterUser) -> Result<User> {
        input.validate()?;
        let email = input.email.trim().to_lowercase();
        if !self.repo.find::<User>(&Filter::new().eq("email", email.as_str())).await?.is_empty() {
            return Err(MarketError::input("email is already registered"));
        }

        let bootstrap = self.bootstrap_admin_email.as_deref() == Some(email.as_str());
        let role = match input.role {
            _ if bootstrap => Role::Admin,
            Role::Admin => return Err(MarketError::forbidden("admin accounts cannot self-register")),
            Role::Seller if input.license_number.is_none() => {
                return Err(MarketError::input("sellers must provide a license number"));
            }
            role => role,
        };

        let mut user = User::new(input.name.trim(), email, role);
        user.phone = input.phone;
        user.business_name = input.business_name;
        user.license_number = input.license_number;
        user.address = input.address;
        if bootstrap {
            user.approval = ApprovalStatus::Approved;
        }

        let mut batch = WriteBatch::new();
        batch.set(&user)?;
        self.repo.commit(batch).await?;
        tracing::info!(user_id = %user.id, role = ?user.role, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User> {
        self.require::<User>(user_id).await
    }

    pub async fn update_profile(&self, actor: &User, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        let mut user = actor.clone();
        if let Some(name) = update.name { user.name = name.trim().to_string(); }
        if let Some(phone) = update.phone { user.phone = Some(phone); }
        if let Some(business_name) = update.business_name { user.business_name = Some(business_name); }
        if let Some(address) = update.address { user.address = Some(address); }
        user.touch();

        let mut batch = WriteBatch::new();
        batch.set(&user)?;
        self.repo.commit(batch).await?;
        Ok(user)
    }

    pub async fn set_location(&self, actor: &User, latitude: f64, longitude: f64) -> Result<User> {
        let mut user = actor.clone();
        user.location = Some(GeoPoint::new(latitude, longitude)?);
        user.touch();

        let mut batch = WriteBatch::new();
        batch.set(&user)?;
        self.repo.commit(batch).await?;
        Ok(user)
    }

    pub async fn list_pending_users(&self, actor: &User) -> Result<Vec<User>> {
        ensure_admin(actor)?;
        self.repo.find::<User>(&Filter::new().eq("approval", "pending")).await.map_err(Into::into)
    }

    pub async fn review_user(&self, actor: &User, user_id: &str, review: Review) -> Result<User> {
        ensure_admin(actor)?;
        let mut user = self.require::<User>(user_id).await?;
        if user.is_admin() {
            return Err(MarketError::forbidden("admin accounts cannot be reviewed"));
        }
        user.approval = match review {
            Review::Approve => ApprovalStatus::Approved,
            Review::Reject => ApprovalStatus::Rejected,
        };
        user.touch();

        let mut batch = WriteBatch::new();
        batch.set(&user)?;
        let event = DomainEvent::Account(AccountEvent::Reviewed { user_id: user.id.clone(), approval: user.approval });
        self.commit_with_events(batch, vec![event]).await?;
        tracing::info!(user_id = %user.id, reviewer = %actor.id, approval = ?user.approval, "user reviewed");
        Ok(user)
    }

    /// Approved sellers with a known location inside `radius_km`, nearest first.
    pub async fn nearby_sellers(&self, origin: GeoPoint, radius_km: f64) -> Result<Vec<NearbySeller>> {
        if !(radius_km > 0.0) {
            return Err(MarketError::input("radius must be positive"));
        }
        let sellers = self
            .repo
            .find::<User>(&Filter::new().eq("role", "seller").eq("approval", "approved"))
            .await?;
        let mut nearby: Vec<NearbySeller> = sellers
            .into_iter()
            .filter_map(|seller| {
                let distance_km = origin.distance_km(seller.location.as_ref()?);
                (distance_km <= radius_km).then_some(NearbySeller { seller, distance_km })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, role: Role) -> RegisterUser {
        RegisterUser {
            name: "Test".into(), email: email.into(), phone: None, role,
            business_name: None, license_number: Some("LIC-1".into()), address: None,
        }
    }

    #[tokio::test]
    async fn test_bootstrap_admin_and_duplicates() {
        let market = Marketplace::in_memory(Some("ops@market.example".into()));
        let admin = market.register_user(registration("OPS@market.example", Role::Buyer)).await.unwrap();
        assert!(admin.is_admin() && admin.is_approved());

        let err = market.register_user(registration("ops@market.example", Role::Buyer)).await.unwrap_err();
        assert!(matches!(err, MarketError::UserInput(_)));
        let err = market.register_user(registration("eve@x.io", Role::Admin)).await.unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));
        let err = market.register_user(registration("not-an-email", Role::Buyer)).await.unwrap_err();
        assert!(matches!(err, MarketError::UserInput(_)));
    }

    #[tokio::test]
    async fn test_review_requires_admin() {
        let market = Marketplace::in_memory(Some("ops@market.example".into()));
        let admin = market.register_user(registration("ops@market.example", Role::Buyer)).await.unwrap();
        let buyer = market.register_user(registration("clinic@x.io", Role::Buyer)).await.unwrap();

        assert!(matches!(market.review_user(&buyer, &buyer.id, Review::Approve).await, Err(MarketError::Forbidden(_))));
        assert_eq!(market.list_pending_users(&admin).await.unwrap().len(), 1);

        let approved = market.review_user(&admin, &buyer.id, Review::Approve).await.unwrap();
        assert!(approved.is_approved());
        assert!(market.list_pending_users(&admin).await.unwrap().is_empty());
        let notes = market.list_notifications(&approved, false).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].body, "Your account has been approved.");
    }

    #[tokio::test]
    async fn test_nearby_sellers_sorted_by_distance() {
        let market = Marketplace::in_memory(Some("ops@market.example".into()));
        let admin = market.register_user(registration("ops@market.example", Role::Buyer)).await.unwrap();
        let mut ids = vec![];
        for (email, lat, lng) in [("far@x.io", 31.2001, 29.9187), ("near@x.io", 30.05, 31.24), ("away@x.io", 25.6872, 32.6396)] {
            let seller = market.register_user(registration(email, Role::Seller)).await.unwrap();
            let seller = market.review_user(&admin, &seller.id, Review::Approve).await.unwrap();
            market.set_location(&seller, lat, lng).await.unwrap();
            ids.push(seller.id);
        }

        let cairo = GeoPoint::new(30.0444, 31.2357).unwrap();
        let nearby = market.nearby_sellers(cairo, 300.0).await.unwrap();
        let found: Vec<_> = nearby.iter().map(|n| n.seller.id.clone()).collect();
        assert_eq!(found, vec![ids[1].clone(), ids[0].clone()]);
        assert!(market.nearby_sellers(cairo, 0.0).await.is_err());
    }
}
