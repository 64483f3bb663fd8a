//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{Address, GeoPoint, RatingStats};
use crate::store::{Collection, Document};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Seller,
    Buyer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub approval: ApprovalStatus,
    pub business_name: Option<String>,
    pub license_number: Option<String>,
    pub address: Option<Address>,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub rating: RatingStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            email: email.into().trim().to_lowercase(),
            phone: None,
            role,
            approval: ApprovalStatus::Pending,
            business_name: None,
            license_number: None,
            address: None,
            location: None,
            rating: RatingStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_approved(&self) -> bool { self.approval == ApprovalStatus::Approved }
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Approved sellers list products; admins may act on their behalf.
    pub fn can_sell(&self) -> bool {
        self.is_approved() && matches!(self.role, Role::Seller | Role::Admin)
    }

    /// Any approved account can buy. Sellers restock from other sellers.
    pub fn can_buy(&self) -> bool {
        self.is_approved() && matches!(self.role, Role::Buyer | Role::Seller)
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    const KIND: &'static str = "user";
    fn id(&self) -> &str { &self.id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_is_pending() {
        let user = User::new("Clinic", " Orders@Clinic.Example ", Role::Buyer);
        assert_eq!(user.approval, ApprovalStatus::Pending);
        assert_eq!(user.email, "orders@clinic.example");
        assert!(!user.can_buy());
    }

    #[test]
    fn test_capabilities_follow_role() {
        let mut seller = User::new("Supplier", "s@x.io", Role::Seller);
        seller.approval = ApprovalStatus::Approved;
        assert!(seller.can_sell() && seller.can_buy());

        let mut admin = User::new("Ops", "a@x.io", Role::Admin);
        admin.approval = ApprovalStatus::Approved;
        assert!(admin.can_sell() && !admin.can_buy());
    }
}
