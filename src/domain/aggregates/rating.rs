//! Ratings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Score;
use crate::store::{Collection, Document};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RatingTarget {
    User(String),
    Product(String),
}

impl RatingTarget {
    pub fn target_id(&self) -> &str {
        match self {
            Self::User(id) | Self::Product(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// One rating per rater and target; rating again replaces it.
    pub id: String,
    pub rater_id: String,
    pub target: RatingTarget,
    pub score: Score,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rating {
    pub fn key(rater_id: &str, target: &RatingTarget) -> String {
        let kind = match target {
            RatingTarget::User(_) => "user",
            RatingTarget::Product(_) => "product",
        };
        format!("{rater_id}:{kind}:{}", target.target_id())
    }

    pub fn new(rater_id: &str, target: RatingTarget, score: Score, comment: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Self::key(rater_id, &target),
            rater_id: rater_id.to_string(),
            target,
            score,
            comment,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for Rating {
    const COLLECTION: Collection = Collection::Ratings;
    const KIND: &'static str = "rating";
    fn id(&self) -> &str { &self.id }
}
