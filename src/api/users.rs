use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::User;
use crate::domain::value_objects::GeoPoint;
use crate::error::MarketError;
use crate::services::users::{NearbySeller, ProfileUpdate, RegisterUser, Review};

#[derive(Debug, Deserialize)]
pub(super) struct ReviewRequest {
    pub decision: Review,
}

#[derive(Debug, Deserialize)]
pub(super) struct LocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub(super) struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: Option<f64>,
}

pub(super) async fn register(State(s): State<AppState>, Json(r): Json<RegisterUser>) -> Result<(StatusCode, Json<User>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.register_user(r).await?)))
}

pub(super) async fn get_user(State(s): State<AppState>, _actor: Actor, Path(id): Path<String>) -> ApiResult<User> {
    Ok(Json(s.market.get_user(&id).await?))
}

pub(super) async fn me(Actor(user): Actor) -> Json<User> {
    Json(user)
}

pub(super) async fn update_me(State(s): State<AppState>, Actor(user): Actor, Json(r): Json<ProfileUpdate>) -> ApiResult<User> {
    Ok(Json(s.market.update_profile(&user, r).await?))
}

pub(super) async fn set_location(State(s): State<AppState>, Actor(user): Actor, Json(r): Json<LocationRequest>) -> ApiResult<User> {
    Ok(Json(s.market.set_location(&user, r.latitude, r.longitude).await?))
}

pub(super) async fn list_pending(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<User>> {
    Ok(Json(s.market.list_pending_users(&user).await?))
}

pub(super) async fn review(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<ReviewRequest>,
) -> ApiResult<User> {
    Ok(Json(s.market.review_user(&user, &id, r.decision).await?))
}

pub(super) async fn nearby_sellers(State(s): State<AppState>, _actor: Actor, Query(q): Query<NearbyQuery>) -> ApiResult<Vec<NearbySeller>> {
    let origin = GeoPoint::new(q.lat, q.lng).map_err(MarketError::from)?;
    Ok(Json(s.market.nearby_sellers(origin, q.radius_km.unwrap_or(25.0)).await?))
}
