use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{Rating, RatingTarget};
use crate::services::ratings::RateInput;

pub(super) async fn rate(State(s): State<AppState>, Actor(user): Actor, Json(r): Json<RateInput>) -> Result<(StatusCode, Json<Rating>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.rate(&user, r).await?)))
}

pub(super) async fn list_user_ratings(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Rating>> {
    Ok(Json(s.market.list_ratings(&RatingTarget::User(id)).await?))
}

pub(super) async fn list_product_ratings(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Rating>> {
    Ok(Json(s.market.list_ratings(&RatingTarget::Product(id)).await?))
}
