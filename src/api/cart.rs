use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use super::{Actor, ApiResult, AppState};
use crate::domain::aggregates::CartView;

#[derive(Debug, Deserialize)]
pub(super) struct AddItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateItemRequest {
    pub quantity: u32,
}

pub(super) async fn get_cart(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<CartView> {
    Ok(Json(s.market.get_cart(&user).await?))
}

pub(super) async fn add_item(State(s): State<AppState>, Actor(user): Actor, Json(r): Json<AddItemRequest>) -> ApiResult<CartView> {
    Ok(Json(s.market.add_to_cart(&user, &r.product_id, r.quantity).await?))
}

pub(super) async fn update_item(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<UpdateItemRequest>,
) -> ApiResult<CartView> {
    Ok(Json(s.market.update_cart_item(&user, &id, r.quantity).await?))
}

pub(super) async fn remove_item(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<CartView> {
    Ok(Json(s.market.remove_cart_item(&user, &id).await?))
}

pub(super) async fn clear_cart(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<CartView> {
    Ok(Json(s.market.clear_cart(&user).await?))
}
