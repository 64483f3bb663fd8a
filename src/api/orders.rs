use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{Order, OrderStatus, OrderView};
use crate::services::orders::{Checkout, OrderQuery, OrderSide};
use crate::services::{Page, Paginated};

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub view: Option<OrderSide>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusRequest {
    pub status: OrderStatus,
    pub note: Option<String>,
}

pub(super) async fn checkout(
    State(s): State<AppState>,
    Actor(user): Actor,
    body: Option<Json<Checkout>>,
) -> Result<(StatusCode, Json<Vec<OrderView>>), ApiError> {
    let input = body.map(|Json(c)| c).unwrap_or_default();
    Ok((StatusCode::CREATED, Json(s.market.checkout(&user, input).await?)))
}

pub(super) async fn list_orders(State(s): State<AppState>, Actor(user): Actor, Query(p): Query<ListParams>) -> ApiResult<Paginated<Order>> {
    let query = OrderQuery { view: p.view, status: p.status };
    Ok(Json(s.market.list_orders(&user, query, Page { page: p.page, per_page: p.per_page }).await?))
}

pub(super) async fn get_order(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<OrderView> {
    Ok(Json(s.market.get_order(&user, &id).await?))
}

pub(super) async fn update_status(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<StatusRequest>,
) -> ApiResult<Order> {
    Ok(Json(s.market.update_order_status(&user, &id, r.status, r.note).await?))
}
