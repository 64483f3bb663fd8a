use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{Batch, Product};
use crate::services::catalog::{BatchUpdate, NewBatch, NewProduct, ProductFilter, ProductUpdate};
use crate::services::{Page, Paginated};

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub kind: Option<String>,
    pub owner_id: Option<String>,
    pub search: Option<String>,
}

pub(super) async fn list_products(State(s): State<AppState>, Query(p): Query<ListParams>) -> ApiResult<Paginated<Product>> {
    let page = Page { page: p.page, per_page: p.per_page };
    let filter = ProductFilter { category: p.category, kind: p.kind, owner_id: p.owner_id, search: p.search };
    Ok(Json(s.market.list_products(filter, page).await?))
}

pub(super) async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    Ok(Json(s.market.get_product(&id).await?))
}

pub(super) async fn create_product(
    State(s): State<AppState>,
    Actor(user): Actor,
    Json(r): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.create_product(&user, r).await?)))
}

pub(super) async fn update_product(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<ProductUpdate>,
) -> ApiResult<Product> {
    Ok(Json(s.market.update_product(&user, &id, r).await?))
}

pub(super) async fn deactivate_product(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    s.market.deactivate_product(&user, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_batches(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Vec<Batch>> {
    let product = s.market.get_product(&id).await?;
    crate::services::ensure_owner(&user, &product.owner_id)?;
    Ok(Json(s.market.list_batches(&id).await?))
}

pub(super) async fn add_batch(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<NewBatch>,
) -> Result<(StatusCode, Json<Batch>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.add_batch(&user, &id, r).await?)))
}

pub(super) async fn update_batch(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<BatchUpdate>,
) -> ApiResult<Batch> {
    Ok(Json(s.market.update_batch(&user, &id, r).await?))
}

pub(super) async fn remove_batch(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Product> {
    Ok(Json(s.market.remove_batch(&user, &id).await?))
}
