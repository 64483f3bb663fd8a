use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::Transaction;
use crate::services::transactions::PayOrder;

pub(super) async fn pay_order(
    State(s): State<AppState>,
    Actor(user): Actor,
    Path(id): Path<String>,
    Json(r): Json<PayOrder>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.pay_order(&user, &id, r).await?)))
}

pub(super) async fn list_transactions(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<Transaction>> {
    Ok(Json(s.market.list_transactions(&user).await?))
}

pub(super) async fn get_transaction(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Transaction> {
    Ok(Json(s.market.get_transaction(&user, &id).await?))
}

pub(super) async fn confirm(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Transaction> {
    Ok(Json(s.market.confirm_cash_payment(&user, &id).await?))
}

pub(super) async fn fail(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Transaction> {
    Ok(Json(s.market.fail_transaction(&user, &id).await?))
}
