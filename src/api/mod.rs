//! HTTP surface of the marketplace.
//!
//! Authentication is delegated to the gateway in front of this service, which
//! forwards the caller's user id in the `x-user-id` header.

mod cart;
mod catalog;
mod chat;
mod notifications;
mod orders;
mod payments;
mod ratings;
mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::domain::aggregates::User;
use crate::error::MarketError;
use crate::services::Marketplace;

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, error: ErrorBody { code, message: message.into() } }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        match &e {
            MarketError::Unauthenticated => Self::new(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string()),
            MarketError::Forbidden(_) => Self::new(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
            MarketError::UserInput(_) => Self::new(StatusCode::BAD_REQUEST, "bad_request", e.to_string()),
            MarketError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", e.to_string()),
            MarketError::NotEnoughQuantity { .. } => Self::new(StatusCode::CONFLICT, "not_enough_quantity", e.to_string()),
            MarketError::InvalidTransition { .. } => Self::new(StatusCode::CONFLICT, "invalid_transition", e.to_string()),
            MarketError::Store(inner) => {
                tracing::error!(error = %inner, "storage failure while handling request");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// The authenticated caller.
pub struct Actor(pub User);

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts.headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok());
        Ok(Actor(state.market.authenticate(user_id).await?))
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "service": "medisupply-market" }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/users", post(users::register))
        .route("/api/v1/users/:id", get(users::get_user))
        .route("/api/v1/users/:id/review", post(users::review))
        .route("/api/v1/users/:id/ratings", get(ratings::list_user_ratings))
        .route("/api/v1/admin/pending-users", get(users::list_pending))
        .route("/api/v1/me", get(users::me).patch(users::update_me))
        .route("/api/v1/me/location", post(users::set_location))
        .route("/api/v1/sellers/nearby", get(users::nearby_sellers))
        .route("/api/v1/products", get(catalog::list_products).post(catalog::create_product))
        .route(
            "/api/v1/products/:id",
            get(catalog::get_product).patch(catalog::update_product).delete(catalog::deactivate_product),
        )
        .route("/api/v1/products/:id/batches", get(catalog::list_batches).post(catalog::add_batch))
        .route("/api/v1/products/:id/ratings", get(ratings::list_product_ratings))
        .route("/api/v1/batches/:id", patch(catalog::update_batch).delete(catalog::remove_batch))
        .route("/api/v1/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/items", post(cart::add_item))
        .route("/api/v1/cart/items/:id", patch(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/checkout", post(orders::checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", post(orders::update_status))
        .route("/api/v1/orders/:id/payments", post(payments::pay_order))
        .route("/api/v1/transactions", get(payments::list_transactions))
        .route("/api/v1/transactions/:id", get(payments::get_transaction))
        .route("/api/v1/transactions/:id/confirm", post(payments::confirm))
        .route("/api/v1/transactions/:id/fail", post(payments::fail))
        .route("/api/v1/ratings", post(ratings::rate))
        .route("/api/v1/messages", post(chat::send_message))
        .route("/api/v1/conversations", get(chat::list_conversations))
        .route("/api/v1/conversations/:id/messages", get(chat::list_messages))
        .route("/api/v1/conversations/:id/read", post(chat::mark_read))
        .route("/api/v1/notifications", get(notifications::list))
        .route("/api/v1/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/v1/notifications/stream", get(notifications::stream))
        .route("/api/v1/notifications/:id/read", post(notifications::mark_read))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
