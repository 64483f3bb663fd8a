use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use medisupply_market::api::{build_app, AppState, USER_ID_HEADER};
use medisupply_market::Marketplace;

const ADMIN_EMAIL: &str = "ops@medisupply.example";

fn app() -> Router {
    build_app(AppState { market: Marketplace::in_memory(Some(ADMIN_EMAIL.to_string())) })
}

async fn call(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header(USER_ID_HEADER, user);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => request.body(Body::empty()).expect("request"),
    };
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json parse") };
    (status, json)
}

async fn register(app: &Router, email: &str, role: &str) -> String {
    let (status, user) = call(app, Method::POST, "/api/v1/users", None, Some(json!({
        "name": email, "email": email, "role": role, "license_number": "LIC-42",
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    user["id"].as_str().expect("user id").to_string()
}

/// Admin, approved seller and approved buyer ids.
async fn parties(app: &Router) -> (String, String, String) {
    let admin = register(app, ADMIN_EMAIL, "buyer").await;
    let seller = register(app, "pharma@sellers.example", "seller").await;
    let buyer = register(app, "clinic@buyers.example", "buyer").await;
    for id in [&seller, &buyer] {
        let uri = format!("/api/v1/users/{id}/review");
        let (status, _) = call(app, Method::POST, &uri, Some(&admin), Some(json!({ "decision": "approve" }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    (admin, seller, buyer)
}

async fn stocked_drug(app: &Router, seller: &str, quantity: u32) -> String {
    let (status, product) = call(app, Method::POST, "/api/v1/products", Some(seller), Some(json!({
        "name": "Paracetamol 500mg",
        "category": "analgesics",
        "kind": { "type": "drug", "active_ingredient": "paracetamol" },
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    let product_id = product["id"].as_str().expect("product id").to_string();

    let expiry = (Utc::now().date_naive() + Duration::days(180)).to_string();
    let uri = format!("/api/v1/products/{product_id}/batches");
    let (status, batch) = call(app, Method::POST, &uri, Some(seller), Some(json!({
        "quantity": quantity, "cost_price": "1.00", "selling_price": "2.50", "expiry_date": expiry,
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{batch}");
    product_id
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().expect("decimal string").parse().expect("decimal")
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(&app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_requests_without_identity_are_unauthorized() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = call(&app, Method::GET, "/api/v1/me", Some("no-such-user"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unapproved_seller_cannot_list_products() {
    let app = app();
    let seller = register(&app, "new@sellers.example", "seller").await;
    let (status, body) = call(&app, Method::POST, "/api/v1/products", Some(&seller), Some(json!({
        "name": "Gauze", "category": "consumables", "kind": { "type": "equipment" },
    })))
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn test_cart_checkout_and_order_status_over_http() {
    let app = app();
    let (_admin, seller, buyer) = parties(&app).await;
    let product_id = stocked_drug(&app, &seller, 10).await;

    let (status, body) = call(&app, Method::POST, "/api/v1/cart/items", Some(&buyer), Some(json!({
        "product_id": product_id, "quantity": 11,
    })))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "not_enough_quantity");

    let (status, cart) = call(&app, Method::POST, "/api/v1/cart/items", Some(&buyer), Some(json!({
        "product_id": product_id, "quantity": 4,
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&cart["cart"]["total_price"]), Decimal::new(1000, 2));
    assert_eq!(cart["lines"][0]["batches"].as_array().map(Vec::len), Some(1));

    let (status, orders) = call(&app, Method::POST, "/api/v1/checkout", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::CREATED, "{orders}");
    let order_id = orders[0]["order"]["id"].as_str().expect("order id").to_string();
    assert_eq!(orders[0]["order"]["status"], "pending_confirmation");

    let (_, product) = call(&app, Method::GET, &format!("/api/v1/products/{product_id}"), None, None).await;
    assert_eq!(product["total_quantity"], 6);

    let status_uri = format!("/api/v1/orders/{order_id}/status");
    let (status, body) = call(&app, Method::POST, &status_uri, Some(&seller), Some(json!({ "status": "delivered" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "invalid_transition");

    let (status, _) = call(&app, Method::POST, &status_uri, Some(&buyer), Some(json!({ "status": "confirmed" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, order) = call(&app, Method::POST, &status_uri, Some(&seller), Some(json!({ "status": "confirmed", "note": "packing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "confirmed");

    let (status, listed) = call(&app, Method::GET, "/api/v1/orders?view=seller&status=confirmed", Some(&seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], 1);

    let (status, notes) = call(&app, Method::GET, "/api/v1/notifications?unread_only=true", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = notes.as_array().expect("notifications").iter().filter_map(|n| n["kind"].as_str()).collect();
    assert!(kinds.contains(&"order_status_changed"));
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let app = app();
    let (status, body) = call(&app, Method::POST, "/api/v1/users", None, Some(json!({
        "name": "x", "email": "not-an-email", "role": "buyer",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, _) = call(&app, Method::GET, "/api/v1/products/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
