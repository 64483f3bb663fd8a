use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::{Actor, ApiResult, AppState};
use crate::domain::aggregates::Notification;

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    #[serde(default)]
    pub unread_only: bool,
}

pub(super) async fn list(State(s): State<AppState>, Actor(user): Actor, Query(p): Query<ListParams>) -> ApiResult<Vec<Notification>> {
    Ok(Json(s.market.list_notifications(&user, p.unread_only).await?))
}

pub(super) async fn mark_read(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Notification> {
    Ok(Json(s.market.mark_notification_read(&user, &id).await?))
}

pub(super) async fn mark_all_read(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<serde_json::Value> {
    let updated = s.market.mark_all_notifications_read(&user).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// Server-sent events carrying the caller's notifications as they are raised.
pub(super) async fn stream(
    State(s): State<AppState>,
    Actor(user): Actor,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::debug!(user_id = %user.id, "notification stream opened");
    let events = s
        .market
        .notification_stream(user.id)
        .map(|n| Event::default().event("notification").id(n.id.clone()).json_data(&n));
    Sse::new(events).keep_alive(KeepAlive::default())
}
