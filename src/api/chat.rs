use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{Actor, ApiError, ApiResult, AppState};
use crate::domain::aggregates::{ChatMessage, Conversation};
use crate::services::chat::SendMessage;

pub(super) async fn send_message(
    State(s): State<AppState>,
    Actor(user): Actor,
    Json(r): Json<SendMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    Ok((StatusCode::CREATED, Json(s.market.send_message(&user, r).await?)))
}

pub(super) async fn list_conversations(State(s): State<AppState>, Actor(user): Actor) -> ApiResult<Vec<Conversation>> {
    Ok(Json(s.market.list_conversations(&user).await?))
}

pub(super) async fn list_messages(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Vec<ChatMessage>> {
    Ok(Json(s.market.list_messages(&user, &id).await?))
}

pub(super) async fn mark_read(State(s): State<AppState>, Actor(user): Actor, Path(id): Path<String>) -> ApiResult<Conversation> {
    Ok(Json(s.market.mark_conversation_read(&user, &id).await?))
}
