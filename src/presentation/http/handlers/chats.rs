//! Chat Handlers

use axum::{
    extract::{Extension, Path, State},
    Json,
};

use crate::application::dto::response::{ChatResponse, MessageResponse};
use crate::application::services::ChatService;
use crate::domain::ChatId;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Chats the caller belongs to
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let chats = state.chat_service().list_chats(auth.user_id).await?;
    Ok(Json(chats.into_iter().map(Into::into).collect()))
}

/// Message history of a chat
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let chat_id: ChatId = chat_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid chat ID".into()))?;

    let messages = state
        .chat_service()
        .list_messages(auth.user_id, chat_id)
        .await?;

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
