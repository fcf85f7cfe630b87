//! WebSocket Upgrade Handler
//!
//! Authenticates the upgrade request, then hands the socket to the relay
//! loop. Browsers cannot set headers on WebSocket requests, so the token may
//! also come from the `token` query parameter.

use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::HeaderMap,
    response::Response,
};
use futures::StreamExt;
use serde::Deserialize;

use super::relay::run_connection;
use crate::presentation::middleware::auth::{bearer_token, verify_token};
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = bearer_token(&headers)
        .or(query.token.as_deref())
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
    let user_id = verify_token(&state.settings.jwt.secret, token)?;

    let ctx = state.relay_context();
    let response = ws
        .max_message_size(state.settings.websocket.max_message_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(user_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            let (writer, reader) = socket.split();
            run_connection(user_id, reader, writer, ctx).await;
        });

    Ok(response)
}
