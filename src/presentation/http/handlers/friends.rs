//! Friend Handlers

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{ResolveFriendRequestBody, SendFriendRequestBody};
use crate::application::dto::response::{
    FriendRequestResponse, IncomingRequestResponse, ResolutionResponse, UserResponse,
};
use crate::application::services::FriendService;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

/// Send a friend request
pub async fn send_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendFriendRequestBody>,
) -> Result<(StatusCode, Json<FriendRequestResponse>), AppError> {
    validate_request(&body)?;
    let target = body.target()?;

    let request = state
        .friend_service()
        .send_request(auth.user_id, target)
        .await?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Pending requests addressed to the caller
pub async fn list_requests(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<IncomingRequestResponse>>, AppError> {
    let incoming = state.friend_service().list_incoming(auth.user_id).await?;
    Ok(Json(incoming.into_iter().map(Into::into).collect()))
}

/// Accept or decline a request the caller received
pub async fn resolve_request(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<ResolveFriendRequestBody>,
) -> Result<Json<ResolutionResponse>, AppError> {
    let resolution = state
        .friend_service()
        .resolve(auth.user_id, body.from_id, body.action)
        .await?;

    Ok(Json(resolution.into()))
}

/// The caller's friends
pub async fn list_friends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let friends = state.friend_service().list_friends(auth.user_id).await?;
    Ok(Json(friends.into_iter().map(Into::into).collect()))
}
