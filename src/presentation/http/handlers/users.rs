//! User Handlers

use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::application::dto::request::SearchUsersQuery;
use crate::application::dto::response::UserResponse;
use crate::application::services::UserService;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::validate_request;
use crate::startup::AppState;

/// Search users by email fragment: `GET /api/v1/users/search?email=...`
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    validate_request(&query)?;

    let users = state
        .user_service()
        .search_by_email(auth.user_id, &query.email)
        .await?;

    Ok(Json(users.into_iter().map(Into::into).collect()))
}
