//! User Service
//!
//! Directory lookups used to find someone to send a friend request to.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{User, UserId, UserRepository};
use crate::shared::error::AppError;

/// Maximum number of users a search returns
pub const SEARCH_LIMIT: i64 = 20;

/// User service errors
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for UserError {
    fn from(e: AppError) -> Self {
        UserError::Internal(e.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::EmptyQuery => AppError::Validation(e.to_string()),
            UserError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// Users other than the caller whose email contains `query`
    async fn search_by_email(&self, caller: UserId, query: &str) -> Result<Vec<User>, UserError>;
}

/// UserService implementation
pub struct UserServiceImpl<U: UserRepository> {
    user_repo: Arc<U>,
}

impl<U: UserRepository> UserServiceImpl<U> {
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl<U: UserRepository + 'static> UserService for UserServiceImpl<U> {
    async fn search_by_email(&self, caller: UserId, query: &str) -> Result<Vec<User>, UserError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(UserError::EmptyQuery);
        }

        let users = self
            .user_repo
            .search_by_email(caller, &query.to_lowercase(), SEARCH_LIMIT)
            .await?;
        tracing::debug!(caller, results = users.len(), "User search");
        Ok(users)
    }
}
