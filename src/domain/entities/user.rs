//! User entity and repository trait.
//!
//! Accounts are owned by the account service; this crate only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;

/// A user account as seen by the chat core.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY
/// - name: VARCHAR(64) NOT NULL
/// - email: VARCHAR(255) NOT NULL UNIQUE
/// - created_at: TIMESTAMPTZ NOT NULL DEFAULT NOW()
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

/// Repository trait for user lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError>;

    /// Find a user by email address (exact match).
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Users other than `caller` whose email contains `fragment`, ignoring
    /// case, ordered by email. At most `limit` results.
    async fn search_by_email(
        &self,
        caller: UserId,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<User>, AppError>;
}
