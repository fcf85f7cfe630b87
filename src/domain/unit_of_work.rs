//! Unit of Work contract.
//!
//! Multi-row mutations that must commit or fail together run inside a
//! [`Transaction`] obtained from a [`UnitOfWork`]. Dropping a transaction
//! without calling [`Transaction::commit`] discards every write made through it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entities::{Chat, FriendRequest, FriendRequestStatus, NewChat};
use super::value_objects::{FriendRequestId, UserId};
use crate::shared::error::AppError;

/// Source of transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: Transaction;

    /// Begin a new transaction.
    async fn begin(&self) -> Result<Self::Tx, AppError>;
}

/// Operations available inside a transaction.
#[async_trait]
pub trait Transaction: Send {
    /// Most recent request sent by `from_id` to `to_id`, locked until the
    /// transaction ends so concurrent resolutions serialize on it.
    async fn lock_request(
        &mut self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<FriendRequest>, AppError>;

    /// Move a request to `status`.
    async fn set_request_status(
        &mut self,
        id: FriendRequestId,
        status: FriendRequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Record the symmetric friendship between `a` and `b`.
    async fn insert_friendship(&mut self, a: UserId, b: UserId) -> Result<(), AppError>;

    /// One-to-one chat between `a` and `b`, as visible inside this transaction.
    async fn find_direct_chat(&mut self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError>;

    /// Insert a chat and its members.
    async fn insert_chat(&mut self, chat: &NewChat) -> Result<Chat, AppError>;

    /// Make every write of this transaction visible.
    async fn commit(self) -> Result<(), AppError>;
}
