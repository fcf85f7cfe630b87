//! Friend request entity, its state machine, and the repository trait.
//!
//! Maps to the `friend_requests` and `friendships` tables.
//!
//! ```text
//!            accept
//! pending ----------> accepted   (terminal, friendship + chat provisioned)
//!    |
//!    +-------------> declined   (terminal, no side effect)
//!            decline
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;
use crate::domain::value_objects::{FriendRequestId, UserId};
use crate::shared::error::AppError;

/// Status of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl FriendRequestStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the addressee does with a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendAction {
    Accept,
    Decline,
}

impl FriendAction {
    /// Status the request ends in once this action is applied.
    pub fn target_status(&self) -> FriendRequestStatus {
        match self {
            Self::Accept => FriendRequestStatus::Accepted,
            Self::Decline => FriendRequestStatus::Declined,
        }
    }
}

/// Rejected state transition: the request already left `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("friend request is already {current}")]
pub struct InvalidTransition {
    pub current: FriendRequestStatus,
}

/// A friend request between two distinct users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub from_id: UserId,
    pub to_id: UserId,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    /// Create a new pending request. Returns `None` for a self-request.
    pub fn pending(id: FriendRequestId, from_id: UserId, to_id: UserId) -> Option<Self> {
        if from_id == to_id {
            return None;
        }
        Some(Self {
            id,
            from_id,
            to_id,
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    /// Whether the request is between `a` and `b`, in either direction.
    pub fn involves(&self, a: UserId, b: UserId) -> bool {
        (self.from_id == a && self.to_id == b) || (self.from_id == b && self.to_id == a)
    }

    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }

    /// Apply `action`. Only a pending request can move, and it moves exactly once.
    pub fn transition(&self, action: FriendAction) -> Result<FriendRequestStatus, InvalidTransition> {
        match self.status {
            FriendRequestStatus::Pending => Ok(action.target_status()),
            current => Err(InvalidTransition { current }),
        }
    }
}

/// A pending request together with its sender, for the addressee's inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub request: FriendRequest,
    pub sender: User,
}

/// Repository trait for friend requests and the derived friendship relation.
///
/// Single-row operations only. The acceptance transaction goes through
/// [`crate::domain::UnitOfWork`].
#[async_trait]
pub trait FriendRequestRepository: Send + Sync {
    /// Pending request between `a` and `b` in either direction.
    async fn find_pending_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, AppError>;

    /// Insert a pending request.
    ///
    /// Fails with `AppError::Conflict` when a pending request already exists
    /// for the unordered pair.
    async fn create(&self, request: &FriendRequest) -> Result<FriendRequest, AppError>;

    /// Pending requests addressed to `user_id`, oldest first.
    async fn list_incoming(&self, user_id: UserId) -> Result<Vec<IncomingRequest>, AppError>;

    /// Whether `a` and `b` are friends.
    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, AppError>;

    /// Friends of `user_id`, ordered by name.
    async fn list_friends(&self, user_id: UserId) -> Result<Vec<User>, AppError>;
}
