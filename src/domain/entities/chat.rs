//! Chat entity and repository trait.
//!
//! Maps to the `chats` and `chat_members` tables. Membership is fixed at
//! creation; member order is the order given at provisioning time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ChatId, UserId};
use crate::shared::error::AppError;

/// A durable channel grouping its members for message exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub is_group: bool,
    pub members: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn is_member(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }

    /// Every member except `user_id`, in membership order.
    pub fn other_members(&self, user_id: UserId) -> impl Iterator<Item = UserId> + '_ {
        self.members.iter().copied().filter(move |m| *m != user_id)
    }

    /// Whether this is the one-to-one chat between `a` and `b`. Never true
    /// for `a == b`.
    pub fn is_direct_between(&self, a: UserId, b: UserId) -> bool {
        a != b
            && !self.is_group && self.members.len() == 2 && self.is_member(a) && self.is_member(b)
    }
}

/// A chat ready to be inserted, produced by chat provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChat {
    pub id: ChatId,
    pub name: String,
    pub is_group: bool,
    pub members: Vec<UserId>,
}

impl NewChat {
    pub fn into_chat(self, created_at: DateTime<Utc>) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            is_group: self.is_group,
            members: self.members,
            created_at,
        }
    }
}

/// Repository trait for chat lookups.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Find a chat with its members.
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError>;

    /// Find the one-to-one chat between `a` and `b`.
    async fn find_direct_chat(&self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError>;

    /// Chats `user_id` belongs to, oldest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError>;
}
