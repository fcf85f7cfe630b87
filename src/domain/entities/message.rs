//! Message entity and repository trait.
//!
//! Maps to the `messages` table. Messages are immutable once appended.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ChatId, MessageId, UserId};
use crate::shared::error::AppError;

/// A message in a chat.
///
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - chat_id: BIGINT NOT NULL REFERENCES chats(id)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - receiver_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - created_at: TIMESTAMPTZ NOT NULL (server-assigned)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Get the content length in characters.
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// Repository trait for message storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Durably append a message.
    ///
    /// Fails with `AppError::NotFound` when the chat does not exist.
    async fn append(&self, message: &Message) -> Result<Message, AppError>;

    /// Messages of a chat in creation order.
    async fn list_by_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, AppError>;
}
