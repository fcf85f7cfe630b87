//! Message Repository Implementation
//!
//! Append-only message log. Messages are never updated or deleted here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{ChatId, Message, MessageRepository};
use crate::infrastructure::database::map_constraint;
use crate::shared::error::AppError;

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    sender_id: i64,
    receiver_id: i64,
    content: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    /// Persist a message. A missing chat surfaces as `NotFound`.
    async fn append(&self, message: &Message) -> Result<Message, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, chat_id, sender_id, receiver_id, content, created_at
            "#,
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "message"))?;

        Ok(row.into_message())
    }

    /// Messages of a chat in creation order.
    async fn list_by_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, chat_id, sender_id, receiver_id, content, created_at
            FROM messages
            WHERE chat_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MessageRow::into_message).collect())
    }
}
