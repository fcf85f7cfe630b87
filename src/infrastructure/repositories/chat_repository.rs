//! Chat Repository Implementation
//!
//! Chats are read together with their member list, aggregated in
//! membership order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Chat, ChatId, ChatRepository, UserId};
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ChatRow {
    id: i64,
    name: String,
    is_group: bool,
    members: Vec<i64>,
    created_at: DateTime<Utc>,
}

impl From<ChatRow> for Chat {
    fn from(row: ChatRow) -> Self {
        Chat {
            id: row.id,
            name: row.name,
            is_group: row.is_group,
            members: row.members,
            created_at: row.created_at,
        }
    }
}

const SELECT_CHAT: &str = r#"
    SELECT c.id, c.name, c.is_group, c.created_at,
           ARRAY(SELECT m.user_id FROM chat_members m
                 WHERE m.chat_id = c.id ORDER BY m.position) AS members
    FROM chats c
"#;

/// One-to-one chat whose members are exactly `$1` and `$2`.
pub(crate) const FIND_DIRECT_SQL: &str = r#"
    SELECT c.id, c.name, c.is_group, c.created_at,
           ARRAY(SELECT m.user_id FROM chat_members m
                 WHERE m.chat_id = c.id ORDER BY m.position) AS members
    FROM chats c
    WHERE NOT c.is_group
      AND $1 <> $2
      AND EXISTS(SELECT 1 FROM chat_members WHERE chat_id = c.id AND user_id = $1)
      AND EXISTS(SELECT 1 FROM chat_members WHERE chat_id = c.id AND user_id = $2)
      AND (SELECT COUNT(*) FROM chat_members WHERE chat_id = c.id) = 2
    ORDER BY c.created_at ASC
    LIMIT 1
"#;

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError> {
        let sql = format!("{SELECT_CHAT} WHERE c.id = $1");
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn find_direct_chat(&self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(FIND_DIRECT_SQL)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError> {
        let sql = format!(
            "{SELECT_CHAT} WHERE EXISTS(SELECT 1 FROM chat_members WHERE chat_id = c.id AND user_id = $1) \
             ORDER BY c.created_at ASC, c.id ASC"
        );
        let rows = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
