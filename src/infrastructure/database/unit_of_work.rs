//! Unit of Work Implementation
//!
//! PostgreSQL transactions behind the domain [`Transaction`] contract.
//! Dropping a [`TransactionContext`] without committing rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};

use super::map_constraint;
use crate::domain::{
    Chat, FriendRequest, FriendRequestId, FriendRequestStatus, NewChat, Transaction, UnitOfWork,
    UserId,
};
use crate::infrastructure::repositories::{chat_repository, friend_request_repository};
use crate::shared::error::AppError;

/// Transaction context that wraps a SQLx transaction.
pub struct TransactionContext {
    tx: sqlx::Transaction<'static, Postgres>,
}

impl TransactionContext {
    pub fn new(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    /// Get a reference to the underlying transaction for query execution.
    pub fn as_mut(&mut self) -> &mut sqlx::Transaction<'static, Postgres> {
        &mut self.tx
    }

    /// Roll back explicitly instead of on drop.
    pub async fn rollback(self) -> Result<(), AppError> {
        self.tx.rollback().await.map_err(AppError::Database)
    }
}

/// PostgreSQL Unit of Work implementation.
#[derive(Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Tx = TransactionContext;

    async fn begin(&self) -> Result<TransactionContext, AppError> {
        let tx = self.pool.begin().await.map_err(AppError::Database)?;
        Ok(TransactionContext::new(tx))
    }
}

#[async_trait]
impl Transaction for TransactionContext {
    async fn lock_request(
        &mut self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<FriendRequest>, AppError> {
        let row = sqlx::query_as::<_, friend_request_repository::FriendRequestRow>(
            r#"
            SELECT id, from_id, to_id, status, created_at, resolved_at
            FROM friend_requests
            WHERE from_id = $1 AND to_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(|r| r.into_request()).transpose()
    }

    async fn set_request_status(
        &mut self,
        id: FriendRequestId,
        status: FriendRequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE friend_requests SET status = $2, resolved_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(resolved_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Friend request {} not found", id)));
        }
        Ok(())
    }

    async fn insert_friendship(&mut self, a: UserId, b: UserId) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO friendships (user_id, friend_id)
            VALUES ($1, $2), ($2, $1)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(a)
        .bind(b)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn find_direct_chat(&mut self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, chat_repository::ChatRow>(chat_repository::FIND_DIRECT_SQL)
            .bind(a)
            .bind(b)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_chat(&mut self, chat: &NewChat) -> Result<Chat, AppError> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO chats (id, name, is_group) VALUES ($1, $2, $3) RETURNING created_at",
        )
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.is_group)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_constraint(e, "chat"))?;

        let positions: Vec<i32> = (0..chat.members.len() as i32).collect();
        sqlx::query(
            r#"
            INSERT INTO chat_members (chat_id, user_id, position)
            SELECT $1, member.user_id, member.position
            FROM UNNEST($2::BIGINT[], $3::INTEGER[]) AS member(user_id, position)
            "#,
        )
        .bind(chat.id)
        .bind(&chat.members)
        .bind(&positions)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_constraint(e, "chat member"))?;

        Ok(chat.clone().into_chat(created_at))
    }

    async fn commit(self) -> Result<(), AppError> {
        self.tx.commit().await.map_err(AppError::Database)
    }
}
