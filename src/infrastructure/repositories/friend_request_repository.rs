//! Friend Request Repository Implementation
//!
//! PostgreSQL implementation over `friend_requests` and `friendships`.
//! The partial unique index `friend_requests_pending_pair` guarantees at most
//! one pending request per unordered pair, so concurrent sends race safely.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::user_repository::UserRow;
use crate::domain::{
    FriendRequest, FriendRequestRepository, FriendRequestStatus, IncomingRequest, User, UserId,
};
use crate::infrastructure::database::map_constraint;
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FriendRequestRow {
    id: i64,
    from_id: i64,
    to_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl FriendRequestRow {
    pub(crate) fn into_request(self) -> Result<FriendRequest, AppError> {
        let status = FriendRequestStatus::from_str(&self.status).ok_or_else(|| {
            AppError::Internal(format!(
                "friend request {} has unknown status {:?}",
                self.id, self.status
            ))
        })?;
        Ok(FriendRequest {
            id: self.id,
            from_id: self.from_id,
            to_id: self.to_id,
            status,
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IncomingRow {
    #[sqlx(flatten)]
    request: FriendRequestRow,
    sender_name: String,
    sender_email: String,
    sender_created_at: DateTime<Utc>,
}

/// PostgreSQL friend request repository implementation.
#[derive(Clone)]
pub struct PgFriendRequestRepository {
    pool: PgPool,
}

impl PgFriendRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FriendRequestRepository for PgFriendRequestRepository {
    async fn find_pending_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, AppError> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT id, from_id, to_id, status, created_at, resolved_at
            FROM friend_requests
            WHERE status = 'pending'
              AND ((from_id = $1 AND to_id = $2) OR (from_id = $2 AND to_id = $1))
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FriendRequestRow::into_request).transpose()
    }

    async fn create(&self, request: &FriendRequest) -> Result<FriendRequest, AppError> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            INSERT INTO friend_requests (id, from_id, to_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, from_id, to_id, status, created_at, resolved_at
            "#,
        )
        .bind(request.id)
        .bind(request.from_id)
        .bind(request.to_id)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_constraint(e, "friend request"))?;

        row.into_request()
    }

    async fn list_incoming(&self, user_id: UserId) -> Result<Vec<IncomingRequest>, AppError> {
        let rows = sqlx::query_as::<_, IncomingRow>(
            r#"
            SELECT r.id, r.from_id, r.to_id, r.status, r.created_at, r.resolved_at,
                   u.name AS sender_name, u.email AS sender_email,
                   u.created_at AS sender_created_at
            FROM friend_requests r
            JOIN users u ON u.id = r.from_id
            WHERE r.to_id = $1 AND r.status = 'pending'
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let request = row.request.into_request()?;
                let sender = User {
                    id: request.from_id,
                    name: row.sender_name,
                    email: row.sender_email,
                    created_at: row.sender_created_at,
                };
                Ok(IncomingRequest { request, sender })
            })
            .collect()
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user_id = $1 AND friend_id = $2)",
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_friends(&self, user_id: UserId) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.name, u.email, u.created_at
            FROM friendships f
            JOIN users u ON u.id = f.friend_id
            WHERE f.user_id = $1
            ORDER BY u.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
