//! Friend Service
//!
//! Sending, listing and resolving friend requests. Acceptance runs inside one
//! unit of work so the status flip, the friendship rows and the new chat
//! commit together.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::services::{FriendError, FriendshipService, Resolution};
use crate::domain::{
    FriendAction, FriendRequest, FriendRequestRepository, IncomingRequest, Transaction,
    UnitOfWork, User, UserId, UserRepository,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// How the addressee of a new request is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FriendTarget {
    Email(String),
    Id(UserId),
}

/// Friend service trait
#[async_trait]
pub trait FriendService: Send + Sync {
    /// Create a pending request from `from_id` to `target`
    async fn send_request(
        &self,
        from_id: UserId,
        target: FriendTarget,
    ) -> Result<FriendRequest, FriendError>;

    /// Accept or decline the request `from_id` sent to `to_id`
    async fn resolve(
        &self,
        to_id: UserId,
        from_id: UserId,
        action: FriendAction,
    ) -> Result<Resolution, FriendError>;

    /// Pending requests addressed to `user_id`
    async fn list_incoming(&self, user_id: UserId) -> Result<Vec<IncomingRequest>, FriendError>;

    /// Friends of `user_id`
    async fn list_friends(&self, user_id: UserId) -> Result<Vec<User>, FriendError>;
}

/// FriendService implementation
pub struct FriendServiceImpl<U, F, W>
where
    U: UserRepository,
    F: FriendRequestRepository,
    W: UnitOfWork,
{
    user_repo: Arc<U>,
    request_repo: Arc<F>,
    uow: Arc<W>,
    friendship: FriendshipService,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, F, W> FriendServiceImpl<U, F, W>
where
    U: UserRepository,
    F: FriendRequestRepository,
    W: UnitOfWork,
{
    pub fn new(
        user_repo: Arc<U>,
        request_repo: Arc<F>,
        uow: Arc<W>,
        friendship: FriendshipService,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            user_repo,
            request_repo,
            uow,
            friendship,
            id_generator,
        }
    }

    async fn find_target(&self, target: &FriendTarget) -> Result<User, FriendError> {
        let user = match target {
            FriendTarget::Email(email) => self.user_repo.find_by_email(email).await?,
            FriendTarget::Id(id) => self.user_repo.find_by_id(*id).await?,
        };
        user.ok_or(FriendError::UserNotFound)
    }
}

#[async_trait]
impl<U, F, W> FriendService for FriendServiceImpl<U, F, W>
where
    U: UserRepository + 'static,
    F: FriendRequestRepository + 'static,
    W: UnitOfWork + 'static,
{
    async fn send_request(
        &self,
        from_id: UserId,
        target: FriendTarget,
    ) -> Result<FriendRequest, FriendError> {
        if let FriendTarget::Id(to_id) = target {
            FriendshipService::check_new_request(from_id, to_id)?;
        }

        let addressee = self.find_target(&target).await?;
        FriendshipService::check_new_request(from_id, addressee.id)?;

        if self.request_repo.are_friends(from_id, addressee.id).await? {
            return Err(FriendError::AlreadyFriends);
        }
        if self
            .request_repo
            .find_pending_between(from_id, addressee.id)
            .await?
            .is_some()
        {
            return Err(FriendError::AlreadyPending);
        }

        let request = FriendRequest::pending(self.id_generator.generate(), from_id, addressee.id)
            .ok_or(FriendError::SelfRequest)?;

        // The pending-pair index is the final arbiter for concurrent sends.
        let request = self.request_repo.create(&request).await.map_err(|e| match e {
            AppError::Conflict(_) => FriendError::AlreadyPending,
            AppError::NotFound(_) => FriendError::UserNotFound,
            other => other.into(),
        })?;

        metrics::record_friend_request("sent");
        tracing::info!(
            request_id = request.id,
            from_id = request.from_id,
            to_id = request.to_id,
            "Friend request sent"
        );
        Ok(request)
    }

    async fn resolve(
        &self,
        to_id: UserId,
        from_id: UserId,
        action: FriendAction,
    ) -> Result<Resolution, FriendError> {
        let sender = self
            .user_repo
            .find_by_id(from_id)
            .await?
            .ok_or(FriendError::RequestNotFound)?;
        let addressee = self
            .user_repo
            .find_by_id(to_id)
            .await?
            .ok_or(FriendError::UserNotFound)?;

        let mut tx = self.uow.begin().await?;
        let resolution = match self.friendship.resolve(&mut tx, &sender, &addressee, action).await {
            Ok(resolution) => resolution,
            Err(e) => {
                // Dropping the transaction rolls it back.
                drop(tx);
                tracing::debug!(from_id, to_id, error = %e, "Friend request resolution failed");
                return Err(e);
            }
        };
        tx.commit().await?;

        let event = match &resolution {
            Resolution::Accepted { chat, .. } => {
                tracing::info!(from_id, to_id, chat_id = chat.id, "Friend request accepted");
                "accepted"
            }
            Resolution::Declined { .. } => {
                tracing::info!(from_id, to_id, "Friend request declined");
                "declined"
            }
        };
        metrics::record_friend_request(event);
        Ok(resolution)
    }

    async fn list_incoming(&self, user_id: UserId) -> Result<Vec<IncomingRequest>, FriendError> {
        Ok(self.request_repo.list_incoming(user_id).await?)
    }

    async fn list_friends(&self, user_id: UserId) -> Result<Vec<User>, FriendError> {
        Ok(self.request_repo.list_friends(user_id).await?)
    }
}
