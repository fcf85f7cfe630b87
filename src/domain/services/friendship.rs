//! Friendship domain service.
//!
//! Validation for new requests and resolution of pending ones. Resolution
//! runs entirely inside the caller's transaction: status change, friendship
//! rows and chat provisioning commit together or not at all.

use chrono::Utc;

use super::chat_provisioning::{ChatMember, ChatProvisioner, ProvisionError};
use crate::domain::entities::{Chat, FriendAction, FriendRequest, FriendRequestStatus, User};
use crate::domain::unit_of_work::Transaction;
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;

/// Friendship errors
#[derive(Debug, thiserror::Error)]
pub enum FriendError {
    #[error("Cannot send a friend request to yourself")]
    SelfRequest,

    #[error("User not found")]
    UserNotFound,

    #[error("A friend request between these users is already pending")]
    AlreadyPending,

    #[error("Users are already friends")]
    AlreadyFriends,

    #[error("Friend request not found")]
    RequestNotFound,

    #[error("Friend request is already {0}")]
    NotPending(FriendRequestStatus),

    #[error("Chat provisioning failed: {0}")]
    Provisioning(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<AppError> for FriendError {
    fn from(e: AppError) -> Self {
        FriendError::Storage(e.to_string())
    }
}

impl From<ProvisionError> for FriendError {
    fn from(e: ProvisionError) -> Self {
        match e {
            ProvisionError::Storage(e) => FriendError::Storage(e.to_string()),
            other => FriendError::Provisioning(other.to_string()),
        }
    }
}

impl From<FriendError> for AppError {
    fn from(e: FriendError) -> Self {
        match e {
            FriendError::SelfRequest | FriendError::AlreadyPending | FriendError::AlreadyFriends => {
                AppError::Validation(e.to_string())
            }
            FriendError::UserNotFound | FriendError::RequestNotFound => {
                AppError::NotFound(e.to_string())
            }
            FriendError::NotPending(_) => AppError::Conflict(e.to_string()),
            FriendError::Provisioning(_) | FriendError::Storage(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Accepted { request: FriendRequest, chat: Chat },
    Declined { request: FriendRequest },
}

impl Resolution {
    pub fn request(&self) -> &FriendRequest {
        match self {
            Resolution::Accepted { request, .. } | Resolution::Declined { request } => request,
        }
    }
}

/// Domain service driving the friend request state machine.
#[derive(Clone)]
pub struct FriendshipService {
    provisioner: ChatProvisioner,
}

impl FriendshipService {
    pub fn new(provisioner: ChatProvisioner) -> Self {
        Self { provisioner }
    }

    /// Checks that need no storage access.
    pub fn check_new_request(from_id: UserId, to_id: UserId) -> Result<(), FriendError> {
        if from_id == to_id {
            return Err(FriendError::SelfRequest);
        }
        Ok(())
    }

    /// Resolve the request `sender` sent to `addressee`, writing through `tx`.
    ///
    /// The caller commits `tx` on `Ok` and drops it on `Err`.
    pub async fn resolve<T: Transaction>(
        &self,
        tx: &mut T,
        sender: &User,
        addressee: &User,
        action: FriendAction,
    ) -> Result<Resolution, FriendError> {
        let request = tx
            .lock_request(sender.id, addressee.id)
            .await?
            .ok_or(FriendError::RequestNotFound)?;

        let status = request
            .transition(action)
            .map_err(|e| FriendError::NotPending(e.current))?;

        let now = Utc::now();
        tx.set_request_status(request.id, status, now).await?;
        let request = FriendRequest {
            status,
            resolved_at: Some(now),
            ..request
        };

        match action {
            FriendAction::Decline => Ok(Resolution::Declined { request }),
            FriendAction::Accept => {
                tx.insert_friendship(sender.id, addressee.id).await?;
                let members = [ChatMember::from(sender), ChatMember::from(addressee)];
                let chat = self.provisioner.provision(tx, None, &members).await?;
                Ok(Resolution::Accepted { request, chat })
            }
        }
    }
}
