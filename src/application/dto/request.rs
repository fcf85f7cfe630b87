//! Request DTOs
//!
//! Data structures for API request bodies. Identifiers are accepted as
//! numbers or decimal strings.

use serde::Deserialize;
use validator::Validate;

use crate::application::services::FriendTarget;
use crate::domain::{option_string_id, string_id, FriendAction, UserId};
use crate::shared::error::AppError;

/// Send friend request. Exactly one of `email` and `user_id` identifies the target.
#[derive(Debug, Deserialize, Validate)]
pub struct SendFriendRequestBody {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default, with = "option_string_id")]
    pub user_id: Option<UserId>,
}

impl SendFriendRequestBody {
    pub fn target(self) -> Result<FriendTarget, AppError> {
        match (self.email, self.user_id) {
            (Some(email), None) => Ok(FriendTarget::Email(email.trim().to_lowercase())),
            (None, Some(id)) => Ok(FriendTarget::Id(id)),
            _ => Err(AppError::Validation(
                "Exactly one of email or user_id is required".into(),
            )),
        }
    }
}

/// User search query string
#[derive(Debug, Deserialize, Validate)]
pub struct SearchUsersQuery {
    #[validate(length(min = 1, max = 254, message = "Query must be 1 to 254 characters"))]
    pub email: String,
}

/// Accept or decline a received friend request
#[derive(Debug, Deserialize)]
pub struct ResolveFriendRequestBody {
    #[serde(with = "string_id")]
    pub from_id: UserId,

    pub action: FriendAction,
}
