//! Response DTOs
//!
//! Data structures for API response bodies. Snowflake ids are rendered as
//! strings.

use serde::Serialize;

use crate::domain::services::Resolution;
use crate::domain::{Chat, FriendRequest, IncomingRequest, Message, User};

/// User response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            email: user.email,
        }
    }
}

/// Friend request response
#[derive(Debug, Serialize)]
pub struct FriendRequestResponse {
    pub id: String,
    pub from_id: String,
    pub to_id: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

impl From<FriendRequest> for FriendRequestResponse {
    fn from(request: FriendRequest) -> Self {
        Self {
            id: request.id.to_string(),
            from_id: request.from_id.to_string(),
            to_id: request.to_id.to_string(),
            status: request.status.as_str().to_string(),
            created_at: request.created_at.to_rfc3339(),
            resolved_at: request.resolved_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Received friend request with its sender
#[derive(Debug, Serialize)]
pub struct IncomingRequestResponse {
    #[serde(flatten)]
    pub request: FriendRequestResponse,
    pub sender: UserResponse,
}

impl From<IncomingRequest> for IncomingRequestResponse {
    fn from(incoming: IncomingRequest) -> Self {
        Self {
            request: incoming.request.into(),
            sender: incoming.sender.into(),
        }
    }
}

/// Outcome of accepting or declining a request
#[derive(Debug, Serialize)]
pub struct ResolutionResponse {
    pub request: FriendRequestResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatResponse>,
}

impl From<Resolution> for ResolutionResponse {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Accepted { request, chat } => Self {
                request: request.into(),
                chat: Some(chat.into()),
            },
            Resolution::Declined { request } => Self {
                request: request.into(),
                chat: None,
            },
        }
    }
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub name: String,
    pub is_group: bool,
    pub members: Vec<String>,
    pub created_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id.to_string(),
            name: chat.name,
            is_group: chat.is_group,
            members: chat.members.iter().map(|m| m.to_string()).collect(),
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

/// Message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            chat_id: message.chat_id.to_string(),
            sender_id: message.sender_id.to_string(),
            receiver_id: message.receiver_id.to_string(),
            content: message.content,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}
