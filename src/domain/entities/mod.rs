//! # Domain Entities
//!
//! - **User**: read-only view of an account
//! - **FriendRequest**: pending/accepted/declined proposal between two users
//! - **Chat**: one-to-one or group channel with fixed membership
//! - **Message**: immutable message belonging to exactly one chat
//!
//! Each entity has an associated repository trait. Together they form the
//! persistence port; implementations live in the infrastructure layer.

mod chat;
mod friend_request;
mod message;
mod user;

pub use chat::{Chat, ChatRepository, NewChat};
pub use friend_request::{
    FriendAction, FriendRequest, FriendRequestRepository, FriendRequestStatus, IncomingRequest,
    InvalidTransition,
};
pub use message::{Message, MessageRepository};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
