//! Application Services
//!
//! Services that coordinate domain operations.
//!
//! - **FriendService**: friend requests and the friends list
//! - **MessageService**: validation and persistence of relayed messages
//! - **ChatService**: chat listing and history
//! - **UserService**: finding users by email

pub mod chat_service;
pub mod friend_service;
pub mod message_service;
pub mod user_service;

pub use chat_service::{ChatError, ChatService, ChatServiceImpl};
pub use friend_service::{FriendService, FriendServiceImpl, FriendTarget};
pub use message_service::{
    CreateMessageDto, MessageService, MessageServiceImpl, RelayError, RelayedMessage,
};
pub use user_service::{UserError, UserService, UserServiceImpl};
