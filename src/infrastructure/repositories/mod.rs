//! Repository Implementations
//!
//! PostgreSQL implementations of the domain repository traits.
//!
//! - **PgUserRepository** - read-only account lookups
//! - **PgFriendRequestRepository** - friend requests and the friendship relation
//! - **PgChatRepository** - chats with their member lists
//! - **PgMessageRepository** - append-only message log

pub mod chat_repository;
pub mod friend_request_repository;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use friend_request_repository::PgFriendRequestRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
