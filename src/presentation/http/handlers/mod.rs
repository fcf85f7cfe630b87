//! HTTP Handlers

pub mod chats;
pub mod friends;
pub mod health;
pub mod users;
