//! # Domain Services
//!
//! - **FriendshipService**: friend request validation and resolution
//! - **ChatProvisioner**: chat creation inside a transaction

mod chat_provisioning;
mod friendship;

pub use chat_provisioning::*;
pub use friendship::*;
