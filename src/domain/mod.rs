//! # Domain Layer
//!
//! Core rules of the chat core, independent of storage and transport.
//!
//! - **entities**: users, friend requests, chats, messages and their repository traits
//! - **value_objects**: identifier types and their wire encoding
//! - **unit_of_work**: transactional contract for multi-row mutations
//! - **services**: friendship resolution and chat provisioning

pub mod entities;
pub mod services;
pub mod unit_of_work;
pub mod value_objects;

pub use entities::*;
pub use unit_of_work::{Transaction, UnitOfWork};
pub use value_objects::*;
