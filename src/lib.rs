//! # Chat Relay Library
//!
//! Real-time chat backend:
//! - Connection registry tracking which users are reachable live
//! - Message relay persisting and forwarding messages over WebSocket
//! - Friend request state machine whose acceptance provisions a chat
//! - Thin HTTP API over friends and chats
//!
//! ## Architecture
//!
//! ```text
//! chat_relay/
//! +-- config/         Configuration management
//! +-- domain/         Entities, repository traits, unit of work, domain services
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ PostgreSQL, in-process store, metrics
//! +-- presentation/   HTTP routes and the WebSocket gateway
//! +-- shared/         Errors, snowflake ids, validation
//! ```

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod shared;
pub mod startup;
pub mod telemetry;
