//! WebSocket Gateway
//!
//! Live message delivery: the connection registry, the per-connection relay
//! loop, wire frames and the upgrade handler.

pub mod handler;
pub mod messages;
pub mod registry;
pub mod relay;

pub use handler::ws_handler;
pub use messages::{ErrorPayload, InboundMessage, MessagePayload, ServerFrame};
pub use registry::{ConnectionHandle, ConnectionRegistry, DeliveryOutcome, LoopGuard};
pub use relay::{run_connection, RelayContext};
