//! WebSocket Message Types
//!
//! JSON text frames exchanged over the gateway. Outbound frames are tagged by
//! `type`; ids are rendered as decimal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::services::CreateMessageDto;
use crate::domain::{option_string_id, string_id, ChatId, Message, MessageId, UserId};

/// Incoming message unit.
///
/// Client-supplied `sender_id` and `created_at` fields are ignored; the
/// server stamps both.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub content: String,

    #[serde(with = "string_id")]
    pub receiver_id: UserId,

    #[serde(default, with = "option_string_id")]
    pub chat_id: Option<ChatId>,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<InboundMessage> for CreateMessageDto {
    fn from(inbound: InboundMessage) -> Self {
        Self {
            receiver_id: inbound.receiver_id,
            chat_id: inbound.chat_id,
            content: inbound.content,
        }
    }
}

/// Outgoing frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A message relayed to a recipient
    Message(MessagePayload),
    /// The sender's own message, once persisted
    Ack(MessagePayload),
    /// A per-message failure reported to the sender
    Error(ErrorPayload),
}

impl ServerFrame {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerFrame::Error(ErrorPayload {
            code: code.to_string(),
            message: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(with = "string_id")]
    pub id: MessageId,
    #[serde(with = "string_id")]
    pub chat_id: ChatId,
    #[serde(with = "string_id")]
    pub sender_id: UserId,
    #[serde(with = "string_id")]
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}
