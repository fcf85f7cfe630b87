//! Message Service
//!
//! Validates, resolves and persists a message sent over a live connection,
//! then reports who should receive it. Delivery itself belongs to the
//! connection registry; nothing is delivered unless the append succeeded.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Chat, ChatId, ChatRepository, Message, MessageRepository, UserId};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Persist a message from `sender_id` and resolve its recipients
    async fn relay(
        &self,
        sender_id: UserId,
        request: CreateMessageDto,
    ) -> Result<RelayedMessage, RelayError>;
}

/// Inbound message as decoded from the wire. The sender is never part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMessageDto {
    pub receiver_id: UserId,
    pub chat_id: Option<ChatId>,
    pub content: String,
}

/// A persisted message and the members it should be delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedMessage {
    pub message: Message,
    pub recipients: Vec<UserId>,
}

/// Per-message relay errors. None of them is fatal to the connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Message content is empty")]
    EmptyContent,

    #[error("A message cannot be addressed to its sender")]
    SelfAddressed,

    #[error("Message content exceeds {0} characters")]
    ContentTooLong(usize),

    #[error("Chat not found")]
    ChatNotFound,

    #[error("Sender or receiver is not a member of the chat")]
    NotMember,

    #[error("Message could not be stored: {0}")]
    Storage(String),
}

impl RelayError {
    /// Machine-readable code carried by error frames
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::EmptyContent | RelayError::SelfAddressed => "malformed",
            RelayError::ContentTooLong(_) => "content_too_long",
            RelayError::ChatNotFound => "chat_not_found",
            RelayError::NotMember => "not_member",
            RelayError::Storage(_) => "storage",
        }
    }
}

impl From<AppError> for RelayError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::NotFound(_) => RelayError::ChatNotFound,
            other => RelayError::Storage(other.to_string()),
        }
    }
}

/// MessageService implementation
pub struct MessageServiceImpl<M, C>
where
    M: MessageRepository,
    C: ChatRepository,
{
    message_repo: Arc<M>,
    chat_repo: Arc<C>,
    id_generator: Arc<SnowflakeGenerator>,
    max_content_length: usize,
}

impl<M, C> MessageServiceImpl<M, C>
where
    M: MessageRepository,
    C: ChatRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        chat_repo: Arc<C>,
        id_generator: Arc<SnowflakeGenerator>,
        max_content_length: usize,
    ) -> Self {
        Self {
            message_repo,
            chat_repo,
            id_generator,
            max_content_length,
        }
    }

    fn check_content(&self, content: &str) -> Result<(), RelayError> {
        if content.trim().is_empty() {
            return Err(RelayError::EmptyContent);
        }
        if content.chars().count() > self.max_content_length {
            return Err(RelayError::ContentTooLong(self.max_content_length));
        }
        Ok(())
    }

    /// The explicit chat if given, otherwise the direct chat of the pair.
    async fn resolve_chat(
        &self,
        sender_id: UserId,
        request: &CreateMessageDto,
    ) -> Result<Chat, RelayError> {
        let chat = match request.chat_id {
            Some(chat_id) => self.chat_repo.find_by_id(chat_id).await,
            None => {
                self.chat_repo
                    .find_direct_chat(sender_id, request.receiver_id)
                    .await
            }
        }
        .map_err(|e| RelayError::Storage(e.to_string()))?;

        chat.ok_or(RelayError::ChatNotFound)
    }
}

#[async_trait]
impl<M, C> MessageService for MessageServiceImpl<M, C>
where
    M: MessageRepository + 'static,
    C: ChatRepository + 'static,
{
    async fn relay(
        &self,
        sender_id: UserId,
        request: CreateMessageDto,
    ) -> Result<RelayedMessage, RelayError> {
        self.check_content(&request.content)?;
        if request.receiver_id == sender_id {
            return Err(RelayError::SelfAddressed);
        }

        let chat = self.resolve_chat(sender_id, &request).await?;
        if !chat.is_member(sender_id) || !chat.is_member(request.receiver_id) {
            return Err(RelayError::NotMember);
        }

        let message = Message {
            id: self.id_generator.generate(),
            chat_id: chat.id,
            sender_id,
            receiver_id: request.receiver_id,
            content: request.content,
            created_at: Utc::now(),
        };

        let message = self.message_repo.append(&message).await.map_err(|e| {
            if !matches!(e, AppError::NotFound(_)) {
                tracing::error!(chat_id = chat.id, sender_id, error = %e, "Message append failed");
            }
            RelayError::from(e)
        })?;

        let recipients = chat.other_members(sender_id).collect();
        Ok(RelayedMessage {
            message,
            recipients,
        })
    }
}
