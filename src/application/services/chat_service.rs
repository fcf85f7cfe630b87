//! Chat Service
//!
//! Read-side access to chats and their message history.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Chat, ChatId, ChatRepository, Message, MessageRepository, UserId};
use crate::shared::error::AppError;

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    NotFound,

    #[error("Not a member of this chat")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for ChatError {
    fn from(e: AppError) -> Self {
        ChatError::Internal(e.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound => AppError::NotFound(e.to_string()),
            ChatError::Forbidden => AppError::Forbidden(e.to_string()),
            ChatError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Chats `user_id` belongs to
    async fn list_chats(&self, user_id: UserId) -> Result<Vec<Chat>, ChatError>;

    /// Full history of a chat, oldest first. The caller must be a member.
    async fn list_messages(&self, user_id: UserId, chat_id: ChatId)
        -> Result<Vec<Message>, ChatError>;
}

/// ChatService implementation
pub struct ChatServiceImpl<C, M>
where
    C: ChatRepository,
    M: MessageRepository,
{
    chat_repo: Arc<C>,
    message_repo: Arc<M>,
}

impl<C, M> ChatServiceImpl<C, M>
where
    C: ChatRepository,
    M: MessageRepository,
{
    pub fn new(chat_repo: Arc<C>, message_repo: Arc<M>) -> Self {
        Self {
            chat_repo,
            message_repo,
        }
    }
}

#[async_trait]
impl<C, M> ChatService for ChatServiceImpl<C, M>
where
    C: ChatRepository + 'static,
    M: MessageRepository + 'static,
{
    async fn list_chats(&self, user_id: UserId) -> Result<Vec<Chat>, ChatError> {
        Ok(self.chat_repo.list_for_user(user_id).await?)
    }

    async fn list_messages(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Vec<Message>, ChatError> {
        let chat = self
            .chat_repo
            .find_by_id(chat_id)
            .await?
            .ok_or(ChatError::NotFound)?;

        if !chat.is_member(user_id) {
            return Err(ChatError::Forbidden);
        }

        Ok(self.message_repo.list_by_chat(chat_id).await?)
    }
}
