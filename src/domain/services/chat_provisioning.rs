//! Chat provisioning domain service.
//!
//! Creates the chat for a member set inside a caller-owned transaction.
//! Provisioning never commits on its own.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::entities::{Chat, NewChat, User};
use crate::domain::unit_of_work::Transaction;
use crate::domain::value_objects::UserId;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Fallback name when no member has a usable display name.
pub const FALLBACK_CHAT_NAME: &str = "chat";

/// Member identity plus the display name used to derive a default chat name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub id: UserId,
    pub name: String,
}

impl From<&User> for ChatMember {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("a chat needs at least two members, got {0}")]
    TooFewMembers(usize),

    #[error("user {0} is listed more than once")]
    DuplicateMember(UserId),

    #[error(transparent)]
    Storage(#[from] AppError),
}

/// Builds and inserts chats.
#[derive(Clone)]
pub struct ChatProvisioner {
    ids: Arc<SnowflakeGenerator>,
}

impl ChatProvisioner {
    pub fn new(ids: Arc<SnowflakeGenerator>) -> Self {
        Self { ids }
    }

    /// Validate the member set and build the row to insert.
    ///
    /// More than two members makes a group chat. Without an explicit (non-blank)
    /// name, the name is derived from the member names.
    pub fn plan(&self, name: Option<&str>, members: &[ChatMember]) -> Result<NewChat, ProvisionError> {
        if members.len() < 2 {
            return Err(ProvisionError::TooFewMembers(members.len()));
        }
        let mut seen = HashSet::with_capacity(members.len());
        for member in members {
            if !seen.insert(member.id) {
                return Err(ProvisionError::DuplicateMember(member.id));
            }
        }

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => default_chat_name(members),
        };

        Ok(NewChat {
            id: self.ids.generate(),
            name,
            is_group: members.len() > 2,
            members: members.iter().map(|m| m.id).collect(),
        })
    }

    /// Create the chat for `members` within `tx`.
    ///
    /// Idempotent for one-to-one chats: if the pair already shares a direct
    /// chat, that chat is returned and nothing is inserted.
    pub async fn provision<T: Transaction>(
        &self,
        tx: &mut T,
        name: Option<&str>,
        members: &[ChatMember],
    ) -> Result<Chat, ProvisionError> {
        let plan = self.plan(name, members)?;

        if !plan.is_group {
            if let Some(existing) = tx.find_direct_chat(plan.members[0], plan.members[1]).await? {
                tracing::debug!(chat_id = existing.id, "Direct chat already exists");
                return Ok(existing);
            }
        }

        let chat = tx.insert_chat(&plan).await?;
        tracing::debug!(chat_id = chat.id, members = chat.members.len(), "Chat provisioned");
        Ok(chat)
    }
}

/// Default chat name: "Alice & Bob" for a pair, "Alice, Bob, Carol" for a group.
pub fn default_chat_name(members: &[ChatMember]) -> String {
    let names: Vec<&str> = members
        .iter()
        .map(|m| m.name.trim())
        .filter(|n| !n.is_empty())
        .collect();

    match names.as_slice() {
        [] => FALLBACK_CHAT_NAME.to_string(),
        [a, b] if members.len() == 2 => format!("{} & {}", a, b),
        _ => names.join(", "),
    }
}
