//! In-Process Store
//!
//! Implements every repository trait and the unit of work over a single
//! in-memory state. Transactions take the state lock for their whole
//! lifetime and write to a private copy, which replaces the shared state
//! only on commit. Transactions are therefore serializable, and a dropped
//! transaction leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    Chat, ChatId, ChatRepository, FriendRequest, FriendRequestId, FriendRequestRepository,
    FriendRequestStatus, IncomingRequest, Message, MessageRepository, NewChat, Transaction,
    UnitOfWork, User, UserId, UserRepository,
};
use crate::shared::error::AppError;

/// Complete store contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    users: BTreeMap<UserId, User>,
    requests: Vec<FriendRequest>,
    /// Directed edges; a friendship is stored in both directions.
    friendships: BTreeSet<(UserId, UserId)>,
    chats: BTreeMap<ChatId, Chat>,
    messages: Vec<Message>,
}

impl MemoryState {
    fn latest_request(&self, from_id: UserId, to_id: UserId) -> Option<&FriendRequest> {
        self.requests
            .iter()
            .filter(|r| r.from_id == from_id && r.to_id == to_id)
            .max_by_key(|r| (r.created_at, r.id))
    }

    fn pending_between(&self, a: UserId, b: UserId) -> Option<&FriendRequest> {
        self.requests
            .iter()
            .find(|r| r.is_pending() && r.involves(a, b))
    }

    fn direct_chat(&self, a: UserId, b: UserId) -> Option<&Chat> {
        self.chats.values().find(|c| c.is_direct_between(a, b))
    }

    fn are_friends(&self, a: UserId, b: UserId) -> bool {
        self.friendships.contains(&(a, b))
    }
}

/// Shared handle to an in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user account.
    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    /// Most recent request from `from_id` to `to_id`, whatever its status.
    pub async fn latest_request(&self, from_id: UserId, to_id: UserId) -> Option<FriendRequest> {
        self.state.lock().await.latest_request(from_id, to_id).cloned()
    }

    /// Number of chats whose member set is exactly `{a, b}`.
    pub async fn chats_between(&self, a: UserId, b: UserId) -> usize {
        self.state
            .lock()
            .await
            .chats
            .values()
            .filter(|c| c.members.len() == 2 && c.is_member(a) && c.is_member(b))
            .count()
    }

    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn search_by_email(
        &self,
        caller: UserId,
        fragment: &str,
        limit: i64,
    ) -> Result<Vec<User>, AppError> {
        let fragment = fragment.to_lowercase();
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.id != caller && u.email.to_lowercase().contains(&fragment))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.email.cmp(&b.email).then(a.id.cmp(&b.id)));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }
}

#[async_trait]
impl FriendRequestRepository for MemoryStore {
    async fn find_pending_between(
        &self,
        a: UserId,
        b: UserId,
    ) -> Result<Option<FriendRequest>, AppError> {
        Ok(self.state.lock().await.pending_between(a, b).cloned())
    }

    async fn create(&self, request: &FriendRequest) -> Result<FriendRequest, AppError> {
        let mut state = self.state.lock().await;
        if state.pending_between(request.from_id, request.to_id).is_some() {
            return Err(AppError::Conflict(
                "pending friend request already exists".into(),
            ));
        }
        for id in [request.from_id, request.to_id] {
            if !state.users.contains_key(&id) {
                return Err(AppError::NotFound(format!("User {} not found", id)));
            }
        }
        state.requests.push(request.clone());
        Ok(request.clone())
    }

    async fn list_incoming(&self, user_id: UserId) -> Result<Vec<IncomingRequest>, AppError> {
        let state = self.state.lock().await;
        let mut incoming: Vec<IncomingRequest> = state
            .requests
            .iter()
            .filter(|r| r.to_id == user_id && r.is_pending())
            .filter_map(|r| {
                state.users.get(&r.from_id).map(|sender| IncomingRequest {
                    request: r.clone(),
                    sender: sender.clone(),
                })
            })
            .collect();
        incoming.sort_by_key(|i| (i.request.created_at, i.request.id));
        Ok(incoming)
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, AppError> {
        Ok(self.state.lock().await.are_friends(a, b))
    }

    async fn list_friends(&self, user_id: UserId) -> Result<Vec<User>, AppError> {
        let state = self.state.lock().await;
        let mut friends: Vec<User> = state
            .friendships
            .range((user_id, UserId::MIN)..=(user_id, UserId::MAX))
            .filter_map(|(_, friend)| state.users.get(friend).cloned())
            .collect();
        friends.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(friends)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn find_by_id(&self, id: ChatId) -> Result<Option<Chat>, AppError> {
        Ok(self.state.lock().await.chats.get(&id).cloned())
    }

    async fn find_direct_chat(&self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError> {
        Ok(self.state.lock().await.direct_chat(a, b).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Chat>, AppError> {
        let state = self.state.lock().await;
        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|c| c.is_member(user_id))
            .cloned()
            .collect();
        chats.sort_by_key(|c| (c.created_at, c.id));
        Ok(chats)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn append(&self, message: &Message) -> Result<Message, AppError> {
        let mut state = self.state.lock().await;
        if !state.chats.contains_key(&message.chat_id) {
            return Err(AppError::NotFound(format!(
                "Chat {} not found",
                message.chat_id
            )));
        }
        state.messages.push(message.clone());
        Ok(message.clone())
    }

    async fn list_by_chat(&self, chat_id: ChatId) -> Result<Vec<Message>, AppError> {
        let state = self.state.lock().await;
        let mut messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.created_at, m.id));
        Ok(messages)
    }
}

/// Transaction over a [`MemoryStore`].
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction { guard, working })
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn lock_request(
        &mut self,
        from_id: UserId,
        to_id: UserId,
    ) -> Result<Option<FriendRequest>, AppError> {
        Ok(self.working.latest_request(from_id, to_id).cloned())
    }

    async fn set_request_status(
        &mut self,
        id: FriendRequestId,
        status: FriendRequestStatus,
        resolved_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let request = self
            .working
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Friend request {} not found", id)))?;
        request.status = status;
        request.resolved_at = Some(resolved_at);
        Ok(())
    }

    async fn insert_friendship(&mut self, a: UserId, b: UserId) -> Result<(), AppError> {
        self.working.friendships.insert((a, b));
        self.working.friendships.insert((b, a));
        Ok(())
    }

    async fn find_direct_chat(&mut self, a: UserId, b: UserId) -> Result<Option<Chat>, AppError> {
        Ok(self.working.direct_chat(a, b).cloned())
    }

    async fn insert_chat(&mut self, chat: &NewChat) -> Result<Chat, AppError> {
        if self.working.chats.contains_key(&chat.id) {
            return Err(AppError::Conflict(format!("Chat {} already exists", chat.id)));
        }
        let chat = chat.clone().into_chat(Utc::now());
        self.working.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn commit(mut self) -> Result<(), AppError> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}
