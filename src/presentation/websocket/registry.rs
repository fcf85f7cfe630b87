//! Connection Registry
//!
//! Authoritative map from online users to their live connection. One
//! connection per user: the most recent registration wins and the superseded
//! connection is asked to close by its own loop.
//!
//! The map sits behind a single mutex that is held only for the lookup or
//! mutation itself. Frames are handed to a bounded per-connection queue with
//! `try_send` after the lock is released, so a slow client can never stall
//! registry operations or the sender's relay loop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use super::messages::ServerFrame;
use crate::domain::UserId;
use crate::infrastructure::metrics;

/// Result of a live delivery attempt. Never an error: the message is already
/// persisted and history covers anything not delivered live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// No registered connection for the user
    Offline,
    /// The connection's outbound queue is full (slow consumer)
    QueueFull,
    /// The connection's writer has already gone away
    Closed,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Offline => "offline",
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Handle to one live connection: its outbound queue and close signal.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: Uuid,
    user_id: UserId,
    sender: mpsc::Sender<ServerFrame>,
    close: Arc<Notify>,
}

impl ConnectionHandle {
    /// Create a handle with a bounded outbound queue of `capacity` frames.
    /// The receiver goes to the connection's writer.
    pub fn new(user_id: UserId, capacity: usize) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            connection_id: Uuid::new_v4(),
            user_id,
            sender,
            close: Arc::new(Notify::new()),
        };
        (handle, receiver)
    }

    pub fn connection_id(&self) -> Uuid {
        self.connection_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Signal the owning loop to shut the connection down.
    pub fn close(&self) {
        // notify_one keeps a permit if the loop is not waiting yet.
        self.close.notify_one();
    }

    /// The signal fired by [`ConnectionHandle::close`].
    pub fn close_signal(&self) -> Arc<Notify> {
        self.close.clone()
    }

    /// Non-blocking enqueue onto this connection.
    pub fn send(&self, frame: ServerFrame) -> DeliveryOutcome {
        match self.sender.try_send(frame) {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(mpsc::error::TrySendError::Full(_)) => DeliveryOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::Closed,
        }
    }
}

/// Registry of live connections, shared by every relay loop.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<UserId, ConnectionHandle>>,
    /// Set by `close_all`; read and written only while `connections` is locked.
    closing: AtomicBool,
    /// Relay loops that have not finished teardown yet.
    active_loops: AtomicUsize,
    loops_done: Notify,
}

/// Held by a relay loop until its teardown is complete.
#[derive(Debug)]
pub struct LoopGuard {
    registry: Arc<ConnectionRegistry>,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        if self.registry.active_loops.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.registry.loops_done.notify_waiters();
        }
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `handle` for its user. Returns the superseded connection, which
    /// has already been signalled to close.
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.user_id;
        let connection_id = handle.connection_id;
        let (previous, online) = {
            let mut connections = self.connections.lock();
            if self.closing.load(Ordering::Acquire) {
                drop(connections);
                handle.close();
                tracing::info!(user_id, connection_id = %connection_id, "Registration refused during shutdown");
                return None;
            }
            let previous = connections.insert(user_id, handle);
            (previous, connections.len())
        };

        metrics::record_connection_event("registered");
        metrics::set_online_users(online);

        if let Some(previous) = &previous {
            previous.close();
            metrics::record_connection_event("superseded");
            tracing::info!(
                user_id,
                connection_id = %connection_id,
                superseded = %previous.connection_id,
                "Connection superseded"
            );
        } else {
            tracing::info!(user_id, connection_id = %connection_id, "Connection registered");
        }
        previous
    }

    /// Remove whatever connection `user_id` has. No-op if absent.
    pub fn unregister(&self, user_id: UserId) -> bool {
        let (removed, online) = {
            let mut connections = self.connections.lock();
            let removed = connections.remove(&user_id);
            (removed, connections.len())
        };
        metrics::set_online_users(online);

        match removed {
            Some(handle) => {
                tracing::info!(
                    user_id,
                    connection_id = %handle.connection_id,
                    "Connection unregistered"
                );
                true
            }
            None => false,
        }
    }

    /// Remove the mapping only if it still points at `handle`.
    ///
    /// Used on loop teardown so a superseded connection never evicts the
    /// connection that replaced it.
    pub fn release(&self, handle: &ConnectionHandle) -> bool {
        let (released, online) = {
            let mut connections = self.connections.lock();
            let current = connections
                .get(&handle.user_id)
                .is_some_and(|c| c.connection_id == handle.connection_id);
            if current {
                connections.remove(&handle.user_id);
            }
            (current, connections.len())
        };
        metrics::set_online_users(online);

        if released {
            tracing::info!(
                user_id = handle.user_id,
                connection_id = %handle.connection_id,
                "Connection released"
            );
        }
        released
    }

    /// Attempt live delivery of `frame` to `user_id`. Never blocks.
    pub fn deliver(&self, user_id: UserId, frame: ServerFrame) -> DeliveryOutcome {
        let handle = self.connections.lock().get(&user_id).cloned();

        let outcome = match handle {
            Some(handle) => handle.send(frame),
            None => DeliveryOutcome::Offline,
        };

        metrics::record_delivery(outcome.as_str());
        if !outcome.is_delivered() {
            tracing::debug!(user_id, outcome = outcome.as_str(), "Message not delivered live");
        }
        outcome
    }

    /// Drain the registry and signal every connection to close. Returns the
    /// number of connections signalled. Later registrations are refused.
    pub fn close_all(&self) -> usize {
        let drained: Vec<ConnectionHandle> = {
            let mut connections = self.connections.lock();
            self.closing.store(true, Ordering::Release);
            connections.drain().map(|(_, handle)| handle).collect()
        };
        metrics::set_online_users(0);

        for handle in &drained {
            handle.close();
        }
        tracing::info!(connections = drained.len(), "Closed all connections");
        drained.len()
    }

    /// Count a relay loop as running until the returned guard is dropped.
    pub fn track_loop(self: &Arc<Self>) -> LoopGuard {
        self.active_loops.fetch_add(1, Ordering::AcqRel);
        LoopGuard {
            registry: self.clone(),
        }
    }

    pub fn active_loops(&self) -> usize {
        self.active_loops.load(Ordering::Acquire)
    }

    /// Wait until every tracked relay loop has finished, for at most `limit`.
    /// Returns `false` if loops were still running when the limit expired.
    pub async fn wait_for_loops(&self, limit: Duration) -> bool {
        let all_done = async {
            loop {
                let notified = self.loops_done.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.active_loops() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, all_done).await.is_ok()
    }

    /// Close every connection, refuse new ones and wait up to `grace` for
    /// the relay loops to release their connections and flush their writers.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let closed = self.close_all();
        let drained = self.wait_for_loops(grace).await;
        if drained {
            tracing::info!(connections = closed, "All relay loops finished");
        } else {
            tracing::warn!(
                connections = closed,
                remaining = self.active_loops(),
                "Relay loops still running after shutdown grace period"
            );
        }
        drained
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.connections.lock().contains_key(&user_id)
    }

    pub fn online_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Connection id currently registered for `user_id`.
    pub fn connection_id(&self, user_id: UserId) -> Option<Uuid> {
        self.connections.lock().get(&user_id).map(|c| c.connection_id)
    }
}
