//! Message Relay
//!
//! Owns one connection's receive loop. Each inbound unit is stamped with the
//! connection's identity, persisted, and only then handed to the registry for
//! every other member of the chat. Per-message failures are reported to the
//! sender as error frames and the loop carries on; transport failures end it.
//!
//! Outbound frames go through the connection's bounded queue and a dedicated
//! writer task, so the receive loop never waits on a socket write.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio::time::timeout;

use super::messages::{InboundMessage, MessagePayload, ServerFrame};
use super::registry::{ConnectionHandle, ConnectionRegistry};
use crate::application::services::MessageService;
use crate::config::WebSocketSettings;
use crate::domain::UserId;
use crate::infrastructure::metrics;

/// Everything a relay loop needs besides its socket.
#[derive(Clone)]
pub struct RelayContext {
    pub registry: Arc<ConnectionRegistry>,
    pub service: Arc<dyn MessageService>,
    pub outbound_queue_capacity: usize,
    pub send_timeout: Duration,
}

impl RelayContext {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        service: Arc<dyn MessageService>,
        settings: &WebSocketSettings,
    ) -> Self {
        Self {
            registry,
            service,
            outbound_queue_capacity: settings.outbound_queue_capacity,
            send_timeout: Duration::from_millis(settings.send_timeout_ms),
        }
    }
}

/// Run the connection for `user_id` until the client leaves, the transport
/// fails, or the connection is superseded or shut down.
///
/// On every exit path the connection is released from the registry and its
/// writer is given `send_timeout` to flush before being aborted. Release only
/// removes the mapping while it still points at this connection, so a loop
/// that was superseded never evicts its successor.
///
/// The loop is tracked by the registry until teardown finishes, which lets
/// shutdown wait for it.
pub async fn run_connection<R, E, W>(user_id: UserId, mut reader: R, writer: W, ctx: RelayContext)
where
    R: Stream<Item = Result<Message, E>> + Unpin + Send,
    E: Display + Send,
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
{
    let _tracked = ctx.registry.track_loop();
    let (handle, queue) = ConnectionHandle::new(user_id, ctx.outbound_queue_capacity);
    let close = handle.close_signal();
    let connection_id = handle.connection_id();

    ctx.registry.register(handle.clone());
    let mut writer_task = tokio::spawn(write_frames(writer, queue, close.clone(), ctx.send_timeout));

    loop {
        tokio::select! {
            _ = close.notified() => {
                tracing::debug!(user_id, connection_id = %connection_id, "Close requested");
                break;
            }
            inbound = reader.next() => match inbound {
                Some(Ok(Message::Text(text))) => relay_text(&ctx, &handle, text.as_str()).await,
                Some(Ok(Message::Binary(_))) => {
                    reject(&handle, "malformed", "binary frames are not supported");
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::debug!(user_id, connection_id = %connection_id, "Connection closed");
                    break;
                }
                // Ping/pong are answered by the transport.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(user_id, connection_id = %connection_id, error = %e, "Transport error");
                    break;
                }
            },
        }
    }

    ctx.registry.release(&handle);
    drop(handle);
    if timeout(ctx.send_timeout, &mut writer_task).await.is_err() {
        writer_task.abort();
    }
    tracing::info!(user_id, connection_id = %connection_id, "Connection ended");
}

async fn relay_text(ctx: &RelayContext, handle: &ConnectionHandle, text: &str) {
    let inbound = match InboundMessage::parse(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            tracing::debug!(user_id = handle.user_id(), error = %e, "Malformed message");
            reject(handle, "malformed", e.to_string());
            return;
        }
    };

    let relayed = match ctx.service.relay(handle.user_id(), inbound.into()).await {
        Ok(relayed) => relayed,
        Err(e) => {
            tracing::debug!(user_id = handle.user_id(), code = e.code(), error = %e, "Message rejected");
            reject(handle, e.code(), e.to_string());
            return;
        }
    };

    let payload = MessagePayload::from(&relayed.message);
    for recipient in relayed.recipients {
        ctx.registry
            .deliver(recipient, ServerFrame::Message(payload.clone()));
    }

    let chat_id = payload.chat_id;
    if !handle.send(ServerFrame::Ack(payload)).is_delivered() {
        tracing::debug!(user_id = handle.user_id(), chat_id, "Ack dropped");
    }
}

fn reject(handle: &ConnectionHandle, code: &str, message: impl Into<String>) {
    metrics::record_relay_failure(code);
    handle.send(ServerFrame::error(code, message));
}

/// Drain the outbound queue into the socket. A failed or timed-out write
/// fires `close` so the receive loop tears the connection down.
async fn write_frames<W>(
    mut writer: W,
    mut queue: mpsc::Receiver<ServerFrame>,
    close: Arc<Notify>,
    send_timeout: Duration,
) where
    W: Sink<Message> + Unpin + Send,
    W::Error: Display,
{
    while let Some(frame) = queue.recv().await {
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize frame");
                continue;
            }
        };

        match timeout(send_timeout, writer.send(Message::Text(text.into()))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Socket write failed");
                close.notify_one();
                return;
            }
            Err(_) => {
                tracing::warn!("Socket write timed out");
                close.notify_one();
                return;
            }
        }
    }

    let _ = timeout(send_timeout, writer.close()).await;
}
