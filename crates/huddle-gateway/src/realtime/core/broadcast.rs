use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{timeout, Duration};

use huddle_core::protocol::Outbound;

use crate::realtime::core::{ConnId, Connection, RoomDirectory};
use crate::realtime::types::PreparedMsg;

/// Broadcast engine: send to one connection / fan out to a room.
///
/// Delivery is fire-and-forget per recipient. A slow or closed recipient is
/// logged and skipped; it never fails the operation that triggered the send.
pub struct Broadcaster {
    directory: Arc<RoomDirectory>,
    send_timeout: Duration,
}

impl Broadcaster {
    pub fn new(directory: Arc<RoomDirectory>, send_timeout: Duration) -> Self {
        Self {
            directory,
            send_timeout,
        }
    }

    /// Direct reply to a single connection. Returns whether it was queued.
    pub async fn send_to(&self, conn: &Connection, out: &Outbound) -> bool {
        let prepared = match PreparedMsg::prepare(out) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "outbound encode failed");
                return false;
            }
        };
        deliver(conn, prepared.to_ws_message(), self.send_timeout).await
    }

    /// Serialize once and deliver to every open member of the room at the
    /// instant of the call. Returns the number of recipients reached.
    pub async fn broadcast_to_room(
        &self,
        room_id: &str,
        out: &Outbound,
        excluding: Option<ConnId>,
    ) -> usize {
        let prepared = match PreparedMsg::prepare(out) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(room_id, error = %e, "outbound encode failed");
                return 0;
            }
        };

        let members = self.directory.members_of(room_id, excluding);
        let send_timeout = self.send_timeout;

        let mut futs = FuturesUnordered::new();
        for conn in members.into_iter().filter(Connection::is_open) {
            let msg = prepared.to_ws_message();
            futs.push(async move { deliver(&conn, msg, send_timeout).await });
        }

        let mut delivered = 0;
        while let Some(ok) = futs.next().await {
            if ok {
                delivered += 1;
            }
        }
        delivered
    }
}

/// try_send first; if the queue is full, wait up to `send_timeout`.
async fn deliver(conn: &Connection, msg: Message, send_timeout: Duration) -> bool {
    match conn.sender().try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(msg)) => match timeout(send_timeout, conn.sender().send(msg)).await {
            Ok(Ok(())) => true,
            Ok(Err(_)) => {
                tracing::debug!(conn_id = conn.id(), "recipient closed during send");
                false
            }
            Err(_) => {
                tracing::debug!(conn_id = conn.id(), "recipient queue full, frame dropped");
                false
            }
        },
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(conn_id = conn.id(), "recipient closed");
            false
        }
    }
}
