use std::sync::Arc;

use serde_json::Value;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use huddle_core::error::{HuddleError, Result};
use huddle_core::model::{Message, ANONYMOUS};
use huddle_core::protocol::{self, ChatPayload, Inbound, Outbound, SignalKind, SignalPayload};

use crate::infra::MessageStore;
use crate::realtime::{AdmissionController, Broadcaster, Connection, RoomDirectory};

/// Per-envelope dispatch table keyed by action.
///
/// Stateless between envelopes: everything a handler needs about the
/// connection comes from the handle or the room directory.
pub struct MessageRouter {
    directory: Arc<RoomDirectory>,
    broadcaster: Arc<Broadcaster>,
    admission: Arc<AdmissionController>,
    store: Arc<dyn MessageStore>,
    store_timeout: Duration,
}

impl MessageRouter {
    pub fn new(
        directory: Arc<RoomDirectory>,
        broadcaster: Arc<Broadcaster>,
        admission: Arc<AdmissionController>,
        store: Arc<dyn MessageStore>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            broadcaster,
            admission,
            store,
            store_timeout,
        }
    }

    /// Handle one raw text frame.
    pub async fn handle_text(&self, conn: &Connection, raw: &str) {
        self.handle_decoded(conn, protocol::decode(raw)).await
    }

    /// Handle an already decoded frame. Errors become `error` frames; the
    /// connection is never closed from here.
    pub async fn handle_decoded(&self, conn: &Connection, decoded: Result<Inbound>) {
        let res = match decoded {
            Ok(inbound) => self.dispatch(conn, inbound).await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            debug!(conn_id = conn.id(), error = %e, "envelope rejected");
            self.broadcaster
                .send_to(conn, &Outbound::protocol_error(e.client_code()))
                .await;
        }
    }

    pub async fn dispatch(&self, conn: &Connection, inbound: Inbound) -> Result<()> {
        match inbound {
            Inbound::Join(req) => {
                if let Err(e) = self.admission.join(conn, req).await {
                    debug!(conn_id = conn.id(), code = e.code(), "join rejected");
                    self.broadcaster
                        .send_to(conn, &Outbound::JoinError(e.body()))
                        .await;
                }
                Ok(())
            }
            Inbound::Leave => {
                self.admission.leave(conn, true).await;
                Ok(())
            }
            Inbound::ChatMessage(p) => self.chat(conn, p).await,
            Inbound::Signal(kind, p) => self.relay_signal(conn, kind, p).await,
            Inbound::Unknown(action) => Err(HuddleError::UnknownAction(action)),
        }
    }

    /// Transport-level disconnect: leave without acknowledgement.
    pub async fn disconnect(&self, conn: &Connection) {
        self.admission.leave(conn, false).await;
    }

    /// The connection's current room, else the one named in the payload.
    fn resolve_room(&self, conn: &Connection, payload_room: Option<&str>) -> Result<String> {
        self.directory
            .room_of(conn.id())
            .or_else(|| payload_room.map(str::to_string))
            .ok_or(HuddleError::NoRoom)
    }

    async fn chat(&self, conn: &Connection, p: ChatPayload) -> Result<()> {
        let room_id = self.resolve_room(conn, p.room_id.as_deref())?;

        let sender_id = p
            .sender_id
            .filter(|s| !s.is_empty())
            .or_else(|| conn.identity().map(str::to_string));
        let message = Message::chat(room_id, sender_id, p.sender_name, p.text, p.timestamp);

        let message = match timeout(self.store_timeout, self.store.save(message.clone())).await {
            Ok(Ok(saved)) => saved,
            Ok(Err(e)) => {
                warn!(room_id = %message.room_id, error = %e, "message persist failed");
                message
            }
            Err(_) => {
                warn!(room_id = %message.room_id, "message persist timed out");
                message
            }
        };

        let room_id = message.room_id.clone();
        self.broadcaster
            .broadcast_to_room(&room_id, &Outbound::ChatMessage(message), None)
            .await;
        Ok(())
    }

    async fn relay_signal(&self, conn: &Connection, kind: SignalKind, p: SignalPayload) -> Result<()> {
        let room_id = self.resolve_room(conn, p.room_id())?;

        let mut fields = p.fields;
        let from = conn.identity().unwrap_or(ANONYMOUS).to_string();
        fields.insert("from".into(), Value::String(from));

        self.broadcaster
            .broadcast_to_room(&room_id, &Outbound::signal(kind, fields), Some(conn.id()))
            .await;
        Ok(())
    }
}
