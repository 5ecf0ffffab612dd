//! Join and leave sequencing.
//!
//! A join is checked against the meeting authority (exists, active, capacity)
//! and then against the live room count. The count check and the registration
//! run as one critical section in the room directory, so joins racing through
//! the authority round trip cannot overfill a room.

use std::sync::Arc;

use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use huddle_core::error::AdmissionError;
use huddle_core::protocol::{JoinPayload, Outbound};

use crate::infra::{MeetingAuthority, MessageStore};
use crate::realtime::core::{Broadcaster, Connection, Departure, RegisterError, RoomDirectory};

#[derive(Debug, Clone)]
pub struct AdmissionSettings {
    /// Bound for every authority and store call.
    pub remote_timeout: Duration,
    /// Messages replayed to a joining connection.
    pub history_limit: usize,
}

/// Outcome of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub room_id: String,
    pub participant_count: usize,
    pub max_participants: usize,
}

pub struct AdmissionController {
    directory: Arc<RoomDirectory>,
    broadcaster: Arc<Broadcaster>,
    authority: Arc<dyn MeetingAuthority>,
    store: Arc<dyn MessageStore>,
    settings: AdmissionSettings,
}

impl AdmissionController {
    pub fn new(
        directory: Arc<RoomDirectory>,
        broadcaster: Arc<Broadcaster>,
        authority: Arc<dyn MeetingAuthority>,
        store: Arc<dyn MessageStore>,
        settings: AdmissionSettings,
    ) -> Self {
        Self {
            directory,
            broadcaster,
            authority,
            store,
            settings,
        }
    }

    /// Run the join sequence. On success the joiner has already been sent
    /// `joined` and its history; the caller only reports rejections.
    pub async fn join(
        &self,
        conn: &Connection,
        req: JoinPayload,
    ) -> Result<Admitted, AdmissionError> {
        let room_id = req.room_id.ok_or(AdmissionError::RoomIdRequired)?;

        // 1) authority
        let meeting = match timeout(self.settings.remote_timeout, self.authority.get_meeting(&room_id)).await {
            Ok(Ok(Some(m))) => m,
            Ok(Ok(None)) => return Err(AdmissionError::MeetingNotFound),
            Ok(Err(e)) => {
                warn!(room_id = %room_id, error = %e, "meeting lookup failed");
                return Err(AdmissionError::ServerError);
            }
            Err(_) => {
                warn!(room_id = %room_id, "meeting lookup timed out");
                return Err(AdmissionError::ServerError);
            }
        };
        if !meeting.is_active {
            return Err(AdmissionError::MeetingInactive);
        }
        let max = meeting.max_participants;

        // 2+3) capacity + register, atomically per room. A switch leaves the
        // old room only after the new one accepted the connection.
        let registered = match self.directory.room_of(conn.id()) {
            Some(current) if current == room_id => {
                let admitted = Admitted {
                    participant_count: self.directory.count_in(&room_id),
                    room_id,
                    max_participants: max,
                };
                self.send_joined(conn, &admitted).await;
                return Ok(admitted);
            }
            Some(_) => self
                .directory
                .try_move(conn, &room_id, max)
                .map(|m| (m.participant_count, m.departed)),
            None => self
                .directory
                .try_register(conn, &room_id, max)
                .map(|n| (n, None)),
        };
        let (participant_count, departed) = match registered {
            Ok(r) => r,
            Err(RegisterError::Full { current, max }) => {
                return Err(AdmissionError::MeetingFull { current, max });
            }
            Err(RegisterError::AlreadyRegistered { room_id: other }) => {
                // Only reachable if this connection's own frames were handled
                // out of order.
                warn!(conn_id = conn.id(), room_id = %other, "join while still registered");
                return Err(AdmissionError::ServerError);
            }
        };
        if let Some(d) = &departed {
            self.announce_departure(conn, d).await;
        }
        if let Some(user_id) = req.user_id {
            if !conn.assign_identity(user_id) {
                debug!(conn_id = conn.id(), "identity already set, join userId ignored");
            }
        }
        info!(conn_id = conn.id(), room_id = %room_id, participant_count, max, "joined");

        let admitted = Admitted {
            room_id,
            participant_count,
            max_participants: max,
        };

        // 4) tell everyone else
        let notice = Outbound::UserJoined {
            user_id: conn.identity().map(str::to_string),
            participant_count,
        };
        self.broadcaster
            .broadcast_to_room(&admitted.room_id, &notice, Some(conn.id()))
            .await;

        // 5) confirm
        self.send_joined(conn, &admitted).await;

        // 6) history, joiner only
        self.send_history(conn, &admitted.room_id).await;

        // 7) best-effort
        self.report_participant_count(admitted.room_id.clone(), participant_count);

        Ok(admitted)
    }

    /// Leave the current room, if any. `ack` sends `left` to the connection
    /// (explicit leave); disconnects pass `false`. Safe to call repeatedly.
    pub async fn leave(&self, conn: &Connection, ack: bool) -> Option<Departure> {
        let departure = self.directory.unregister(conn.id());

        if let Some(d) = &departure {
            self.announce_departure(conn, d).await;
        }

        if ack {
            let left = Outbound::Left {
                room_id: departure.as_ref().map(|d| d.room_id.clone()),
            };
            self.broadcaster.send_to(conn, &left).await;
        }

        departure
    }

    /// Fire-and-forget count report to the authority.
    ///
    /// Runs on its own task and never reports back: a failure or timeout is
    /// logged and does not affect the join or leave that triggered it.
    pub fn report_participant_count(&self, room_id: String, count: usize) {
        let authority = Arc::clone(&self.authority);
        let limit = self.settings.remote_timeout;
        tokio::spawn(async move {
            match timeout(limit, authority.update_participant_count(&room_id, count)).await {
                Ok(Ok(())) => debug!(room_id = %room_id, count, "participant count reported"),
                Ok(Err(e)) => warn!(room_id = %room_id, count, error = %e, "participant count report failed"),
                Err(_) => warn!(room_id = %room_id, count, "participant count report timed out"),
            }
        });
    }

    /// `user-left` to the remaining members plus a count report.
    async fn announce_departure(&self, conn: &Connection, d: &Departure) {
        info!(conn_id = conn.id(), room_id = %d.room_id, remaining = d.remaining, "left");
        let notice = Outbound::UserLeft {
            user_id: conn.identity().map(str::to_string),
            participant_count: d.remaining,
        };
        self.broadcaster.broadcast_to_room(&d.room_id, &notice, None).await;
        self.report_participant_count(d.room_id.clone(), d.remaining);
    }

    async fn send_joined(&self, conn: &Connection, admitted: &Admitted) {
        let joined = Outbound::Joined {
            room_id: admitted.room_id.clone(),
            user_id: conn.identity().map(str::to_string),
            participant_count: admitted.participant_count,
            max_participants: admitted.max_participants,
        };
        self.broadcaster.send_to(conn, &joined).await;
    }

    async fn send_history(&self, conn: &Connection, room_id: &str) {
        let limit = self.settings.history_limit;
        match timeout(self.settings.remote_timeout, self.store.get_last(room_id, limit)).await {
            Ok(Ok(messages)) if messages.is_empty() => {}
            Ok(Ok(messages)) => {
                self.broadcaster
                    .send_to(conn, &Outbound::RecentMessages(messages))
                    .await;
            }
            Ok(Err(e)) => warn!(room_id, error = %e, "history fetch failed"),
            Err(_) => warn!(room_id, "history fetch timed out"),
        }
    }
}
