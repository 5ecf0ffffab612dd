use std::collections::HashMap;

use dashmap::DashMap;
use thiserror::Error;

use super::connection::{ConnId, Connection};

/// Live room membership: room_id -> connections, conn_id -> room_id.
///
/// Lock order is always `rooms` before `memberships`; no path holds a
/// `memberships` guard while touching `rooms`.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: DashMap<String, HashMap<ConnId, Connection>>,
    memberships: DashMap<ConnId, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("connection already registered in room {room_id}")]
    AlreadyRegistered { room_id: String },
    #[error("room full ({current}/{max})")]
    Full { current: usize, max: usize },
}

/// Result of removing a connection from its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: String,
    /// Members left in the room after the removal.
    pub remaining: usize,
}

/// Result of moving a connection into a new room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Moved {
    /// Member count of the new room, including the mover.
    pub participant_count: usize,
    /// The room the connection left, if it was in one.
    pub departed: Option<Departure>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Returns the new member count.
    pub fn register(&self, conn: &Connection, room_id: &str) -> Result<usize, RegisterError> {
        self.insert(conn, room_id, None)
    }

    /// Count-check and register in one critical section on the room's shard.
    ///
    /// Concurrent callers for the same room are serialized here, so the room
    /// never grows past `max`.
    pub fn try_register(
        &self,
        conn: &Connection,
        room_id: &str,
        max: usize,
    ) -> Result<usize, RegisterError> {
        self.insert(conn, room_id, Some(max))
    }

    fn insert(
        &self,
        conn: &Connection,
        room_id: &str,
        max: Option<usize>,
    ) -> Result<usize, RegisterError> {
        if let Some(current) = self.memberships.get(&conn.id()) {
            return Err(RegisterError::AlreadyRegistered {
                room_id: current.value().clone(),
            });
        }

        let mut members = self.rooms.entry(room_id.to_string()).or_insert_with(HashMap::new);
        if let Some(max) = max {
            let current = members.len();
            if current >= max {
                drop(members);
                self.rooms.remove_if(room_id, |_, m| m.is_empty());
                return Err(RegisterError::Full { current, max });
            }
        }

        members.insert(conn.id(), conn.clone());
        let count = members.len();
        self.memberships.insert(conn.id(), room_id.to_string());
        Ok(count)
    }

    /// Move a connection into `room_id`, leaving its current room only once
    /// the new room has accepted it.
    ///
    /// The capacity check, the insert and the membership switch happen under
    /// the target room's shard lock. A refused move changes nothing.
    pub fn try_move(
        &self,
        conn: &Connection,
        room_id: &str,
        max: usize,
    ) -> Result<Moved, RegisterError> {
        let from = self.room_of(conn.id());
        if from.as_deref() == Some(room_id) {
            return Err(RegisterError::AlreadyRegistered {
                room_id: room_id.to_string(),
            });
        }

        let mut members = self.rooms.entry(room_id.to_string()).or_insert_with(HashMap::new);
        let current = members.len();
        if current >= max {
            drop(members);
            self.rooms.remove_if(room_id, |_, m| m.is_empty());
            return Err(RegisterError::Full { current, max });
        }
        members.insert(conn.id(), conn.clone());
        let participant_count = members.len();
        self.memberships.insert(conn.id(), room_id.to_string());
        drop(members);

        let departed = from.map(|old| {
            let remaining = self.remove_member(&old, conn.id());
            Departure {
                room_id: old,
                remaining,
            }
        });

        Ok(Moved {
            participant_count,
            departed,
        })
    }

    /// Remove a connection from whatever room it is in. `None` if it was in none.
    pub fn unregister(&self, conn_id: ConnId) -> Option<Departure> {
        let (_, room_id) = self.memberships.remove(&conn_id)?;
        let remaining = self.remove_member(&room_id, conn_id);
        Some(Departure { room_id, remaining })
    }

    /// Drop `conn_id` from the room's member set; empty rooms are removed.
    fn remove_member(&self, room_id: &str, conn_id: ConnId) -> usize {
        let remaining = match self.rooms.get_mut(room_id) {
            Some(mut members) => {
                members.remove(&conn_id);
                members.len()
            }
            None => 0,
        };
        self.rooms.remove_if(room_id, |_, m| m.is_empty());
        remaining
    }

    pub fn count_in(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Snapshot of the room's members, optionally without one connection.
    pub fn members_of(&self, room_id: &str, excluding: Option<ConnId>) -> Vec<Connection> {
        self.rooms
            .get(room_id)
            .map(|m| {
                m.values()
                    .filter(|c| Some(c.id()) != excluding)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn room_of(&self, conn_id: ConnId) -> Option<String> {
        self.memberships.get(&conn_id).map(|r| r.value().clone())
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
