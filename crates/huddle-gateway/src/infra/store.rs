use std::collections::VecDeque;

use async_trait::async_trait;
use dashmap::DashMap;

use huddle_core::error::Result;
use huddle_core::model::Message;

/// Default number of messages replayed on join.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Chat history persistence.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save(&self, message: Message) -> Result<Message>;

    /// Up to `limit` most recent messages of the room, oldest first.
    async fn get_last(&self, room_id: &str, limit: usize) -> Result<Vec<Message>>;

    async fn clear(&self, room_id: &str) -> Result<()>;
}

/// Process-local store keeping the newest `max_per_room` messages per room.
pub struct InMemoryMessageStore {
    rooms: DashMap<String, VecDeque<Message>>,
    max_per_room: usize,
}

impl InMemoryMessageStore {
    pub fn new(max_per_room: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            max_per_room: max_per_room.max(1),
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: Message) -> Result<Message> {
        let mut log = self.rooms.entry(message.room_id.clone()).or_insert_with(VecDeque::new);
        log.push_back(message.clone());
        while log.len() > self.max_per_room {
            log.pop_front();
        }
        Ok(message)
    }

    async fn get_last(&self, room_id: &str, limit: usize) -> Result<Vec<Message>> {
        let Some(log) = self.rooms.get(room_id) else { return Ok(vec![]) };
        let skip = log.len().saturating_sub(limit);
        Ok(log.iter().skip(skip).cloned().collect())
    }

    async fn clear(&self, room_id: &str) -> Result<()> {
        self.rooms.remove(room_id);
        Ok(())
    }
}
