//! Records exchanged between the router, the message store and the meeting
//! authority.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sender id used when neither the payload nor the connection carries one.
pub const ANONYMOUS: &str = "anonymous";

/// Message kind produced by the chat path.
pub const CHAT_KIND: &str = "chat";

/// A persisted chat record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub room_id: String,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw text as sent. Escaping is left to whoever renders it.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a chat message with a fresh id.
    pub fn chat(
        room_id: impl Into<String>,
        sender_id: Option<String>,
        sender_name: Option<String>,
        content: impl Into<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender_id: sender_id
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| ANONYMOUS.to_string()),
            sender_name,
            kind: CHAT_KIND.to_string(),
            content: content.into(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Meeting record owned by the external authority. Read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingInfo {
    #[serde(default)]
    pub room_id: String,
    pub is_active: bool,
    pub max_participants: usize,
    /// Count last reported to the authority. Informational only.
    #[serde(default)]
    pub participant_count: usize,
}
