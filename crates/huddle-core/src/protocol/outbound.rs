//! Outbound frames.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AdmissionErrorBody, ClientCode, HuddleError, Result};
use crate::model::Message;
use crate::protocol::inbound::SignalKind;

/// Frames sent to clients. Serialized as `{"action": <kebab tag>, "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "payload", rename_all = "kebab-case")]
#[serde(rename_all_fields = "camelCase")]
pub enum Outbound {
    Joined {
        room_id: String,
        user_id: Option<String>,
        participant_count: usize,
        max_participants: usize,
    },
    JoinError(AdmissionErrorBody),
    Left {
        room_id: Option<String>,
    },
    UserJoined {
        user_id: Option<String>,
        participant_count: usize,
    },
    UserLeft {
        user_id: Option<String>,
        participant_count: usize,
    },
    RecentMessages(Vec<Message>),
    ChatMessage(Message),
    SignalOffer(Map<String, Value>),
    SignalAnswer(Map<String, Value>),
    SignalCandidate(Map<String, Value>),
    /// Protocol error, payload is the bare tag (`invalid-json`, ...).
    Error(&'static str),
}

impl Outbound {
    pub fn signal(kind: SignalKind, fields: Map<String, Value>) -> Self {
        match kind {
            SignalKind::Offer => Outbound::SignalOffer(fields),
            SignalKind::Answer => Outbound::SignalAnswer(fields),
            SignalKind::Candidate => Outbound::SignalCandidate(fields),
        }
    }

    pub fn protocol_error(code: ClientCode) -> Self {
        Outbound::Error(code.as_str())
    }

    /// Serialize to the text of one frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| HuddleError::Internal(format!("json encode failed: {e}")))
    }
}
