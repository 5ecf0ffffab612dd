//! Inbound envelopes.
//!
//! Decoding happens in two steps: the frame is parsed into [`Envelope`] with
//! the payload kept as `RawValue`, then the payload is parsed into the shape
//! its action tag expects. Unknown tags are not a parse error; they surface as
//! [`Inbound::Unknown`] so the router can answer them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::{HuddleError, Result};

/// Raw envelope (text frame).
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub action: String,
    /// Payload kept as raw JSON until the action is known.
    #[serde(default)]
    pub payload: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The three WebRTC signaling actions. Their payloads are relayed untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    pub fn action(self) -> &'static str {
        match self {
            SignalKind::Offer => "signal-offer",
            SignalKind::Answer => "signal-answer",
            SignalKind::Candidate => "signal-candidate",
        }
    }
}

/// Opaque signaling payload. Only `roomId` is looked at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalPayload {
    pub fields: Map<String, Value>,
}

impl SignalPayload {
    pub fn room_id(&self) -> Option<&str> {
        self.fields
            .get("roomId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Parsed inbound envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Join(JoinPayload),
    Leave,
    ChatMessage(ChatPayload),
    Signal(SignalKind, SignalPayload),
    /// Well-formed envelope with a tag outside the action set.
    Unknown(String),
}

/// Decode one text frame.
///
/// Returns `HuddleError::InvalidJson` when the frame is not an envelope or
/// the payload does not fit the shape its action requires.
pub fn decode(text: &str) -> Result<Inbound> {
    let env: Envelope = serde_json::from_str(text)
        .map_err(|e| HuddleError::InvalidJson(format!("envelope: {e}")))?;
    env.into_inbound()
}

impl Envelope {
    pub fn into_inbound(self) -> Result<Inbound> {
        let raw = self.payload.as_deref();
        let inbound = match self.action.as_str() {
            "join" => {
                let mut p: JoinPayload = parse_payload(raw)?;
                p.room_id = non_empty(p.room_id);
                p.user_id = non_empty(p.user_id);
                Inbound::Join(p)
            }
            "leave" => Inbound::Leave,
            "chat-message" => {
                let mut p: ChatPayload = parse_payload(raw)?;
                p.room_id = non_empty(p.room_id);
                Inbound::ChatMessage(p)
            }
            "signal-offer" => Inbound::Signal(SignalKind::Offer, parse_signal(raw)?),
            "signal-answer" => Inbound::Signal(SignalKind::Answer, parse_signal(raw)?),
            "signal-candidate" => Inbound::Signal(SignalKind::Candidate, parse_signal(raw)?),
            _ => Inbound::Unknown(self.action),
        };
        Ok(inbound)
    }
}

fn parse_payload<T: DeserializeOwned + Default>(raw: Option<&RawValue>) -> Result<T> {
    match raw {
        None => Ok(T::default()),
        Some(raw) => serde_json::from_str(raw.get())
            .map_err(|e| HuddleError::InvalidJson(format!("payload: {e}"))),
    }
}

fn parse_signal(raw: Option<&RawValue>) -> Result<SignalPayload> {
    let fields = parse_payload::<Map<String, Value>>(raw)?;
    Ok(SignalPayload { fields })
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}
