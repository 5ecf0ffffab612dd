use axum::extract::ws::Message;

use huddle_core::error::Result;
use huddle_core::protocol::Outbound;

/// Frame serialized once for a fan-out (serialize once, send N times).
#[derive(Debug, Clone)]
pub struct PreparedMsg(String);

impl PreparedMsg {
    pub fn prepare(out: &Outbound) -> Result<Self> {
        out.encode().map(PreparedMsg)
    }

    /// Convert to axum::ws::Message for transport.
    pub fn to_ws_message(&self) -> Message {
        Message::Text(self.0.clone())
    }
}
