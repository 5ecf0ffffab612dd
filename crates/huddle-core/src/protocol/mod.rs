//! Wire protocol: one JSON object per text frame, `{"action", "payload"}`.
//!
//! - Inbound: raw envelope with a lazily parsed `RawValue` payload, then a
//!   tagged union over the fixed action set (`inbound`).
//! - Outbound: a serde-tagged enum serialized once per fan-out (`outbound`).
//!
//! All parsers are panic-free: malformed input is reported as `HuddleError`
//! instead of panicking, keeping the gateway resilient to hostile traffic.

pub mod inbound;
pub mod outbound;

pub use inbound::{decode, ChatPayload, Envelope, Inbound, JoinPayload, SignalKind, SignalPayload};
pub use outbound::Outbound;
