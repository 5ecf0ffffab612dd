//! Decode-once codec for the transport layer.
//!
//! - Text frames => parsed envelope (or the parse error, answered as `invalid-json`)
//! - Binary frames => decoded like text when they are UTF-8, else `invalid-json`
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use huddle_core::{
    error::{HuddleError, Result},
    protocol::{self, Inbound},
};

#[derive(Debug)]
pub enum Frame {
    Envelope(Result<Inbound>),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> Frame {
    match msg {
        Message::Text(s) => Frame::Envelope(protocol::decode(&s)),
        Message::Binary(b) => match std::str::from_utf8(&b) {
            Ok(s) => Frame::Envelope(protocol::decode(s)),
            Err(_) => Frame::Envelope(Err(HuddleError::InvalidJson(
                "binary frame is not utf-8".into(),
            ))),
        },
        Message::Ping(v) => Frame::Ping(v),
        Message::Pong(_) => Frame::Pong,
        Message::Close(_) => Frame::Close,
    }
}
