//! Shared error types across Huddle crates.

use serde::Serialize;
use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Frame could not be parsed as an envelope.
    InvalidJson,
    /// Envelope carried an action tag outside the fixed set.
    UnknownAction,
    /// No room could be resolved for a room-scoped action.
    NoRoom,
    /// Invalid configuration or request.
    BadRequest,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::InvalidJson => "invalid-json",
            ClientCode::UnknownAction => "unknown-action",
            ClientCode::NoRoom => "no-room",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, HuddleError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("no room resolved")]
    NoRoom,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl HuddleError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            HuddleError::InvalidJson(_) => ClientCode::InvalidJson,
            HuddleError::UnknownAction(_) => ClientCode::UnknownAction,
            HuddleError::NoRoom => ClientCode::NoRoom,
            HuddleError::BadRequest(_) => ClientCode::BadRequest,
            HuddleError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            HuddleError::Upstream(_) | HuddleError::Internal(_) => ClientCode::Internal,
        }
    }
}

/// Join rejections. Each maps to a stable code shown to the client in a
/// `join-error` frame; the connection stays usable for a retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("roomId is required")]
    RoomIdRequired,
    #[error("meeting not found")]
    MeetingNotFound,
    #[error("meeting is not active")]
    MeetingInactive,
    #[error("meeting is full ({current}/{max})")]
    MeetingFull { current: usize, max: usize },
    #[error("could not verify meeting, try again later")]
    ServerError,
}

impl AdmissionError {
    pub fn code(&self) -> &'static str {
        match self {
            AdmissionError::RoomIdRequired => "ROOMID_REQUIRED",
            AdmissionError::MeetingNotFound => "MEETING_NOT_FOUND",
            AdmissionError::MeetingInactive => "MEETING_INACTIVE",
            AdmissionError::MeetingFull { .. } => "MEETING_FULL",
            AdmissionError::ServerError => "SERVER_ERROR",
        }
    }

    /// Body of the `join-error` frame.
    pub fn body(&self) -> AdmissionErrorBody {
        let (current, max) = match self {
            AdmissionError::MeetingFull { current, max } => (Some(*current), Some(*max)),
            _ => (None, None),
        };
        AdmissionErrorBody {
            message: self.to_string(),
            code: self.code(),
            current,
            max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionErrorBody {
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<usize>,
}
