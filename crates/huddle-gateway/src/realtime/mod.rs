//! Realtime runtime for the Huddle gateway.
//!
//! Room directory + broadcast engine (egress) and the admission controller
//! that sequences joins and leaves against them.

pub mod admission;
pub mod core;
pub mod types;

pub use admission::{AdmissionController, AdmissionSettings, Admitted};
pub use core::{Broadcaster, ConnId, Connection, Departure, Moved, RegisterError, RoomDirectory};
pub use types::PreparedMsg;
