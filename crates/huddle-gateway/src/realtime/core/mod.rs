//! Realtime core components for the gateway runtime.
//!
//! Connection handles, the room directory, and the broadcast engine shared by
//! the admission controller and the message router.

mod broadcast;
mod connection;
mod room_directory;

pub use broadcast::Broadcaster;
pub use connection::{ConnId, Connection};
pub use room_directory::{Departure, Moved, RegisterError, RoomDirectory};
