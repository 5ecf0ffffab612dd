//! Huddle gateway library entry.
//!
//! This crate wires the transport, message router, admission controller,
//! realtime core, and external collaborators into a cohesive relay stack. It
//! is intended to be consumed by the binary (`main.rs`) and by integration
//! tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod infra;
pub mod ops;
pub mod realtime;
pub mod router;
pub mod transport;
