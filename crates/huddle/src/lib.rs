//! Top-level facade crate for Huddle.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use huddle_core::*;
}

pub mod gateway {
    pub use huddle_gateway::*;
}
