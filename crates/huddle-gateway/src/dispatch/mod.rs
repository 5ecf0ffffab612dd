//! Message routing.
//!
//! Re-exports the router so transport and tests can depend on this module
//! directly.

pub mod router;

pub use router::MessageRouter;
