//! External collaborators consumed by the realtime core.
//!
//! - `authority`: meeting existence/activity/capacity, participant-count reports.
//! - `store`: chat history persistence.

pub mod authority;
pub mod store;

pub use authority::{HttpMeetingAuthority, MeetingAuthority};
pub use store::{InMemoryMessageStore, MessageStore};
