//! Feed sync: the workflow and the run state it owns.

pub mod state;
pub mod workflow;

pub use state::{RunGuard, RunSlot};
pub use workflow::{FeedSync, SyncReport};
