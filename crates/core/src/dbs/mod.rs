//! The client coordination layer of the database.
//!
//! Multiple clients of one application share a single on-disk database and
//! must agree on a unique primary at any moment. This module holds the
//! client records, the lease state machine, and the supporting plumbing:
//! the async task queue, the synchronous side channel, and the window
//! observer.

pub mod client;
pub mod coordinator;
pub mod queue;
pub mod side;
pub mod window;

#[cfg(test)]
mod tests;

pub use self::client::{ClientMetadata, PrimaryClient, Timestamp};
pub use self::coordinator::{
	storage_prefix, Coordinator, CoordinatorOptions, PrimaryStateListener, State,
};
pub use self::queue::{AsyncQueue, DelayedTask, TimerId};
pub use self::side::{MemorySideChannel, SideChannel};
pub use self::window::{ListenerId, ManualWindow, UnloadListener, VisibilityListener, Window};
