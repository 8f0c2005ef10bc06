//! Durable work queue for the moderation worker.
//!
//! Pending items and processing markers live in a [`QueueStore`]. The file
//! backed store rewrites its JSON-lines file atomically on every mutation so
//! a crash never loses or half-writes an entry.

pub mod error;
pub mod events;
pub mod file_store;
pub mod fs_utils;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use events::{BroadcastEventSink, EventSink, NullEventSink, TracingEventSink};
pub use file_store::FileQueueStore;
pub use store::{MemoryQueueStore, QueueState, QueueStore};
