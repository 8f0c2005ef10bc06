//! Record storage for the moderation pipeline.
//!
//! The pipeline talks to storage only through [`RecordStore`]. The bundled
//! [`MemoryRecordStore`] keeps records in memory and can snapshot them to a
//! JSON file so they survive restarts.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryRecordStore;
pub use store::RecordStore;
