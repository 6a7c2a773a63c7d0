//! Shared data model for the attachment upload queue.
//!
//! Pure serde types with no I/O or async dependencies, so the storage and
//! queue crates (and host applications) agree on a single wire shape.

mod config;
mod events;
mod item;

pub use config::{QueueConfig, RetryConfig};
pub use events::{CompleteEvent, ErrorEvent, ProgressEvent};
pub use item::{PersistedQueue, QueueItem, QueueStatus, SNAPSHOT_VERSION, UploadPhase};
