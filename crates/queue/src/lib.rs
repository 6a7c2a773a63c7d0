//! Background attachment upload queue.
//!
//! Accepts local files queued by the host application, uploads them to
//! short-lived presigned URLs via a host-supplied transfer executor, confirms
//! completion with the control plane, and survives process restarts and
//! connectivity loss without losing or duplicating work.
//!
//! This crate is **business logic only** — the host provides the
//! [`ControlPlaneClient`] and [`TransferExecutor`] implementations that
//! bridge to its actual HTTP stack, plus a connectivity watch channel.
//!
//! # Lifecycle
//!
//! 1. **Enqueue** — presign the upload target, persist a `Queued` item
//! 2. **Upload** — one item at a time, byte progress re-emitted to subscribers
//! 3. **Confirm** — report transferred bytes to the control plane
//! 4. **Retry** — exponential backoff with jitter on transient failures
//! 5. **Recover** — in-flight items reset to `Queued` after a restart

pub mod client;
pub mod error;
pub mod retry;
pub mod service;

// Re-export primary types for convenience.
pub use client::{ClientError, ControlPlaneClient, PresignGrant, ProgressFn, TransferExecutor};
pub use error::QueueError;
pub use service::UploadQueue;
pub use uplink_types::{
    CompleteEvent, ErrorEvent, ProgressEvent, QueueConfig, QueueItem, QueueStatus, RetryConfig,
    UploadPhase,
};
