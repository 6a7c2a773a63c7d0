//! Queue error types.

use crate::client::ClientError;

/// Errors surfaced by the upload queue's public operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue not initialized")]
    NotInitialized,

    #[error("queue full: {0} pending item(s)")]
    QueueFull(usize),

    #[error("no queue item for attachment: {0}")]
    NotFound(String),

    #[error("item is not in a failed state: {0}")]
    NotFailed(String),

    #[error("presign failed: {0}")]
    Presign(#[source] ClientError),
}
