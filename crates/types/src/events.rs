//! Event payloads emitted to queue subscribers.
//!
//! Payloads are owned snapshots — subscribers never receive a reference to
//! the live item.

use serde::Serialize;

use crate::item::UploadPhase;

/// Emitted on every item mutation: phase changes and byte-progress updates.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub attachment_id: String,
    pub phase: UploadPhase,
    /// Fraction in [0.0, 1.0].
    pub progress: f64,
    /// Latest error text, while failed or awaiting a retry.
    pub error: Option<String>,
}

/// Emitted once when an item reaches `Completed`.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteEvent {
    pub attachment_id: String,
}

/// Emitted once when an item reaches `Failed`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEvent {
    pub attachment_id: String,
    pub error: String,
}
