//! Queue item lifecycle record and derived status.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version of the persisted snapshot envelope. Snapshots carrying any other
/// version are treated as unreadable and reset.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Lifecycle phase of a queue item.
///
/// Linear state machine with two absorbing states:
/// `Queued → Uploading → Confirming → Completed`, where `Uploading` and
/// `Confirming` may fall back to `Queued` (retry scheduled) or advance to
/// `Failed` (attempts exhausted or upload URL expired).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Queued,
    Uploading,
    Confirming,
    Completed,
    Failed,
}

impl UploadPhase {
    /// `true` for `Completed` and `Failed` — no automatic transition leaves
    /// these phases.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Completed | UploadPhase::Failed)
    }

    /// `true` while an attempt is on the wire (`Uploading` or `Confirming`).
    /// Items found in these phases at startup are reset to `Queued`.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, UploadPhase::Uploading | UploadPhase::Confirming)
    }
}

/// One attachment's upload lifecycle record.
///
/// Created only by `enqueue`; mutated only by the processing loop, the
/// connectivity pause handler, and the explicit retry/cancel/clear
/// operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    /// Process-local queue id. Orders the processing loop (lowest first).
    pub queue_id: u64,
    /// Server-assigned attachment id, used for all external addressing.
    pub attachment_id: String,

    pub local_path: PathBuf,
    pub mime_type: String,
    pub file_name: String,
    pub file_size: u64,

    /// Presigned upload target. Replaced only by re-enqueuing.
    pub upload_url: String,
    pub upload_expires_at: DateTime<Utc>,

    pub phase: UploadPhase,
    /// Fraction in [0.0, 1.0], monotone within an attempt, reset to 0 when a
    /// new attempt starts.
    pub progress: f64,
    pub attempt: u32,
    pub max_attempts: u32,
    /// Present only while failed or awaiting a retry.
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Earliest instant the next attempt may start. Implements backoff
    /// without blocking the loop.
    pub retry_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// Creates a fresh item in phase `Queued`, attempt 0.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue_id: u64,
        attachment_id: String,
        local_path: PathBuf,
        mime_type: &str,
        file_name: &str,
        file_size: u64,
        upload_url: String,
        upload_expires_at: DateTime<Utc>,
        max_attempts: u32,
    ) -> Self {
        Self {
            queue_id,
            attachment_id,
            local_path,
            mime_type: mime_type.to_string(),
            file_name: file_name.to_string(),
            file_size,
            upload_url,
            upload_expires_at,
            phase: UploadPhase::Queued,
            progress: 0.0,
            attempt: 0,
            max_attempts,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_at: None,
        }
    }

    /// `true` if the item is `Queued` and its scheduled retry (if any) is due
    /// at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.phase == UploadPhase::Queued && self.retry_at.is_none_or(|t| t <= now)
    }
}

/// Read-only aggregate over the live item set. Never persisted, always
/// recomputed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub uploading: usize,
    pub confirming: usize,
    pub completed: usize,
    pub failed: usize,
    pub paused: bool,
}

impl QueueStatus {
    /// Tallies phase counts over `items`.
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a QueueItem>, paused: bool) -> Self {
        let mut status = QueueStatus {
            paused,
            ..Default::default()
        };
        for item in items {
            match item.phase {
                UploadPhase::Queued => status.queued += 1,
                UploadPhase::Uploading => status.uploading += 1,
                UploadPhase::Confirming => status.confirming += 1,
                UploadPhase::Completed => status.completed += 1,
                UploadPhase::Failed => status.failed += 1,
            }
        }
        status
    }

    /// Items that still need work (everything non-terminal).
    pub fn pending(&self) -> usize {
        self.queued + self.uploading + self.confirming
    }
}

/// Versioned snapshot envelope written to storage on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedQueue {
    pub version: u32,
    pub items: Vec<QueueItem>,
}
