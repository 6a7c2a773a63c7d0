//! Upload queue service: state machine, sequential processor, pause/resume.
//!
//! One explicitly constructed [`UploadQueue`] handle owns the in-memory item
//! map, drives sequential processing (one transfer on the wire at a time),
//! persists a snapshot after every state transition, and fans events out to
//! subscribers over broadcast channels.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use uplink_storage::QueueStore;
use uplink_types::{
    CompleteEvent, ErrorEvent, ProgressEvent, QueueConfig, QueueItem, QueueStatus, UploadPhase,
};

use crate::client::{ClientError, ControlPlaneClient, ProgressFn, TransferExecutor};
use crate::error::QueueError;
use crate::retry;

/// Capacity of each broadcast event channel. Events are fire-and-forget;
/// slow subscribers lag rather than exerting backpressure.
const EVENT_CAPACITY: usize = 64;

/// Background attachment upload queue.
///
/// Cheap to clone — clones share the same queue. Construct one per
/// application at the composition root (multiple independent instances are
/// fine in tests), then call [`initialize`](Self::initialize) before any
/// mutating operation.
#[derive(Clone)]
pub struct UploadQueue {
    inner: Arc<Inner>,
}

struct Inner {
    store: QueueStore,
    client: Arc<dyn ControlPlaneClient>,
    executor: Arc<dyn TransferExecutor>,
    connectivity: watch::Receiver<bool>,
    config: QueueConfig,

    /// Item map keyed by queue id; BTreeMap iteration gives lowest-id-first
    /// processing order. Never held across an await.
    items: Mutex<BTreeMap<u64, QueueItem>>,
    next_id: AtomicU64,
    initialized: AtomicBool,
    paused: AtomicBool,
    /// Reentrancy guard: at most one processing loop at a time.
    processing: AtomicBool,
    /// `(queue_id, token)` of the transfer currently on the wire.
    active: Mutex<Option<(u64, CancellationToken)>>,
    /// Cancels the armed retry wake-up timer.
    wake: Mutex<Option<CancellationToken>>,
    /// Cancels the connectivity listener task.
    monitor: Mutex<Option<CancellationToken>>,

    progress_tx: broadcast::Sender<ProgressEvent>,
    complete_tx: broadcast::Sender<CompleteEvent>,
    error_tx: broadcast::Sender<ErrorEvent>,
}

impl UploadQueue {
    /// Creates a queue handle. No I/O happens until `initialize`.
    pub fn new(
        store: QueueStore,
        client: Arc<dyn ControlPlaneClient>,
        executor: Arc<dyn TransferExecutor>,
        connectivity: watch::Receiver<bool>,
        config: QueueConfig,
    ) -> Self {
        let (progress_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (complete_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (error_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                executor,
                connectivity,
                config,
                items: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
                initialized: AtomicBool::new(false),
                paused: AtomicBool::new(false),
                processing: AtomicBool::new(false),
                active: Mutex::new(None),
                wake: Mutex::new(None),
                monitor: Mutex::new(None),
                progress_tx,
                complete_tx,
                error_tx,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Event subscriptions
    // -----------------------------------------------------------------------

    /// Subscribes to per-mutation progress events.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.progress_tx.subscribe()
    }

    /// Subscribes to completion events (one per item reaching `Completed`).
    pub fn subscribe_complete(&self) -> broadcast::Receiver<CompleteEvent> {
        self.inner.complete_tx.subscribe()
    }

    /// Subscribes to permanent-failure events.
    pub fn subscribe_error(&self) -> broadcast::Receiver<ErrorEvent> {
        self.inner.error_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Loads the persisted snapshot, recovers in-flight items, starts the
    /// connectivity listener, and kicks the processing loop if work is
    /// pending. Idempotent — a second call is a no-op.
    pub async fn initialize(&self) -> Result<(), QueueError> {
        if self.inner.initialized.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut loaded = match self.inner.store.load() {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "failed to load queue snapshot, starting empty");
                Vec::new()
            }
        };

        let mut max_id = 0u64;
        for item in &mut loaded {
            // The executor holds no resumable transfer state across process
            // restarts; anything caught mid-flight goes back to the start.
            if item.phase.is_in_flight() {
                info!(
                    attachment = %item.attachment_id,
                    phase = ?item.phase,
                    "resetting in-flight item after restart"
                );
                item.phase = UploadPhase::Queued;
                item.progress = 0.0;
                item.started_at = None;
            }
            max_id = max_id.max(item.queue_id);
        }
        self.inner.next_id.store(max_id + 1, Ordering::SeqCst);

        let has_pending = loaded.iter().any(|i| i.phase == UploadPhase::Queued);
        {
            let mut items = self.inner.items.lock().unwrap();
            *items = loaded.into_iter().map(|i| (i.queue_id, i)).collect();
        }
        self.persist();

        let connected = *self.inner.connectivity.borrow();
        self.inner.paused.store(!connected, Ordering::SeqCst);
        self.spawn_monitor();

        info!(pending = has_pending, connected, "upload queue initialized");
        if has_pending {
            self.trigger();
        }
        Ok(())
    }

    /// Cancels the in-flight transfer, all timers and listeners, and drops
    /// in-memory state. The handle must be re-initialized before reuse.
    pub async fn destroy(&self) {
        if let Some(token) = self.inner.monitor.lock().unwrap().take() {
            token.cancel();
        }
        if let Some(token) = self.inner.wake.lock().unwrap().take() {
            token.cancel();
        }
        if let Some((_, token)) = self.inner.active.lock().unwrap().take() {
            token.cancel();
        }
        self.inner.items.lock().unwrap().clear();
        self.inner.paused.store(false, Ordering::SeqCst);
        self.inner.initialized.store(false, Ordering::SeqCst);
        info!("upload queue destroyed");
    }

    // -----------------------------------------------------------------------
    // Enqueue
    // -----------------------------------------------------------------------

    /// Presigns an upload target and appends a `Queued` item.
    ///
    /// Returns `(attachment_id, queue_id)` immediately; upload completion is
    /// observed via the event subscriptions. A presign failure propagates to
    /// the caller and no item is created.
    pub async fn enqueue(
        &self,
        local_path: impl Into<PathBuf>,
        mime_type: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<(String, u64), QueueError> {
        self.ensure_initialized()?;

        let pending = {
            let items = self.inner.items.lock().unwrap();
            items.values().filter(|i| !i.phase.is_terminal()).count()
        };
        if pending >= self.inner.config.max_pending {
            return Err(QueueError::QueueFull(pending));
        }

        let grant = self
            .inner
            .client
            .presign(file_name, mime_type, file_size)
            .await
            .map_err(QueueError::Presign)?;

        let queue_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let item = QueueItem::new(
            queue_id,
            grant.attachment_id.clone(),
            local_path.into(),
            mime_type,
            file_name,
            file_size,
            grant.upload_url,
            grant.expires_at,
            self.inner.config.retry.max_attempts,
        );
        self.inner.items.lock().unwrap().insert(queue_id, item);
        self.persist();
        self.emit_progress(queue_id);

        info!(
            attachment = %grant.attachment_id,
            queue_id,
            size = file_size,
            "attachment enqueued"
        );
        self.trigger();
        Ok((grant.attachment_id, queue_id))
    }

    // -----------------------------------------------------------------------
    // Queries & maintenance
    // -----------------------------------------------------------------------

    /// Per-phase counts plus the paused flag. Always recomputed, never cached.
    pub fn status(&self) -> QueueStatus {
        let items = self.inner.items.lock().unwrap();
        QueueStatus::tally(items.values(), self.inner.paused.load(Ordering::SeqCst))
    }

    /// Linear lookup by server-assigned attachment id.
    pub fn item_by_attachment_id(&self, attachment_id: &str) -> Option<QueueItem> {
        let items = self.inner.items.lock().unwrap();
        items
            .values()
            .find(|i| i.attachment_id == attachment_id)
            .cloned()
    }

    /// Requeues a `Failed` item from scratch: attempt count 0, error and
    /// scheduled retry cleared. Rejects items in any other phase.
    pub async fn retry_item(&self, attachment_id: &str) -> Result<(), QueueError> {
        self.ensure_initialized()?;
        let queue_id = {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.values_mut().find(|i| i.attachment_id == attachment_id)
            else {
                return Err(QueueError::NotFound(attachment_id.to_string()));
            };
            if item.phase != UploadPhase::Failed {
                return Err(QueueError::NotFailed(attachment_id.to_string()));
            }
            item.phase = UploadPhase::Queued;
            item.attempt = 0;
            item.progress = 0.0;
            item.last_error = None;
            item.retry_at = None;
            item.started_at = None;
            item.completed_at = None;
            item.queue_id
        };
        self.persist();
        self.emit_progress(queue_id);
        info!(attachment = %attachment_id, "failed item requeued");
        self.trigger();
        Ok(())
    }

    /// Removes an item regardless of phase, cancelling its transfer if it is
    /// currently on the wire.
    pub async fn cancel_item(&self, attachment_id: &str) -> Result<(), QueueError> {
        self.ensure_initialized()?;
        let queue_id = {
            let items = self.inner.items.lock().unwrap();
            items
                .values()
                .find(|i| i.attachment_id == attachment_id)
                .map(|i| i.queue_id)
        }
        .ok_or_else(|| QueueError::NotFound(attachment_id.to_string()))?;

        // Cancel the live transfer first so a late progress callback cannot
        // resurrect the removed item.
        {
            let mut active = self.inner.active.lock().unwrap();
            if matches!(*active, Some((id, _)) if id == queue_id)
                && let Some((_, token)) = active.take()
            {
                token.cancel();
            }
        }
        self.inner.items.lock().unwrap().remove(&queue_id);
        self.persist();
        info!(attachment = %attachment_id, "queue item cancelled");
        Ok(())
    }

    /// Removes all `Completed` items.
    pub async fn clear_completed(&self) -> Result<(), QueueError> {
        self.clear_phase(UploadPhase::Completed)
    }

    /// Removes all `Failed` items.
    pub async fn clear_failed(&self) -> Result<(), QueueError> {
        self.clear_phase(UploadPhase::Failed)
    }

    fn clear_phase(&self, phase: UploadPhase) -> Result<(), QueueError> {
        self.ensure_initialized()?;
        let removed = {
            let mut items = self.inner.items.lock().unwrap();
            let before = items.len();
            items.retain(|_, item| item.phase != phase);
            before - items.len()
        };
        self.persist();
        if removed > 0 {
            debug!(removed, phase = ?phase, "cleared terminal items");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connectivity pause/resume
    // -----------------------------------------------------------------------

    fn spawn_monitor(&self) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self
            .inner
            .monitor
            .lock()
            .unwrap()
            .replace(cancel.clone())
        {
            previous.cancel();
        }
        let queue = self.clone();
        let mut rx = self.inner.connectivity.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = *rx.borrow_and_update();
                        if connected {
                            queue.resume();
                        } else {
                            queue.pause();
                        }
                    }
                }
            }
        });
    }

    /// Pauses the loop and cancels the in-flight transfer; its item reverts
    /// to `Queued` with progress 0 and an unchanged attempt count. Idempotent
    /// against repeated disconnect signals.
    fn pause(&self) {
        if self.inner.paused.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("connectivity lost, pausing upload queue");
        let reverted = {
            let mut active = self.inner.active.lock().unwrap();
            match active.take() {
                Some((queue_id, token)) => {
                    token.cancel();
                    let mut items = self.inner.items.lock().unwrap();
                    if let Some(item) = items.get_mut(&queue_id)
                        && !item.phase.is_terminal()
                    {
                        item.phase = UploadPhase::Queued;
                        item.progress = 0.0;
                        item.started_at = None;
                    }
                    Some(queue_id)
                }
                None => None,
            }
        };
        self.persist();
        if let Some(queue_id) = reverted {
            self.emit_progress(queue_id);
        }
    }

    /// Unpauses and restarts the processing loop. Idempotent.
    fn resume(&self) {
        if !self.inner.paused.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("connectivity restored, resuming upload queue");
        self.trigger();
    }

    // -----------------------------------------------------------------------
    // Processing loop
    // -----------------------------------------------------------------------

    /// Starts the processing loop unless it is already running or the queue
    /// is paused. Concurrent triggers coalesce into one loop.
    fn trigger(&self) {
        if self.inner.paused.load(Ordering::SeqCst) {
            return;
        }
        if self
            .inner
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            queue.run_loop().await;
            queue.inner.processing.store(false, Ordering::SeqCst);
            // Items enqueued or scheduled while the flag was being cleared
            // must not stall until the next external trigger.
            queue.arm_wake_timer();
        });
    }

    async fn run_loop(&self) {
        loop {
            if self.inner.paused.load(Ordering::SeqCst) {
                break;
            }
            let Some(queue_id) = self.next_due_item() else {
                break;
            };
            self.process_item(queue_id).await;
        }
    }

    /// Lowest-id `Queued` item whose scheduled retry is due.
    fn next_due_item(&self) -> Option<u64> {
        let now = Utc::now();
        let items = self.inner.items.lock().unwrap();
        items.values().find(|i| i.is_due(now)).map(|i| i.queue_id)
    }

    async fn process_item(&self, queue_id: u64) {
        let (attachment_id, url, path, mime, size, expired) = {
            let items = self.inner.items.lock().unwrap();
            let Some(item) = items.get(&queue_id) else {
                return;
            };
            (
                item.attachment_id.clone(),
                item.upload_url.clone(),
                item.local_path.clone(),
                item.mime_type.clone(),
                item.file_size,
                item.upload_expires_at <= Utc::now(),
            )
        };

        // An expired presigned URL is never retried automatically; the only
        // way forward is re-enqueuing for a fresh grant.
        if expired {
            warn!(attachment = %attachment_id, "presigned upload URL expired");
            self.finalize_failure(queue_id, "presigned upload URL expired".to_string())
                .await;
            return;
        }

        // Queued -> Uploading.
        let attempt = {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(&queue_id) else {
                return;
            };
            item.phase = UploadPhase::Uploading;
            item.attempt = item.attempt.saturating_add(1).min(item.max_attempts);
            item.progress = 0.0;
            item.started_at = Some(Utc::now());
            item.retry_at = None;
            item.last_error = None;
            item.attempt
        };
        self.persist();
        self.emit_progress(queue_id);
        info!(attachment = %attachment_id, attempt, "starting upload");

        let cancel = CancellationToken::new();
        *self.inner.active.lock().unwrap() = Some((queue_id, cancel.clone()));

        let progress_cb: ProgressFn = {
            let queue = self.clone();
            Box::new(move |sent, total| queue.on_transfer_progress(queue_id, sent, total))
        };
        let result = self
            .inner
            .executor
            .upload(&url, &path, &mime, progress_cb, cancel)
            .await;

        // Drop the active handle if it is still ours.
        {
            let mut active = self.inner.active.lock().unwrap();
            if matches!(*active, Some((id, _)) if id == queue_id) {
                *active = None;
            }
        }

        // The item may have been cancelled or reverted while on the wire.
        let still_uploading = {
            let items = self.inner.items.lock().unwrap();
            items
                .get(&queue_id)
                .is_some_and(|i| i.phase == UploadPhase::Uploading)
        };
        if !still_uploading {
            debug!(
                attachment = %attachment_id,
                "transfer resolved for an item no longer uploading, ignoring"
            );
            return;
        }

        match result {
            Ok(status) if (200..300).contains(&status) => {
                // Uploading -> Confirming.
                {
                    let mut items = self.inner.items.lock().unwrap();
                    if let Some(item) = items.get_mut(&queue_id) {
                        item.phase = UploadPhase::Confirming;
                        item.progress = 1.0;
                    }
                }
                self.persist();
                self.emit_progress(queue_id);

                match self.inner.client.confirm(&attachment_id, size).await {
                    Ok(()) => {
                        // The item may have been cancelled while confirm was
                        // in flight; a removed item gets no completion.
                        let completed = {
                            let mut items = self.inner.items.lock().unwrap();
                            match items.get_mut(&queue_id) {
                                Some(item) => {
                                    item.phase = UploadPhase::Completed;
                                    item.progress = 1.0;
                                    item.completed_at = Some(Utc::now());
                                    item.last_error = None;
                                    true
                                }
                                None => false,
                            }
                        };
                        if !completed {
                            debug!(
                                attachment = %attachment_id,
                                "confirm resolved for a removed item, ignoring"
                            );
                            return;
                        }
                        self.persist();
                        self.emit_progress(queue_id);
                        let _ = self.inner.complete_tx.send(CompleteEvent {
                            attachment_id: attachment_id.clone(),
                        });
                        info!(attachment = %attachment_id, attempt, "upload completed");
                    }
                    Err(e) => {
                        self.handle_attempt_failure(queue_id, format!("confirm failed: {e}"))
                            .await;
                    }
                }
            }
            Ok(status) => {
                self.handle_attempt_failure(queue_id, format!("upload returned status {status}"))
                    .await;
            }
            Err(ClientError::Cancelled) => {
                // Pause or cancel normally reverts the item before we get
                // here; if it is somehow still Uploading, put it back in line
                // without consuming a retry slot.
                {
                    let mut items = self.inner.items.lock().unwrap();
                    if let Some(item) = items.get_mut(&queue_id) {
                        item.phase = UploadPhase::Queued;
                        item.progress = 0.0;
                        item.started_at = None;
                    }
                }
                self.persist();
                self.emit_progress(queue_id);
                debug!(attachment = %attachment_id, "transfer cancelled");
            }
            Err(e) => {
                self.handle_attempt_failure(queue_id, e.to_string()).await;
            }
        }
    }

    /// Transient-failure path: schedule a backoff retry, or finalize `Failed`
    /// once attempts are exhausted.
    async fn handle_attempt_failure(&self, queue_id: u64, error: String) {
        let (attachment_id, scheduled) = {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(&queue_id) else {
                return;
            };
            item.last_error = Some(error.clone());
            let scheduled = if item.attempt < item.max_attempts {
                let delay = retry::delay_for_attempt(&self.inner.config.retry, item.attempt);
                item.phase = UploadPhase::Queued;
                item.progress = 0.0;
                item.retry_at = Some(
                    Utc::now()
                        + chrono::Duration::from_std(delay)
                            .unwrap_or_else(|_| chrono::Duration::zero()),
                );
                Some((item.attempt, delay))
            } else {
                item.phase = UploadPhase::Failed;
                item.progress = 0.0;
                item.completed_at = Some(Utc::now());
                None
            };
            (item.attachment_id.clone(), scheduled)
        };
        self.persist();
        self.emit_progress(queue_id);

        match scheduled {
            Some((attempt, delay)) => {
                warn!(
                    attachment = %attachment_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "attempt failed, retry scheduled"
                );
            }
            None => {
                warn!(attachment = %attachment_id, error = %error, "attempts exhausted, giving up");
                let _ = self.inner.error_tx.send(ErrorEvent {
                    attachment_id: attachment_id.clone(),
                    error: error.clone(),
                });
                self.report_failure(&attachment_id, &error).await;
            }
        }
    }

    /// Permanent-failure path that bypasses the retry budget (expired URL).
    async fn finalize_failure(&self, queue_id: u64, error: String) {
        let attachment_id = {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(&queue_id) else {
                return;
            };
            item.phase = UploadPhase::Failed;
            item.progress = 0.0;
            item.last_error = Some(error.clone());
            item.completed_at = Some(Utc::now());
            item.attachment_id.clone()
        };
        self.persist();
        self.emit_progress(queue_id);
        let _ = self.inner.error_tx.send(ErrorEvent {
            attachment_id: attachment_id.clone(),
            error: error.clone(),
        });
        self.report_failure(&attachment_id, &error).await;
    }

    /// Best-effort server notification; delivery failures are swallowed.
    async fn report_failure(&self, attachment_id: &str, error: &str) {
        if let Err(e) = self.inner.client.report_failure(attachment_id, error).await {
            debug!(attachment = %attachment_id, error = %e, "failure report not delivered");
        }
    }

    /// Arms a single wake-up timer for the earliest scheduled retry among
    /// queued items, so backoff delays never stall the queue indefinitely.
    fn arm_wake_timer(&self) {
        if let Some(previous) = self.inner.wake.lock().unwrap().take() {
            previous.cancel();
        }
        if self.inner.paused.load(Ordering::SeqCst) {
            return;
        }

        let now = Utc::now();
        let (due_now, earliest) = {
            let items = self.inner.items.lock().unwrap();
            let mut due_now = false;
            let mut earliest: Option<DateTime<Utc>> = None;
            for item in items.values().filter(|i| i.phase == UploadPhase::Queued) {
                match item.retry_at {
                    Some(at) if at > now => {
                        earliest = Some(earliest.map_or(at, |e| e.min(at)));
                    }
                    _ => due_now = true,
                }
            }
            (due_now, earliest)
        };

        if due_now {
            self.trigger();
            return;
        }
        let Some(at) = earliest else {
            return;
        };
        let delay = (at - now).to_std().unwrap_or(Duration::ZERO);

        let cancel = CancellationToken::new();
        *self.inner.wake.lock().unwrap() = Some(cancel.clone());
        let queue = self.clone();
        debug!(delay_ms = delay.as_millis() as u64, "armed retry wake-up timer");
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => queue.trigger(),
            }
        });
    }

    // -----------------------------------------------------------------------
    // Shared helpers
    // -----------------------------------------------------------------------

    /// Byte-progress callback from the executor. Clamped to [0, 1], monotone
    /// within the attempt, and dropped for items no longer uploading.
    fn on_transfer_progress(&self, queue_id: u64, sent: u64, total: u64) {
        let event = {
            let mut items = self.inner.items.lock().unwrap();
            let Some(item) = items.get_mut(&queue_id) else {
                return;
            };
            if item.phase != UploadPhase::Uploading {
                return;
            }
            let fraction = if total == 0 {
                0.0
            } else {
                (sent as f64 / total as f64).clamp(0.0, 1.0)
            };
            if fraction < item.progress {
                return;
            }
            item.progress = fraction;
            ProgressEvent {
                attachment_id: item.attachment_id.clone(),
                phase: item.phase,
                progress: item.progress,
                error: item.last_error.clone(),
            }
        };
        let _ = self.inner.progress_tx.send(event);
    }

    fn emit_progress(&self, queue_id: u64) {
        let event = {
            let items = self.inner.items.lock().unwrap();
            let Some(item) = items.get(&queue_id) else {
                return;
            };
            ProgressEvent {
                attachment_id: item.attachment_id.clone(),
                phase: item.phase,
                progress: item.progress,
                error: item.last_error.clone(),
            }
        };
        let _ = self.inner.progress_tx.send(event);
    }

    /// Snapshots the full queue to storage. Save failures are logged and
    /// swallowed — in-memory state stays authoritative for the session.
    fn persist(&self) {
        let items: Vec<QueueItem> = {
            let items = self.inner.items.lock().unwrap();
            items.values().cloned().collect()
        };
        if let Err(e) = self.inner.store.save(&items) {
            warn!(error = %e, "failed to persist queue snapshot");
        }
    }

    fn ensure_initialized(&self) -> Result<(), QueueError> {
        if self.inner.initialized.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(QueueError::NotInitialized)
        }
    }
}
