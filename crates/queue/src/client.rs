//! Collaborator traits implemented by the host application.
//!
//! Boxed-future methods keep the traits object-safe, so the service holds
//! `Arc<dyn ControlPlaneClient>` / `Arc<dyn TransferExecutor>` without
//! generics bleeding into every type. Hosts bridge these to their actual
//! HTTP client; tests use scripted mocks.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

/// Boxed future returned by collaborator trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors produced by host-provided collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(String),

    #[error("server rejected request: {0}")]
    Rejected(String),

    #[error("cancelled")]
    Cancelled,
}

/// Presigned upload grant issued by the control plane.
#[derive(Debug, Clone)]
pub struct PresignGrant {
    pub attachment_id: String,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Byte-progress callback: `(bytes_sent, bytes_total)`.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Control-plane API: presign, confirm, report-failure.
pub trait ControlPlaneClient: Send + Sync {
    /// Requests a presigned upload target for a new attachment.
    fn presign<'a>(
        &'a self,
        file_name: &'a str,
        mime_type: &'a str,
        size: u64,
    ) -> BoxFuture<'a, Result<PresignGrant, ClientError>>;

    /// Confirms a finished upload with the number of bytes transferred.
    fn confirm<'a>(
        &'a self,
        attachment_id: &'a str,
        bytes_uploaded: u64,
    ) -> BoxFuture<'a, Result<(), ClientError>>;

    /// Best-effort failure report. The queue ignores errors from this call.
    fn report_failure<'a>(
        &'a self,
        attachment_id: &'a str,
        error: &'a str,
    ) -> BoxFuture<'a, Result<(), ClientError>>;
}

/// File-transfer primitive performing a binary PUT-style upload.
pub trait TransferExecutor: Send + Sync {
    /// Uploads `local_path` to `url`, invoking `progress` as bytes go out.
    ///
    /// Resolves with an HTTP-like status code (2xx means success). Must stop
    /// promptly once `cancel` fires, resolving with
    /// [`ClientError::Cancelled`].
    fn upload<'a>(
        &'a self,
        url: &'a str,
        local_path: &'a Path,
        mime_type: &'a str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, Result<u16, ClientError>>;
}
