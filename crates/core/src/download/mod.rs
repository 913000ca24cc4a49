//! Download backend seam.
//!
//! The backend performs the actual transfer; the core only decides what to
//! submit and how.

use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaItem;
use crate::release::Release;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Download backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Download backend API error: {0}")]
    ApiError(String),

    #[error("Release rejected: {0}")]
    Rejected(String),
}

/// A debrid-like download service.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Fill in the cache status (`cached`, `maybe_cached`) of each release.
    async fn check(&self, releases: &mut [Release]) -> Result<(), DownloadError>;

    /// Submit `release` for `item`.
    ///
    /// `stream` asks for an immediate transfer of a cached copy; otherwise the
    /// backend downloads in the background. `force` skips the backend's own
    /// file matching. Returns whether the release was accepted.
    async fn download(
        &self,
        item: &MediaItem,
        release: &Release,
        stream: bool,
        force: bool,
    ) -> Result<bool, DownloadError>;
}
