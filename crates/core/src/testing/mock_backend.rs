//! Mock download backend for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::download::{DownloadBackend, DownloadError};
use crate::media::MediaItem;
use crate::release::Release;

/// A recorded submission for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDownload {
    /// Query of the item the release was submitted for.
    pub item: String,
    pub release: String,
    pub stream: bool,
    pub force: bool,
}

/// Mock implementation of the DownloadBackend trait.
///
/// Provides controllable behavior for testing:
/// - Mark titles as cached so `check` reports them
/// - Reject specific titles
/// - Track submissions for assertions
#[derive(Debug, Clone, Default)]
pub struct MockDownloadBackend {
    cached: Arc<RwLock<HashSet<String>>>,
    rejected: Arc<RwLock<HashSet<String>>>,
    downloads: Arc<RwLock<Vec<RecordedDownload>>>,
    next_error: Arc<RwLock<Option<DownloadError>>>,
}

impl MockDownloadBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `title` as cached on the next checks.
    pub async fn set_cached(&self, title: &str) {
        self.cached.write().await.insert(title.to_string());
    }

    /// Refuse submissions of `title`.
    pub async fn reject(&self, title: &str) {
        self.rejected.write().await.insert(title.to_string());
    }

    pub async fn set_next_error(&self, error: DownloadError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn downloads(&self) -> Vec<RecordedDownload> {
        self.downloads.read().await.clone()
    }

    pub async fn download_count(&self) -> usize {
        self.downloads.read().await.len()
    }
}

#[async_trait]
impl DownloadBackend for MockDownloadBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check(&self, releases: &mut [Release]) -> Result<(), DownloadError> {
        let cached = self.cached.read().await;
        for release in releases.iter_mut() {
            if cached.contains(&release.title) && !release.cached.iter().any(|c| c == "mock") {
                release.cached.push("mock".to_string());
            }
        }
        Ok(())
    }

    async fn download(
        &self,
        item: &MediaItem,
        release: &Release,
        stream: bool,
        force: bool,
    ) -> Result<bool, DownloadError> {
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        if self.rejected.read().await.contains(&release.title) {
            return Ok(false);
        }
        self.downloads.write().await.push(RecordedDownload {
            item: item.query(),
            release: release.title.clone(),
            stream,
            force,
        });
        Ok(true)
    }
}
