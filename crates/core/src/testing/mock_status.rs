//! Mock status and ignore services for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::MediaItem;
use crate::state::IgnoreService;
use crate::status::{ShowStatus, StatusError, StatusService};

/// Mock implementation of the StatusService trait.
#[derive(Debug, Clone, Default)]
pub struct MockStatusService {
    status: Arc<RwLock<Option<ShowStatus>>>,
    lookups: Arc<RwLock<Vec<String>>>,
}

impl MockStatusService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, status: Option<ShowStatus>) {
        *self.status.write().await = status;
    }

    /// Titles of shows looked up.
    pub async fn lookups(&self) -> Vec<String> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl StatusService for MockStatusService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn show_status(&self, show: &MediaItem) -> Result<Option<ShowStatus>, StatusError> {
        self.lookups.write().await.push(show.title.clone());
        Ok(self.status.read().await.clone())
    }
}

/// Mock implementation of the IgnoreService trait, keyed by media key.
#[derive(Debug, Clone, Default)]
pub struct MockIgnoreService {
    ignored: Arc<RwLock<HashSet<String>>>,
    added: Arc<RwLock<Vec<String>>>,
    removed: Arc<RwLock<Vec<String>>>,
}

impl MockIgnoreService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ignore(&self, item: &MediaItem) {
        self.ignored.write().await.insert(item.media_key());
    }

    /// Media keys passed to `add`.
    pub async fn added(&self) -> Vec<String> {
        self.added.read().await.clone()
    }

    /// Media keys passed to `remove`.
    pub async fn removed(&self) -> Vec<String> {
        self.removed.read().await.clone()
    }
}

#[async_trait]
impl IgnoreService for MockIgnoreService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add(&self, item: &MediaItem) {
        let key = item.media_key();
        self.ignored.write().await.insert(key.clone());
        self.added.write().await.push(key);
    }

    async fn remove(&self, item: &MediaItem) {
        let key = item.media_key();
        self.ignored.write().await.remove(&key);
        self.removed.write().await.push(key);
    }

    async fn check(&self, item: &MediaItem) -> bool {
        self.ignored.read().await.contains(&item.media_key())
    }
}
