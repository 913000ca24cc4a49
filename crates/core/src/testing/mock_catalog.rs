//! Mock catalog adapter for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::library::{CatalogAdapter, CatalogError};
use crate::media::MediaItem;

/// Mock implementation of the CatalogAdapter trait.
///
/// Lookups return the first stored record equal to the item (same
/// external ids or guid).
#[derive(Debug, Clone)]
pub struct MockCatalogAdapter {
    name: String,
    records: Arc<RwLock<Vec<MediaItem>>>,
    lookups: Arc<RwLock<usize>>,
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl MockCatalogAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Arc::new(RwLock::new(Vec::new())),
            lookups: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn add_record(&self, record: MediaItem) {
        self.records.write().await.push(record);
    }

    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn lookup_count(&self) -> usize {
        *self.lookups.read().await
    }
}

#[async_trait]
impl CatalogAdapter for MockCatalogAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, item: &MediaItem) -> Result<Option<MediaItem>, CatalogError> {
        *self.lookups.write().await += 1;
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| *r == item)
            .cloned())
    }
}
