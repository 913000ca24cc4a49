//! Mock library, metadata service and watchlist for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::library::{CatalogError, Library, MetadataService, Watchlist};
use crate::media::MediaItem;

/// Mock implementation of the Library trait.
#[derive(Debug, Clone)]
pub struct MockLibrary {
    items: Arc<RwLock<Vec<MediaItem>>>,
    tracks_files: bool,
    refreshed: Arc<RwLock<Vec<String>>>,
}

impl Default for MockLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLibrary {
    /// An empty catalog-like library.
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            tracks_files: true,
            refreshed: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A library without per-file history.
    pub fn without_file_history() -> Self {
        Self {
            tracks_files: false,
            ..Self::new()
        }
    }

    pub async fn add_item(&self, item: MediaItem) {
        self.items.write().await.push(item);
    }

    /// Titles of items a refresh was requested for.
    pub async fn refreshed(&self) -> Vec<String> {
        self.refreshed.read().await.clone()
    }
}

#[async_trait]
impl Library for MockLibrary {
    async fn snapshot(&self) -> Vec<MediaItem> {
        self.items.read().await.clone()
    }

    fn tracks_files(&self) -> bool {
        self.tracks_files
    }

    async fn refresh(&self, item: &MediaItem) -> Result<(), CatalogError> {
        self.refreshed.write().await.push(item.title.clone());
        Ok(())
    }
}

/// Mock implementation of the MetadataService trait.
#[derive(Debug, Clone, Default)]
pub struct MockMetadataService {
    aliases: Arc<RwLock<HashMap<String, Vec<String>>>>,
    available: Arc<RwLock<Option<bool>>>,
    alias_lookups: Arc<RwLock<Vec<String>>>,
}

impl MockMetadataService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_aliases(&self, lang: &str, aliases: Vec<String>) {
        self.aliases.write().await.insert(lang.to_string(), aliases);
    }

    pub async fn set_available(&self, available: Option<bool>) {
        *self.available.write().await = available;
    }

    /// Languages aliases were requested in, in call order.
    pub async fn alias_lookups(&self) -> Vec<String> {
        self.alias_lookups.read().await.clone()
    }
}

#[async_trait]
impl MetadataService for MockMetadataService {
    async fn aliases(&self, _item: &MediaItem, lang: &str) -> Vec<String> {
        self.alias_lookups.write().await.push(lang.to_string());
        self.aliases
            .read()
            .await
            .get(lang)
            .cloned()
            .unwrap_or_default()
    }

    async fn available(&self, _item: &MediaItem) -> Option<bool> {
        *self.available.read().await
    }
}

/// Mock implementation of the Watchlist trait.
#[derive(Debug, Clone, Default)]
pub struct MockWatchlist {
    removed: Arc<RwLock<Vec<String>>>,
}

impl MockWatchlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Titles removed from the watchlist.
    pub async fn removed(&self) -> Vec<String> {
        self.removed.read().await.clone()
    }
}

#[async_trait]
impl Watchlist for MockWatchlist {
    async fn remove(&self, item: &MediaItem) -> Result<(), CatalogError> {
        self.removed.write().await.push(item.title.clone());
        Ok(())
    }
}
