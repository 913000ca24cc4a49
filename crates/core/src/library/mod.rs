//! Catalog-side collaborators: the media library, catalog services that
//! identity merges pull from, the metadata service and the watchlist.

use async_trait::async_trait;
use thiserror::Error;

use crate::media::MediaItem;

/// Errors from catalog-side services.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A service holding authoritative records for media items.
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// Service name recorded in `MediaItem::services`.
    fn name(&self) -> &str;

    /// Look up the record equivalent to `item`, if the service has one.
    async fn lookup(&self, item: &MediaItem) -> Result<Option<MediaItem>, CatalogError>;
}

/// The collection backend the acquired media ends up in.
#[async_trait]
pub trait Library: Send + Sync {
    /// Current library contents: movies, and shows with their seasons and episodes.
    async fn snapshot(&self) -> Vec<MediaItem>;

    /// Whether the backend keeps per-file history (catalog-like backends).
    fn tracks_files(&self) -> bool;

    /// Ask the backend to rescan after an acquisition.
    async fn refresh(&self, item: &MediaItem) -> Result<(), CatalogError>;
}

/// Aliases, translations and availability lookups.
#[async_trait]
pub trait MetadataService: Send + Sync {
    /// Alternate titles of the item in `lang`.
    async fn aliases(&self, item: &MediaItem, lang: &str) -> Vec<String>;

    /// Whether the item can be watched yet, if the service knows.
    async fn available(&self, item: &MediaItem) -> Option<bool>;
}

/// The watchlist items come from.
#[async_trait]
pub trait Watchlist: Send + Sync {
    async fn remove(&self, item: &MediaItem) -> Result<(), CatalogError>;
}
