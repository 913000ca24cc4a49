//! Types for indexer search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::MediaItem;
use crate::release::{Protocol, Release};

/// External ids a search targets, used to cross-check indexer hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetIds {
    /// Numeric part of the IMDb id (`tt0113277` → 113277).
    pub imdb: Option<u64>,
    pub tmdb: Option<u64>,
    pub tvdb: Option<u64>,
}

impl TargetIds {
    /// Ids of the top-level entity of an item.
    pub fn from_item(item: &MediaItem) -> Self {
        let mut ids = Self::default();
        for eid in item.show_eids() {
            if let Some(imdb) = eid.strip_prefix("imdb://") {
                ids.imdb = imdb.trim_start_matches("tt").parse().ok();
            } else if let Some(tmdb) = eid.strip_prefix("tmdb://") {
                ids.tmdb = tmdb.parse().ok();
            } else if let Some(tvdb) = eid.strip_prefix("tvdb://") {
                ids.tvdb = tvdb.parse().ok();
            }
        }
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tmdb.is_none() && self.tvdb.is_none()
    }
}

/// One search hit as reported by the indexer aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    pub title: String,
    pub indexer: String,
    pub size_bytes: Option<u64>,
    pub protocol: Protocol,
    pub categories: Vec<u32>,
    pub seeders: u32,
    pub magnet_url: Option<String>,
    pub download_url: Option<String>,
    pub imdb_id: Option<u64>,
    pub tmdb_id: Option<u64>,
    pub tvdb_id: Option<u64>,
}

fn present(id: Option<u64>) -> Option<u64> {
    id.filter(|&i| i != 0)
}

impl RawHit {
    pub fn new(title: impl Into<String>, indexer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            indexer: indexer.into(),
            size_bytes: None,
            protocol: Protocol::Torrent,
            categories: Vec::new(),
            seeders: 0,
            magnet_url: None,
            download_url: None,
            imdb_id: None,
            tmdb_id: None,
            tvdb_id: None,
        }
    }

    /// Whether the hit carries any usable external id.
    pub fn has_ids(&self) -> bool {
        present(self.imdb_id).is_some()
            || present(self.tmdb_id).is_some()
            || present(self.tvdb_id).is_some()
    }

    /// Whether any id the hit carries equals the target's.
    pub fn matches_ids(&self, target: &TargetIds) -> bool {
        let same = |hit: Option<u64>, want: Option<u64>| matches!((present(hit), want), (Some(a), Some(b)) if a == b);
        same(self.imdb_id, target.imdb) || same(self.tmdb_id, target.tmdb) || same(self.tvdb_id, target.tvdb)
    }

    /// Turn the hit into a release once a magnet is known.
    pub fn into_release(self, magnet: String) -> Release {
        let size_gb = self
            .size_bytes
            .map(|b| b as f64 / 1e9)
            .unwrap_or(1.0);
        let mut release = Release::new(
            format!("[prowlarr: {}]", self.indexer),
            self.title,
            size_gb,
            vec![magnet],
            self.seeders,
        );
        release.protocol = self.protocol;
        release
    }
}

/// Errors from indexer search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Search backend API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid deviation pattern: {0}")]
    InvalidPattern(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Timeout
        } else if e.is_connect() {
            SearchError::ConnectionFailed(e.to_string())
        } else {
            SearchError::ApiError(e.to_string())
        }
    }
}

/// A source of candidate releases.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    fn name(&self) -> &str;

    /// Search for `query` and return releases whose titles match the
    /// deviation `pattern`. `ids` enables the external id cross-check.
    async fn scrape(
        &self,
        query: &str,
        pattern: &str,
        ids: Option<&TargetIds>,
    ) -> Result<Vec<Release>, SearchError>;
}
