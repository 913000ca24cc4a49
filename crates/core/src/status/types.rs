use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::media::{local_episode_count, MediaItem};

/// Airing status of a show as reported by the status service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowStatus {
    pub tmdb_id: Option<u64>,
    pub status: Option<String>,
    pub in_production: Option<bool>,
    pub ended: bool,
    /// Regular (non-special) episodes the show is expected to have.
    pub expected_episodes: Option<u32>,
    pub expected_source: Option<String>,
    /// `"tmdb"` for fresh lookups, `"cache"` for cache hits.
    pub source: String,
    /// Unix timestamp of the lookup.
    pub checked_at: i64,
}

impl ShowStatus {
    /// Cache lifetime: 30 days for ended shows, one day otherwise.
    pub fn ttl(&self) -> Duration {
        if self.ended {
            Duration::days(30)
        } else {
            Duration::days(1)
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() - self.checked_at < self.ttl().num_seconds()
    }
}

/// Whether `status` is one of the finished states.
pub fn is_ended_status(status: &str) -> bool {
    matches!(
        status.trim().to_lowercase().as_str(),
        "ended" | "canceled" | "cancelled"
    )
}

/// A show is complete once it has ended and the library holds every
/// expected regular episode.
pub fn is_show_complete(show: &MediaItem, library: &[MediaItem], status: &ShowStatus) -> bool {
    status.ended
        && status
            .expected_episodes
            .is_some_and(|expected| local_episode_count(show, library) >= expected)
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Status service connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Status service API error: {0}")]
    ApiError(String),

    #[error("Status cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for StatusError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            StatusError::ConnectionFailed(e.to_string())
        } else {
            StatusError::ApiError(e.to_string())
        }
    }
}

/// Looks up whether a show has ended.
#[async_trait]
pub trait StatusService: Send + Sync {
    fn name(&self) -> &str;

    /// Status of `show`, `None` when the service does not know it.
    async fn show_status(&self, show: &MediaItem) -> Result<Option<ShowStatus>, StatusError>;
}
