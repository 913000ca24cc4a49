use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{RetryTracker, RetryTransition};
use crate::media::MediaItem;
use crate::version::SessionView;

/// Owned copy of the ledgers, for evaluating versions without holding locks.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub downloaded: HashSet<String>,
    pub downloading: HashSet<String>,
    pub suppressed: HashSet<String>,
}

impl SessionSnapshot {
    pub fn view<'a>(
        &'a self,
        library: &'a [MediaItem],
        tracks_files: bool,
        today: NaiveDate,
    ) -> SessionView<'a> {
        SessionView {
            downloaded: &self.downloaded,
            downloading: &self.downloading,
            suppressed: &self.suppressed,
            library,
            tracks_files,
            today,
        }
    }
}

/// Shared engine state: acquisition ledgers, retry tracking and pending
/// season packs.
#[derive(Debug, Default)]
pub struct SessionState {
    downloaded: RwLock<HashSet<String>>,
    downloading: RwLock<HashSet<String>>,
    retries: RwLock<RetryTracker>,
    packs: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            downloaded: self.downloaded.read().await.clone(),
            downloading: self.downloading.read().await.clone(),
            suppressed: self.retries.read().await.suppressed().clone(),
        }
    }

    pub async fn mark_downloaded<I>(&self, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut ledger = self.downloaded.write().await;
        for key in keys {
            debug!(key = %key, "Recording acquisition");
            ledger.insert(key);
        }
    }

    pub async fn is_downloaded(&self, key: &str) -> bool {
        self.downloaded.read().await.contains(key)
    }

    /// Record a background transfer in flight.
    pub async fn mark_downloading(&self, key: String) {
        self.downloading.write().await.insert(key);
    }

    /// Called when a background transfer finishes or is abandoned.
    pub async fn finish_downloading(&self, key: &str) -> bool {
        self.downloading.write().await.remove(key)
    }

    pub async fn record_failure(&self, key: &str, threshold: u32) -> RetryTransition {
        self.retries.write().await.record_failure(key, threshold)
    }

    pub async fn record_success(&self, key: &str) {
        self.retries.write().await.record_success(key);
    }

    pub async fn failures(&self, key: &str) -> u32 {
        self.retries.read().await.failures(key)
    }

    pub async fn is_suppressed(&self, key: &str) -> bool {
        self.retries.read().await.is_suppressed(key)
    }

    pub async fn unsuppress(&self, key: &str) -> bool {
        self.retries.write().await.unsuppress(key)
    }

    /// Suppressed media keys, sorted.
    pub async fn suppressed(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.retries.read().await.suppressed().iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Media keys with their failure counts, sorted by key.
    pub async fn ignored(&self) -> Vec<(String, u32)> {
        let mut entries: Vec<(String, u32)> = self
            .retries
            .read()
            .await
            .ignored()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort();
        entries
    }

    /// Mark a season pack as submitted and awaiting the library.
    pub async fn mark_pack(&self, pack_key: &str, now: DateTime<Utc>) {
        self.packs.write().await.insert(pack_key.to_string(), now);
    }

    /// Whether a pack submitted less than `max_wait` ago is still pending.
    /// Expired markers are dropped.
    pub async fn pack_pending(&self, pack_key: &str, now: DateTime<Utc>, max_wait: Duration) -> bool {
        let mut packs = self.packs.write().await;
        match packs.get(pack_key) {
            Some(started) if now - *started < max_wait => true,
            Some(_) => {
                debug!(pack = %pack_key, "Pack wait expired");
                packs.remove(pack_key);
                false
            }
            None => false,
        }
    }

    pub async fn clear_pack(&self, pack_key: &str) {
        self.packs.write().await.remove(pack_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_reflects_ledgers() {
        let state = SessionState::new();
        state
            .mark_downloaded(vec!["Heat.1995 [1080]".to_string()])
            .await;
        state.mark_downloading("Heat.1995 [2160]".to_string()).await;
        state.record_failure("movie|x", 1).await;

        let snapshot = state.snapshot().await;
        assert!(snapshot.downloaded.contains("Heat.1995 [1080]"));
        assert!(snapshot.downloading.contains("Heat.1995 [2160]"));
        assert!(snapshot.suppressed.contains("movie|x"));
        assert!(state.finish_downloading("Heat.1995 [2160]").await);
    }

    #[tokio::test]
    async fn test_pack_wait_is_bounded() {
        let state = SessionState::new();
        let start = Utc::now();
        state.mark_pack("season|x|1", start).await;

        let wait = Duration::hours(6);
        assert!(state.pack_pending("season|x|1", start + Duration::hours(1), wait).await);
        assert!(!state.pack_pending("season|x|1", start + Duration::hours(7), wait).await);
        // Expired marker is gone.
        assert!(!state.pack_pending("season|x|1", start, wait).await);
    }

    #[tokio::test]
    async fn test_suppression_listing() {
        let state = SessionState::new();
        state.record_failure("b", 1).await;
        state.record_failure("a", 1).await;
        state.record_failure("c", 2).await;
        assert_eq!(state.suppressed().await, vec!["a", "b"]);
        assert_eq!(state.ignored().await, vec![("c".to_string(), 1)]);
        assert!(state.unsuppress("a").await);
        assert_eq!(state.suppressed().await, vec!["b"]);
    }
}
