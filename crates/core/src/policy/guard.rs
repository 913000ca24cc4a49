use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::{PolicyStore, UpgradeEntry};
use crate::media::{MediaItem, MediaKind};
use crate::release::{has_1080_plus, is_1080, is_4k, Release};
use crate::version::Version;

/// Timing knobs of the release policy.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    /// How long sub-4K releases are held back once HD releases appear.
    pub timer_window: Duration,
    /// Items older than this are never held back.
    pub stale_after: Duration,
    /// Items older than this are not queued for (or kept in) the upgrade queue.
    pub upgrade_max_age: Duration,
    /// Minimum time between two upgrade checks of one entry.
    pub upgrade_check_interval: Duration,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            timer_window: Duration::days(2),
            stale_after: Duration::days(365),
            upgrade_max_age: Duration::days(730),
            upgrade_check_interval: Duration::days(7),
        }
    }
}

/// What the policy decided for one acquisition attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDecision {
    pub force_4k_only: bool,
    pub force_retries: Option<u32>,
    pub skip_watch: bool,
}

pub struct ReleasePolicy {
    store: Arc<PolicyStore>,
    settings: PolicySettings,
}

fn age(item: &MediaItem, now: DateTime<Utc>) -> Option<Duration> {
    item.release_date()
        .map(|date| now.date_naive().signed_duration_since(date))
}

impl ReleasePolicy {
    pub fn new(store: Arc<PolicyStore>, settings: PolicySettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &PolicyStore {
        &self.store
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    /// Items without a release date count as stale.
    pub fn is_stale(&self, item: &MediaItem, now: DateTime<Utc>) -> bool {
        age(item, now).is_none_or(|a| a > self.settings.stale_after)
    }

    /// Filter candidates through the 4K timer.
    ///
    /// A fresh item exposing an HD release starts its timer. While the timer
    /// runs only 4K releases pass, retries are not counted, and an empty
    /// result skips retry tracking altogether. Otherwise the retry threshold
    /// is raised to what 1080p-capped versions need before they apply.
    pub async fn apply(
        &self,
        item: &MediaItem,
        releases: Vec<Release>,
        versions: &[Version],
        now: DateTime<Utc>,
    ) -> (Vec<Release>, PolicyDecision) {
        if item.kind == MediaKind::Show {
            return (releases, PolicyDecision::default());
        }

        let key = item.media_key();
        let stale = self.is_stale(item, now);
        let has_hd = releases.iter().any(has_1080_plus);
        let started = self
            .store
            .update(|state| {
                if !stale && has_hd && !state.timers.contains_key(&key) {
                    info!(key = %key, "Starting 4K timer");
                    state.timers.insert(key.clone(), now.timestamp());
                }
                state.timers.get(&key).copied()
            })
            .await;

        let active = started
            .is_some_and(|t| now.timestamp() - t < self.settings.timer_window.num_seconds());
        let force_4k_only = active && !stale;

        if !force_4k_only {
            let required = versions
                .iter()
                .filter(|v| v.is_enabled() && v.targets(item.kind) && v.is_capped_at_1080())
                .map(Version::required_failures)
                .max()
                .unwrap_or(0);
            let decision = PolicyDecision {
                force_retries: (required > 0).then_some(required),
                ..Default::default()
            };
            return (releases, decision);
        }

        let total = releases.len();
        let filtered: Vec<Release> = releases.into_iter().filter(is_4k).collect();
        debug!(key = %key, total, kept = filtered.len(), "4K timer active, filtering releases");
        let decision = PolicyDecision {
            force_4k_only: true,
            force_retries: Some(0),
            skip_watch: filtered.is_empty(),
        };
        (filtered, decision)
    }

    /// Timer start for an item, as a unix timestamp.
    pub async fn timer_started(&self, item: &MediaItem) -> Option<i64> {
        self.store.snapshot().await.timers.get(&item.media_key()).copied()
    }

    /// Queue a 1080p acquisition of a recent item for a later 4K check, or
    /// clear the queue entry when the accepted release is already 4K.
    pub async fn maybe_queue_upgrade(
        &self,
        item: &MediaItem,
        release: &Release,
        query: String,
        altquery: String,
        now: DateTime<Utc>,
    ) {
        if item.kind == MediaKind::Show {
            return;
        }
        if is_4k(release) {
            self.clear_upgrade(item).await;
            return;
        }
        let recent = age(item, now).is_some_and(|a| a <= self.settings.upgrade_max_age);
        if !recent || !is_1080(release) {
            return;
        }

        let key = item.media_key();
        self.store
            .update(|state| {
                let added = state.upgrade_queue.get(&key).map(|e| e.added);
                let mut entry = UpgradeEntry::from_item(item, query, altquery, now.timestamp());
                if let Some(added) = added {
                    entry.added = added;
                }
                info!(key = %key, release = %release.title, "Queued for 4K upgrade");
                state.upgrade_queue.insert(key.clone(), entry);
            })
            .await;
    }

    pub async fn clear_upgrade(&self, item: &MediaItem) -> bool {
        let key = item.media_key();
        self.store
            .update(|state| {
                let removed = state.upgrade_queue.remove(&key).is_some();
                if removed {
                    info!(key = %key, "Cleared upgrade queue entry");
                }
                removed
            })
            .await
    }

    pub async fn remove_upgrade(&self, key: &str) -> bool {
        self.store
            .update(|state| state.upgrade_queue.remove(key).is_some())
            .await
    }

    /// Entries due for an upgrade check.
    ///
    /// Entries past the age ceiling are dropped. Entries without a query
    /// only have their check time refreshed.
    pub async fn due_upgrades(&self, now: DateTime<Utc>) -> Vec<(String, UpgradeEntry)> {
        let max_age = self.settings.upgrade_max_age;
        let interval = self.settings.upgrade_check_interval.num_seconds();
        self.store
            .update(|state| {
                state.upgrade_queue.retain(|key, entry| {
                    let keep = age(&entry.to_item(), now).is_some_and(|a| a <= max_age);
                    if !keep {
                        info!(key = %key, "Dropping upgrade entry past age ceiling");
                    }
                    keep
                });

                let mut due = Vec::new();
                for (key, entry) in state.upgrade_queue.iter_mut() {
                    if now.timestamp() - entry.last_checked < interval {
                        continue;
                    }
                    if entry.query.trim().is_empty() {
                        entry.last_checked = now.timestamp();
                        continue;
                    }
                    due.push((key.clone(), entry.clone()));
                }
                due
            })
            .await
    }

    /// Record the outcome of an upgrade check.
    pub async fn finish_upgrade(&self, key: &str, upgraded: bool, now: DateTime<Utc>) {
        self.store
            .update(|state| {
                if upgraded {
                    state.upgrade_queue.remove(key);
                } else if let Some(entry) = state.upgrade_queue.get_mut(key) {
                    entry.last_checked = now.timestamp();
                }
            })
            .await;
    }
}
