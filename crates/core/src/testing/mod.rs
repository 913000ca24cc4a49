//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every collaborator trait the
//! orchestrator talks to, allowing full acquisition flows to be tested
//! without real services.
//!
//! # Example
//!
//! ```rust,ignore
//! use selectarr_core::testing::{fixtures, MockDownloadBackend, MockLibrary, MockReleaseSource};
//!
//! let source = MockReleaseSource::new();
//! let backend = MockDownloadBackend::new();
//!
//! source.set_releases(vec![fixtures::release("Heat.1995.1080p.BluRay")]).await;
//! backend.set_cached("Heat.1995.1080p.BluRay").await;
//! ```

mod mock_backend;
mod mock_catalog;
mod mock_library;
mod mock_source;
mod mock_status;

pub use mock_backend::{MockDownloadBackend, RecordedDownload};
pub use mock_catalog::MockCatalogAdapter;
pub use mock_library::{MockLibrary, MockMetadataService, MockWatchlist};
pub use mock_source::{MockReleaseSource, RecordedScrape};
pub use mock_status::{MockIgnoreService, MockStatusService};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use crate::media::{MediaItem, MediaKind};
    use crate::release::Release;
    use crate::version::{Rule, RuleField, RuleKind, RuleOperator, Trigger, Version};

    /// Midnight UTC on the given day.
    pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    /// `YYYY-MM-DD` for the day `days` before `now`.
    pub fn days_before(now: DateTime<Utc>, days: i64) -> String {
        (now.date_naive() - chrono::Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    /// An uncached release with a magnet link.
    pub fn release(title: &str) -> Release {
        Release::new(
            "[mock]",
            title,
            2.0,
            vec![format!(
                "magnet:?xt=urn:btih:{:040x}",
                title.len() as u128 * 7919
            )],
            25,
        )
    }

    /// A release the backend already holds.
    pub fn cached_release(title: &str) -> Release {
        let mut release = release(title);
        release.cached = vec!["mock".to_string()];
        release
    }

    /// A movie with an IMDb id, released on `date`.
    pub fn movie(title: &str, year: i32, imdb: &str, date: &str) -> MediaItem {
        let mut movie = MediaItem::new(MediaKind::Movie, title);
        movie.year = Some(year);
        movie.eids = vec![format!("imdb://{}", imdb)];
        movie.originally_available_at = Some(date.to_string());
        movie
    }

    /// A show with `(season, episode count)` seasons, every episode aired on `date`.
    pub fn show(title: &str, year: i32, imdb: &str, seasons: &[(u32, u32)], date: &str) -> MediaItem {
        let mut show = MediaItem::new(MediaKind::Show, title);
        show.year = Some(year);
        show.eids = vec![format!("imdb://{}", imdb)];
        show.originally_available_at = Some(date.to_string());
        for &(index, episodes) in seasons {
            let mut season = MediaItem::new(MediaKind::Season, format!("Season {}", index));
            season.index = Some(index);
            season.parent = Some(show.as_lineage());
            season.originally_available_at = Some(date.to_string());
            season.leaf_count = Some(episodes);
            for e in 1..=episodes {
                let mut episode = MediaItem::new(MediaKind::Episode, format!("Episode {}", e));
                episode.index = Some(e);
                episode.parent = Some(season.as_lineage());
                episode.grandparent = Some(show.as_lineage());
                episode.originally_available_at = Some(date.to_string());
                season.children.push(episode);
            }
            show.children.push(season);
        }
        show.leaf_count = Some(seasons.iter().map(|&(_, e)| e).sum());
        show
    }

    /// A profile accepting anything up to 4K, retried `retries` times.
    pub fn version(name: &str, retries: u32) -> Version {
        let mut version = Version::new(
            name,
            vec![
                Rule::new(RuleField::Resolution, RuleKind::Requirement, RuleOperator::Le, "2160"),
                Rule::new(RuleField::Resolution, RuleKind::Preference, RuleOperator::Highest, ""),
                Rule::new(RuleField::Seeders, RuleKind::Preference, RuleOperator::Highest, ""),
            ],
        );
        if retries > 0 {
            version.triggers = vec![Trigger::RetriesAtMost { count: retries }];
        }
        version
    }

    /// A profile that only takes cached releases.
    pub fn cached_only_version(name: &str) -> Version {
        let mut version = version(name, 0);
        version.rules.push(Rule::new(
            RuleField::CacheStatus,
            RuleKind::Requirement,
            RuleOperator::Cached,
            "",
        ));
        version
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}
