//! Acquisition flow integration tests.
//!
//! These tests drive the orchestrator through complete cycles against mock
//! collaborators: search, arbitration, submission, retry tracking, watchlist
//! removal and the 4K upgrade sweep.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use selectarr_core::{
    testing::{
        fixtures, MockCatalogAdapter, MockDownloadBackend, MockIgnoreService, MockLibrary,
        MockReleaseSource, MockStatusService, MockWatchlist,
    },
    version::{RuleField, RuleKind, RuleOperator, Trigger},
    Autoremove, MediaItem, Orchestrator, OrchestratorConfig, PolicySettings, PolicyStore,
    ReleasePolicy, Rule, SessionState, ShowStatus, Version, VersionEngine,
};

/// Test helper holding every mock the orchestrator talks to.
struct TestHarness {
    source: Arc<MockReleaseSource>,
    backend: Arc<MockDownloadBackend>,
    library: Arc<MockLibrary>,
    watchlist: Arc<MockWatchlist>,
    status: Arc<MockStatusService>,
    ignore: Arc<MockIgnoreService>,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            source: Arc::new(MockReleaseSource::new()),
            backend: Arc::new(MockDownloadBackend::new()),
            library: Arc::new(MockLibrary::new()),
            watchlist: Arc::new(MockWatchlist::new()),
            status: Arc::new(MockStatusService::new()),
            ignore: Arc::new(MockIgnoreService::new()),
        }
    }

    fn orchestrator(&self, versions: Vec<Version>) -> Orchestrator {
        self.orchestrator_with(versions, OrchestratorConfig::default())
    }

    fn orchestrator_with(&self, versions: Vec<Version>, config: OrchestratorConfig) -> Orchestrator {
        let policy = ReleasePolicy::new(Arc::new(PolicyStore::in_memory()), PolicySettings::default());
        Orchestrator::new(
            config,
            VersionEngine::new(versions),
            Arc::new(SessionState::new()),
            Arc::new(policy),
            Arc::clone(&self.library) as Arc<dyn selectarr_core::Library>,
            Arc::clone(&self.backend) as Arc<dyn selectarr_core::DownloadBackend>,
        )
        .with_source(Arc::clone(&self.source) as Arc<dyn selectarr_core::ReleaseSource>)
        .with_watchlist(Arc::clone(&self.watchlist) as Arc<dyn selectarr_core::Watchlist>)
        .with_status(Arc::clone(&self.status) as Arc<dyn selectarr_core::StatusService>)
        .with_ignore_service(Arc::clone(&self.ignore) as Arc<dyn selectarr_core::IgnoreService>)
    }

    /// Offer `title` from the source as a cached release.
    async fn offer_cached(&self, title: &str) {
        self.source.add_release(fixtures::release(title)).await;
        self.backend.set_cached(title).await;
    }

    async fn submitted(&self) -> Vec<String> {
        self.backend
            .downloads()
            .await
            .into_iter()
            .map(|d| d.release)
            .collect()
    }
}

fn now() -> DateTime<Utc> {
    fixtures::at(2024, 6, 1)
}

fn heat() -> MediaItem {
    fixtures::movie("Heat", 1995, "tt0113277", "1995-12-15")
}

fn the_wire(seasons: &[(u32, u32)]) -> MediaItem {
    fixtures::show("The Wire", 2002, "tt0306414", seasons, "2002-06-02")
}

fn ended(expected_episodes: u32) -> ShowStatus {
    ShowStatus {
        tmdb_id: Some(1438),
        status: Some("Ended".to_string()),
        in_production: Some(false),
        ended: true,
        expected_episodes: Some(expected_episodes),
        expected_source: Some("tmdb_seasons".to_string()),
        source: "tmdb".to_string(),
        checked_at: now().timestamp(),
    }
}

#[tokio::test]
async fn test_movie_cached_release_is_submitted_and_removed() {
    let harness = TestHarness::new();
    harness.offer_cached("Heat.1995.1080p.BluRay.x264").await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let mut movie = heat();
    let outcome = orchestrator.process(&mut movie, now()).await;

    assert!(outcome.refreshed);
    assert!(!outcome.should_retry);

    let downloads = harness.backend.downloads().await;
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].release, "Heat.1995.1080p.BluRay.x264");
    assert!(downloads[0].stream);
    assert!(!downloads[0].force);

    assert_eq!(harness.watchlist.removed().await, vec!["Heat".to_string()]);
    assert_eq!(harness.library.refreshed().await, vec!["Heat".to_string()]);
    assert!(orchestrator.session().is_downloaded("Heat.1995 [1080]").await);
}

#[tokio::test]
async fn test_movie_autoremove_disabled_keeps_watchlist() {
    let harness = TestHarness::new();
    harness.offer_cached("Heat.1995.1080p.BluRay.x264").await;
    let config = OrchestratorConfig {
        autoremove: Autoremove::Show,
        ..Default::default()
    };
    let orchestrator = harness.orchestrator_with(vec![fixtures::version("1080", 0)], config);

    let outcome = orchestrator.process(&mut heat(), now()).await;

    assert!(outcome.refreshed);
    assert!(harness.watchlist.removed().await.is_empty());
}

#[tokio::test]
async fn test_movie_searches_drifted_years() {
    let harness = TestHarness::new();
    harness.backend.set_cached("Heat.1994.1080p.WEB").await;
    harness
        .source
        .set_query_handler(|query| {
            (query == "Heat.1994").then(|| vec![fixtures::release("Heat.1994.1080p.WEB")])
        })
        .await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator.process(&mut heat(), now()).await;

    assert!(outcome.refreshed);
    assert_eq!(
        harness.source.queries().await,
        vec!["Heat.1995", "tt0113277", "Heat.1994"]
    );
    assert_eq!(harness.submitted().await, vec!["Heat.1994.1080p.WEB"]);
}

#[tokio::test]
async fn test_uncached_release_needs_uncached_version() {
    let harness = TestHarness::new();
    harness
        .source
        .add_release(fixtures::release("Heat.1995.1080p.BluRay.x264"))
        .await;

    let cached_only = harness.orchestrator(vec![fixtures::cached_only_version("cached")]);
    let outcome = cached_only.process(&mut heat(), now()).await;
    assert!(!outcome.refreshed);
    assert!(outcome.should_retry);
    assert_eq!(harness.backend.download_count().await, 0);

    let any = harness.orchestrator(vec![fixtures::version("1080", 0)]);
    let outcome = any.process(&mut heat(), now()).await;
    assert!(outcome.refreshed);
    let downloads = harness.backend.downloads().await;
    assert_eq!(downloads.len(), 1);
    assert!(!downloads[0].stream);
}

#[tokio::test]
async fn test_retries_suppress_at_threshold() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 3)]);
    let key = heat().media_key();

    let outcome = orchestrator.process(&mut heat(), now()).await;
    assert!(outcome.should_retry);
    assert_eq!(orchestrator.session().failures(&key).await, 1);
    assert_eq!(
        harness.source.queries().await,
        vec!["Heat.1995", "tt0113277", "Heat.1994", "Heat.1996"]
    );

    orchestrator.process(&mut heat(), now()).await;
    assert_eq!(orchestrator.session().failures(&key).await, 2);
    assert!(!orchestrator.session().is_suppressed(&key).await);

    orchestrator.process(&mut heat(), now()).await;
    assert!(orchestrator.session().is_suppressed(&key).await);
    assert_eq!(orchestrator.session().failures(&key).await, 0);
    assert_eq!(harness.ignore.added().await, vec![key.clone()]);

    let scrapes = harness.source.scrape_count().await;
    let outcome = orchestrator.process(&mut heat(), now()).await;
    assert!(!outcome.refreshed);
    assert!(!outcome.should_retry);
    assert_eq!(harness.source.scrape_count().await, scrapes);
}

#[tokio::test]
async fn test_retries_gated_version_gets_its_attempt() {
    let harness = TestHarness::new();
    harness.offer_cached("Heat.1995.1080p.BluRay.x264").await;
    let mut uhd = Version::new(
        "2160",
        vec![Rule::new(RuleField::Resolution, RuleKind::Requirement, RuleOperator::Ge, "2160")],
    );
    uhd.triggers = vec![Trigger::RetriesAtMost { count: 3 }];
    let mut hd = Version::new(
        "1080",
        vec![Rule::new(RuleField::Resolution, RuleKind::Requirement, RuleOperator::Le, "1080")],
    );
    hd.triggers = vec![Trigger::RetriesAtLeast { count: 3 }];
    let orchestrator = harness.orchestrator(vec![uhd, hd]);
    let key = heat().media_key();

    for attempt in 1..=3 {
        let outcome = orchestrator.process(&mut heat(), now()).await;
        assert!(outcome.should_retry);
        assert_eq!(orchestrator.session().failures(&key).await, attempt);
        assert!(!orchestrator.session().is_suppressed(&key).await);
    }
    assert!(harness.submitted().await.is_empty());

    let outcome = orchestrator.process(&mut heat(), now()).await;
    assert!(outcome.refreshed);
    assert!(!outcome.should_retry);
    assert_eq!(harness.submitted().await, vec!["Heat.1995.1080p.BluRay.x264"]);
    assert!(orchestrator.session().is_downloaded("Heat.1995 [1080]").await);
    assert!(!orchestrator.session().is_suppressed(&key).await);
}

#[tokio::test]
async fn test_version_without_threshold_is_untracked() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);
    let key = heat().media_key();

    for _ in 0..3 {
        let outcome = orchestrator.process(&mut heat(), now()).await;
        assert!(outcome.should_retry);
    }
    assert_eq!(orchestrator.session().failures(&key).await, 0);
    assert!(!orchestrator.session().is_suppressed(&key).await);
}

#[tokio::test]
async fn test_unsuppress_resumes_acquisition() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 1)]);
    let movie = heat();

    orchestrator.process(&mut movie.clone(), now()).await;
    assert!(orchestrator.is_watched(&movie).await);

    assert!(orchestrator.unsuppress(&movie).await);
    assert!(!orchestrator.is_watched(&movie).await);
    assert_eq!(harness.ignore.removed().await, vec![movie.media_key()]);
    assert!(!orchestrator.unsuppress(&movie).await);

    harness.offer_cached("Heat.1995.2160p.UHD.BluRay").await;
    let outcome = orchestrator.process(&mut movie.clone(), now()).await;
    assert!(outcome.refreshed);
}

#[tokio::test]
async fn test_ignore_service_skips_item() {
    let harness = TestHarness::new();
    harness.offer_cached("Heat.1995.1080p.BluRay.x264").await;
    harness.ignore.ignore(&heat()).await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator.process(&mut heat(), now()).await;

    assert!(!outcome.refreshed);
    assert_eq!(harness.source.scrape_count().await, 0);
}

#[tokio::test]
async fn test_catalog_without_match_skips_item() {
    let harness = TestHarness::new();
    harness.offer_cached("Heat.1995.1080p.BluRay.x264").await;
    let catalog = Arc::new(MockCatalogAdapter::new("plex"));
    let orchestrator = harness
        .orchestrator(vec![fixtures::version("1080", 0)])
        .with_catalog(Arc::clone(&catalog) as Arc<dyn selectarr_core::CatalogAdapter>);

    let outcome = orchestrator.process(&mut heat(), now()).await;
    assert!(!outcome.refreshed);
    assert_eq!(catalog.lookup_count().await, 1);
    assert_eq!(harness.source.scrape_count().await, 0);

    catalog.add_record(heat()).await;
    let mut movie = heat();
    let outcome = orchestrator.process(&mut movie, now()).await;
    assert!(outcome.refreshed);
    assert!(movie.services.contains(&"plex".to_string()));
}

#[tokio::test]
async fn test_season_pack_preferred_when_episodes_are_worse() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01.1080p.BluRay.x264").await;
    harness.offer_cached("The.Wire.S01E01.720p.WEB").await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator.process(&mut the_wire(&[(1, 3)]), now()).await;

    assert!(outcome.refreshed);
    assert!(!outcome.should_retry);
    assert_eq!(harness.submitted().await, vec!["The.Wire.S01.1080p.BluRay.x264"]);
    for e in 1..=3 {
        let key = format!("The.Wire.S01E{:02}. [1080]", e);
        assert!(orchestrator.session().is_downloaded(&key).await, "{}", key);
    }
}

#[tokio::test]
async fn test_episodes_preferred_over_lower_resolution_pack() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01.720p.HDTV").await;
    for e in 1..=3 {
        harness
            .offer_cached(&format!("The.Wire.S01E{:02}.1080p.WEB", e))
            .await;
    }
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator.process(&mut the_wire(&[(1, 3)]), now()).await;

    assert!(outcome.refreshed);
    let mut submitted = harness.submitted().await;
    submitted.sort();
    assert_eq!(
        submitted,
        vec![
            "The.Wire.S01E01.1080p.WEB",
            "The.Wire.S01E02.1080p.WEB",
            "The.Wire.S01E03.1080p.WEB",
        ]
    );
}

#[tokio::test]
async fn test_small_season_goes_episode_by_episode() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01.1080p.BluRay.x264").await;
    harness.offer_cached("The.Wire.S01E01.720p.WEB").await;
    harness.offer_cached("The.Wire.S01E02.720p.WEB").await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator.process(&mut the_wire(&[(1, 2)]), now()).await;

    assert!(outcome.refreshed);
    let mut submitted = harness.submitted().await;
    submitted.sort();
    assert_eq!(
        submitted,
        vec!["The.Wire.S01E01.720p.WEB", "The.Wire.S01E02.720p.WEB"]
    );
}

#[tokio::test]
async fn test_pending_pack_waits_for_library() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01.1080p.BluRay.x264").await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    orchestrator.process(&mut the_wire(&[(1, 3)]), now()).await;
    assert_eq!(harness.backend.download_count().await, 1);

    let later = now() + Duration::minutes(30);
    let outcome = orchestrator.process(&mut the_wire(&[(1, 3)]), later).await;
    assert!(outcome.refreshed);
    assert!(outcome.should_retry);
    assert_eq!(harness.backend.download_count().await, 1);
}

#[tokio::test]
async fn test_multi_season_pack_covers_show() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01-S04.1080p.BluRay.x264").await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator
        .process(&mut the_wire(&[(1, 2), (2, 2), (3, 2), (4, 2)]), now())
        .await;

    assert!(outcome.refreshed);
    assert!(!outcome.should_retry);
    assert_eq!(harness.submitted().await, vec!["The.Wire.S01-S04.1080p.BluRay.x264"]);
    assert!(orchestrator
        .session()
        .is_downloaded("The.Wire.S03E02. [1080]")
        .await);
}

#[tokio::test]
async fn test_multi_season_pack_logs_only_covered_seasons() {
    let harness = TestHarness::new();
    harness.offer_cached("The.Wire.S01-S02.1080p.BluRay.x264").await;
    for episode in ["S03E01", "S03E02", "S04E01", "S04E02"] {
        harness
            .offer_cached(&format!("The.Wire.{}.1080p.WEB.x264", episode))
            .await;
    }
    let orchestrator = harness.orchestrator(vec![
        fixtures::version("A", 0),
        fixtures::version("B", 0),
    ]);

    orchestrator
        .process(&mut the_wire(&[(1, 2), (2, 2), (3, 2), (4, 2)]), now())
        .await;

    let submitted = harness.submitted().await;
    assert!(submitted.contains(&"The.Wire.S01-S02.1080p.BluRay.x264".to_string()));
    assert!(submitted.contains(&"The.Wire.S03E01.1080p.WEB.x264".to_string()));

    let session = orchestrator.session();
    assert!(session.is_downloaded("The.Wire.S02E02. [A]").await);
    // Seasons outside the pack are acquired under the first version
    assert!(session.is_downloaded("The.Wire.S03E01. [A]").await);
    assert!(!session.is_downloaded("The.Wire.S03E01. [B]").await);
    assert!(session.is_downloaded("The.Wire.S04E02. [A]").await);
    assert!(!session.is_downloaded("The.Wire.S04E02. [B]").await);
}

#[tokio::test]
async fn test_ended_complete_show_is_removed() {
    let harness = TestHarness::new();
    harness.library.add_item(the_wire(&[(1, 2)])).await;
    harness.offer_cached("The.Wire.S00E01.1080p.WEB").await;
    harness.status.set_status(Some(ended(2))).await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator
        .process(&mut the_wire(&[(0, 1), (1, 2)]), now())
        .await;

    assert!(outcome.refreshed);
    assert_eq!(harness.submitted().await, vec!["The.Wire.S00E01.1080p.WEB"]);
    assert_eq!(harness.status.lookups().await, vec!["The Wire".to_string()]);
    assert_eq!(harness.watchlist.removed().await, vec!["The Wire".to_string()]);
}

#[tokio::test]
async fn test_ended_show_with_missing_episodes_is_kept() {
    let harness = TestHarness::new();
    harness.library.add_item(the_wire(&[(1, 2)])).await;
    harness.offer_cached("The.Wire.S00E01.1080p.WEB").await;
    harness.status.set_status(Some(ended(10))).await;
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);

    let outcome = orchestrator
        .process(&mut the_wire(&[(0, 1), (1, 2)]), now())
        .await;

    assert!(outcome.refreshed);
    assert!(harness.watchlist.removed().await.is_empty());
}

#[tokio::test]
async fn test_fresh_movie_waits_for_4k_then_upgrades() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 3)]);
    let released = fixtures::days_before(now(), 30);
    let movie = fixtures::movie("New Movie", 2024, "tt9000001", &released);
    let key = movie.media_key();
    harness.offer_cached("New.Movie.2024.1080p.WEB").await;

    // The timer starts and filters out everything below 4K without counting a failure.
    let outcome = orchestrator.process(&mut movie.clone(), now()).await;
    assert!(!outcome.refreshed);
    assert!(outcome.should_retry);
    assert_eq!(harness.backend.download_count().await, 0);
    assert_eq!(orchestrator.session().failures(&key).await, 0);
    assert_eq!(
        orchestrator.policy().timer_started(&movie).await,
        Some(now().timestamp())
    );

    // Once the window has passed the 1080p release goes through and is queued.
    let expired = now() + Duration::days(3);
    let outcome = orchestrator.process(&mut movie.clone(), expired).await;
    assert!(outcome.refreshed);
    assert_eq!(harness.submitted().await, vec!["New.Movie.2024.1080p.WEB"]);
    let queue = orchestrator.policy().store().snapshot().await.upgrade_queue;
    assert_eq!(queue[&key].query, "New.Movie.2024");

    // Too early for the next check.
    harness.offer_cached("New.Movie.2024.2160p.WEB").await;
    let report = orchestrator
        .run_upgrade_sweep(expired + Duration::days(1))
        .await;
    assert_eq!(report.checked, 0);

    let report = orchestrator
        .run_upgrade_sweep(expired + Duration::days(8))
        .await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.upgraded, 1);
    assert_eq!(
        harness.submitted().await,
        vec!["New.Movie.2024.1080p.WEB", "New.Movie.2024.2160p.WEB"]
    );
    assert!(orchestrator.policy().store().snapshot().await.upgrade_queue.is_empty());
}

#[tokio::test]
async fn test_anime_upgrade_entry_keeps_anime_query() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);
    let released = fixtures::days_before(now(), 400);
    let mut movie = fixtures::movie("Perfect Blue", 2023, "tt9000003", &released);
    movie.genres = vec!["Anime".to_string()];
    harness.offer_cached("Perfect.Blue.2023.1080p.BluRay.x264").await;

    orchestrator.process(&mut movie.clone(), now()).await;

    assert!(harness
        .source
        .queries()
        .await
        .contains(&"Perfect Blue 2023".to_string()));
    let queue = orchestrator.policy().store().snapshot().await.upgrade_queue;
    assert_eq!(queue[&movie.media_key()].query, "Perfect Blue 2023");
}

#[tokio::test]
async fn test_upgrade_sweep_without_4k_keeps_entry() {
    let harness = TestHarness::new();
    let orchestrator = harness.orchestrator(vec![fixtures::version("1080", 0)]);
    let released = fixtures::days_before(now(), 400);
    let movie = fixtures::movie("Old Movie", 2023, "tt9000002", &released);
    harness.offer_cached("Old.Movie.2023.1080p.WEB").await;

    orchestrator.process(&mut movie.clone(), now()).await;
    assert_eq!(orchestrator.policy().store().snapshot().await.upgrade_queue.len(), 1);

    let later = now() + Duration::days(8);
    let report = orchestrator.run_upgrade_sweep(later).await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.upgraded, 0);

    let queue = orchestrator.policy().store().snapshot().await.upgrade_queue;
    assert_eq!(queue[&movie.media_key()].last_checked, later.timestamp());
}
