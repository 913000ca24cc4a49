//! Acquisition orchestrator implementation.
//!
//! One call to [`Orchestrator::process`] handles one watchlist item:
//! - **Movie**: title search with year drift, then submission
//! - **Show**: show-level search, multi-season arbitration, then one task per season
//! - **Season**: pack arbitration against per-episode releases, then episodes
//! - **Episode**: inherited releases first, an individual search otherwise

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::future::join_all;
use regex_lite::Regex;
use tracing::{debug, error, info, warn};

use crate::download::DownloadBackend;
use crate::library::{CatalogAdapter, Library, MetadataService, Watchlist};
use crate::media::{
    self, alternate_titles, assign_anime_numbering, compile_deviation, deviation,
    deviation_for_year, is_anime, match_item, rename, MediaItem, MediaKind, MergeOptions,
};
use crate::metrics::{ACQUISITIONS_TOTAL, RETRY_TRANSITIONS, UPGRADE_SWEEP_RESULTS};
use crate::policy::{PolicyDecision, ReleasePolicy};
use crate::release::{is_4k, is_multi_season_pack, is_season_pack, season_range, Release};
use crate::searcher::{ReleaseSource, TargetIds};
use crate::state::{IgnoreService, RetryTransition, SessionState};
use crate::status::{is_show_complete, StatusService};
use crate::version::{ledger_key, SessionView, Version, VersionEngine};

use super::arbitration::{best_cached_resolution, prefer_pack, unit_best};
use super::config::OrchestratorConfig;
use super::types::{Acquisition, Outcome, SweepReport};

/// Alternate titles tried per show, season or episode search.
const MAX_SEARCH_TITLES: usize = 3;

/// Per-call context: the library as it was when the call started.
struct Cycle {
    library: Vec<MediaItem>,
    now: DateTime<Utc>,
}

impl Cycle {
    fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

fn merge_releases(into: &mut Vec<Release>, found: Vec<Release>) {
    for release in found {
        if !into.iter().any(|r| r.title == release.title) {
            into.push(release);
        }
    }
}

fn near_release(item: &MediaItem, today: NaiveDate) -> bool {
    item.release_date().is_some_and(|date| {
        let days = (today - date).num_days();
        match item.kind {
            MediaKind::Movie => (-30..=180).contains(&days),
            _ => (-1..=1).contains(&days),
        }
    })
}

fn compile(pattern: &str) -> Option<Regex> {
    match compile_deviation(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = %pattern, error = %e, "Invalid deviation pattern");
            None
        }
    }
}

/// Whether a multi-season pack spanning `range` covers `season`. A pack
/// without a parsable range covers every season.
fn pack_covers(range: Option<(u32, u32)>, season: &MediaItem) -> bool {
    range.is_none_or(|(first, last)| (first..=last).contains(&season.index.unwrap_or(0)))
}

/// Whether a season should be taken as one pack rather than episode by episode.
fn season_prefers_pack(season: &MediaItem, releases: &[Release]) -> bool {
    let pack = best_cached_resolution(releases.iter().filter(|r| is_season_pack(&r.title)));
    let floor = pack.unwrap_or(0);
    let bests: Vec<Option<u32>> = season
        .children
        .iter()
        .map(|episode| {
            compile(&deviation(episode)).and_then(|re| unit_best(releases, floor, &re))
        })
        .collect();
    let preferred = prefer_pack(pack, &bests);
    debug!(
        season = %season.query(),
        pack = ?pack,
        episodes = ?bests,
        preferred,
        "Season pack arbitration"
    );
    preferred
}

/// Drives wanted items through search, selection and submission.
pub struct Orchestrator {
    config: OrchestratorConfig,
    engine: VersionEngine,
    session: Arc<SessionState>,
    policy: Arc<ReleasePolicy>,
    library: Arc<dyn Library>,
    backend: Arc<dyn DownloadBackend>,
    sources: Vec<Arc<dyn ReleaseSource>>,
    catalogs: Vec<Arc<dyn CatalogAdapter>>,
    merge: MergeOptions,
    metadata: Option<Arc<dyn MetadataService>>,
    watchlist: Option<Arc<dyn Watchlist>>,
    status: Option<Arc<dyn StatusService>>,
    ignore_services: Vec<Arc<dyn IgnoreService>>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        engine: VersionEngine,
        session: Arc<SessionState>,
        policy: Arc<ReleasePolicy>,
        library: Arc<dyn Library>,
        backend: Arc<dyn DownloadBackend>,
    ) -> Self {
        Self {
            config,
            engine,
            session,
            policy,
            library,
            backend,
            sources: Vec::new(),
            catalogs: Vec::new(),
            merge: MergeOptions::default(),
            metadata: None,
            watchlist: None,
            status: None,
            ignore_services: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ReleaseSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Add a catalog every item is merged with before acquisition.
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogAdapter>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    /// Name the watchlist service items originally come from.
    pub fn with_request_service(mut self, name: impl Into<String>) -> Self {
        self.merge.request_service = Some(name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataService>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_watchlist(mut self, watchlist: Arc<dyn Watchlist>) -> Self {
        self.watchlist = Some(watchlist);
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusService>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_ignore_service(mut self, service: Arc<dyn IgnoreService>) -> Self {
        self.ignore_services.push(service);
        self
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn policy(&self) -> &Arc<ReleasePolicy> {
        &self.policy
    }

    pub fn engine(&self) -> &VersionEngine {
        &self.engine
    }

    /// Process one wanted item.
    pub async fn process(&self, item: &mut MediaItem, now: DateTime<Utc>) -> Outcome {
        if self.is_watched(item).await {
            debug!(key = %item.media_key(), "Item is suppressed, skipping");
            ACQUISITIONS_TOTAL
                .with_label_values(&[item.kind.as_str(), "skipped"])
                .inc();
            return Outcome::default();
        }

        for catalog in &self.catalogs {
            match match_item(item, catalog.as_ref(), &self.merge).await {
                Ok(true) => {}
                Ok(false) => {
                    warn!(
                        service = catalog.name(),
                        title = %item.title,
                        "No catalog match, skipping item this cycle"
                    );
                    return Outcome::default();
                }
                Err(e) => {
                    warn!(
                        service = catalog.name(),
                        title = %item.title,
                        error = %e,
                        "Catalog lookup failed, skipping item this cycle"
                    );
                    return Outcome::default();
                }
            }
        }

        let cycle = Cycle {
            library: self.library.snapshot().await,
            now,
        };
        self.load_failures(item).await;
        self.load_availability(item, cycle.today()).await;

        let outcome = match item.kind {
            MediaKind::Movie => self.process_movie(item, &cycle).await,
            MediaKind::Show => self.process_show(item, &cycle).await,
            MediaKind::Season => {
                if !self.still_wanted(item, &cycle).await {
                    return Outcome::default();
                }
                item.children = self
                    .with_view(&cycle, |view| self.engine.uncollected(item, view))
                    .await;
                self.process_season(item, &[], &cycle).await
            }
            MediaKind::Episode => {
                if !self.still_wanted(item, &cycle).await {
                    return Outcome::default();
                }
                self.process_episode(item, &[], &cycle).await
            }
        };

        if outcome.refreshed {
            if let Err(e) = self.library.refresh(item).await {
                warn!(title = %item.title, error = %e, "Library refresh failed");
            }
        }
        info!(
            kind = %item.kind,
            title = %item.title,
            refreshed = outcome.refreshed,
            retry = outcome.should_retry,
            "Processed item"
        );
        outcome
    }

    /// Re-check queued 1080p acquisitions for a 4K release.
    pub async fn run_upgrade_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let due = self.policy.due_upgrades(now).await;
        let mut report = SweepReport::default();
        if due.is_empty() {
            return report;
        }

        let cycle = Cycle {
            library: self.library.snapshot().await,
            now,
        };
        for (key, entry) in due {
            report.checked += 1;
            let mut item = entry.to_item();
            let ids = TargetIds::from_item(&item);
            let mut releases = self.scrape(&entry.query, &entry.altquery, Some(&ids)).await;
            releases.retain(is_4k);
            if releases.is_empty() {
                debug!(key = %key, "No 4K release yet");
                UPGRADE_SWEEP_RESULTS.with_label_values(&["not_found"]).inc();
                self.policy.finish_upgrade(&key, false, now).await;
                continue;
            }

            self.check(&mut releases).await;
            item.releases = releases;
            item.existing_releases.clear();
            item.downloaded_releases.clear();
            let acquisition = self.debrid_download(&mut item, false, &cycle).await;
            self.policy
                .finish_upgrade(&key, acquisition.downloaded, now)
                .await;
            if acquisition.downloaded {
                info!(key = %key, "Upgraded to 4K");
                UPGRADE_SWEEP_RESULTS.with_label_values(&["upgraded"]).inc();
                report.upgraded += 1;
                if let Err(e) = self.library.refresh(&item).await {
                    warn!(key = %key, error = %e, "Library refresh failed");
                }
            } else {
                UPGRADE_SWEEP_RESULTS.with_label_values(&["failed"]).inc();
            }
        }
        report
    }

    /// Explicitly reverse a suppression.
    pub async fn unsuppress(&self, item: &MediaItem) -> bool {
        let removed = self.session.unsuppress(&item.media_key()).await;
        for service in &self.ignore_services {
            service.remove(item).await;
        }
        if removed {
            info!(key = %item.media_key(), "Unsuppressed item");
            RETRY_TRANSITIONS.with_label_values(&["cleared"]).inc();
        }
        removed
    }

    /// Whether the item is suppressed here or by any ignore service.
    pub async fn is_watched(&self, item: &MediaItem) -> bool {
        if self.session.is_suppressed(&item.media_key()).await {
            return true;
        }
        for service in &self.ignore_services {
            if service.check(item).await {
                debug!(service = service.name(), title = %item.title, "Ignored by service");
                return true;
            }
        }
        false
    }

    async fn with_view<R>(&self, cycle: &Cycle, f: impl FnOnce(&SessionView<'_>) -> R) -> R {
        let snapshot = self.session.snapshot().await;
        let view = snapshot.view(&cycle.library, self.library.tracks_files(), cycle.today());
        f(&view)
    }

    async fn still_wanted(&self, item: &MediaItem, cycle: &Cycle) -> bool {
        self.with_view(cycle, |view| {
            !self.engine.versions(item, view).is_empty()
                && !self.engine.uncollected(item, view).is_empty()
        })
        .await
    }

    async fn load_failures(&self, item: &mut MediaItem) {
        item.flags.ignored_count = self.session.failures(&item.media_key()).await;
        for child in &mut item.children {
            child.flags.ignored_count = self.session.failures(&child.media_key()).await;
            for grandchild in &mut child.children {
                grandchild.flags.ignored_count =
                    self.session.failures(&grandchild.media_key()).await;
            }
        }
    }

    /// Ask the metadata service about items close to their release date.
    async fn load_availability(&self, item: &mut MediaItem, today: NaiveDate) {
        let Some(metadata) = &self.metadata else {
            return;
        };
        match item.kind {
            MediaKind::Movie | MediaKind::Episode => {
                if near_release(item, today) {
                    item.flags.available = metadata.available(item).await;
                }
            }
            MediaKind::Season | MediaKind::Show => {
                let episodes: Vec<&mut MediaItem> = if item.kind == MediaKind::Season {
                    item.children.iter_mut().collect()
                } else {
                    item.children
                        .iter_mut()
                        .flat_map(|s| s.children.iter_mut())
                        .collect()
                };
                for episode in episodes {
                    if near_release(episode, today) {
                        episode.flags.available = metadata.available(episode).await;
                    }
                }
            }
        }
    }

    async fn load_aliases(&self, item: &mut MediaItem, versions: &[Version]) {
        let mut aliases = Vec::new();
        if let Some(metadata) = &self.metadata {
            let mut langs: Vec<&str> = Vec::new();
            for version in versions {
                if version.lang != "en" && !langs.contains(&version.lang.as_str()) {
                    langs.push(&version.lang);
                }
            }
            langs.push("en");
            for lang in langs {
                aliases.extend(metadata.aliases(item, lang).await);
            }
        }
        let titles = alternate_titles(item, &aliases);
        item.set_alternate_titles(&titles);
    }

    /// Query every source; a failing source contributes nothing.
    async fn scrape(&self, query: &str, pattern: &str, ids: Option<&TargetIds>) -> Vec<Release> {
        let mut releases = Vec::new();
        for source in &self.sources {
            match source.scrape(query, pattern, ids).await {
                Ok(found) => merge_releases(&mut releases, found),
                Err(e) => warn!(
                    source = source.name(),
                    query = %query,
                    error = %e,
                    "Scrape failed"
                ),
            }
        }
        releases
    }

    /// Search the item under up to three alternate titles, stopping at the
    /// first title that finds anything. An IMDb id search supplements a
    /// thin first result.
    async fn scrape_titles(
        &self,
        item: &MediaItem,
        pattern: &str,
        imdb_fallback: bool,
    ) -> Vec<Release> {
        let ids = TargetIds::from_item(item);
        let anime = item.anime.is_some() || is_anime(item);
        let mut releases = Vec::new();
        for (k, title) in item
            .search_titles()
            .iter()
            .take(MAX_SEARCH_TITLES)
            .enumerate()
        {
            let query = if anime && k == 0 {
                item.anime_query()
            } else {
                item.query_for(title)
            };
            let query = match item.kind {
                MediaKind::Season => query.trim_end_matches('.').to_string(),
                _ => query,
            };
            merge_releases(&mut releases, self.scrape(&query, pattern, Some(&ids)).await);

            if imdb_fallback && k == 0 && releases.len() < self.config.imdb_fallback_threshold {
                if let Some(imdb) = item.imdb_id() {
                    let found = self
                        .scrape(imdb, &format!("(.*|{})", imdb), Some(&ids))
                        .await;
                    merge_releases(&mut releases, found);
                }
            }
            if !releases.is_empty() {
                break;
            }
        }
        releases
    }

    async fn check(&self, releases: &mut [Release]) {
        if releases.is_empty() {
            return;
        }
        if let Err(e) = self.backend.check(releases).await {
            warn!(backend = self.backend.name(), error = %e, "Cache check failed");
        }
    }

    async fn process_movie(&self, movie: &mut MediaItem, cycle: &Cycle) -> Outcome {
        let Some(year) = movie.year.filter(|_| !movie.title.trim().is_empty()) else {
            error!(title = %movie.title, "Movie is missing title or year, skipping");
            return Outcome::default();
        };

        let (versions, wanted) = self
            .with_view(cycle, |view| {
                (
                    self.engine.versions(movie, view),
                    !self.engine.uncollected(movie, view).is_empty(),
                )
            })
            .await;
        if versions.is_empty() || !wanted {
            return Outcome::default();
        }

        self.load_aliases(movie, &versions).await;
        let ids = TargetIds::from_item(movie);
        let mut releases = Vec::new();
        let mut imdb_scraped = false;
        'years: for drifted in [year, year - 1, year + 1] {
            let pattern = deviation_for_year(movie, Some(drifted));
            for _ in 0..=self.config.scrape_retries {
                for (k, title) in movie.search_titles().iter().enumerate() {
                    let query = format!("{}.{}", rename(title), drifted);
                    merge_releases(&mut releases, self.scrape(&query, &pattern, Some(&ids)).await);

                    if k == 0
                        && !imdb_scraped
                        && releases.len() < self.config.imdb_fallback_threshold
                    {
                        if let Some(imdb) = movie.imdb_id() {
                            let found = self
                                .scrape(imdb, &format!("(.*|{})", imdb), Some(&ids))
                                .await;
                            merge_releases(&mut releases, found);
                            imdb_scraped = true;
                        }
                    }
                    if !releases.is_empty() {
                        break 'years;
                    }
                }
            }
        }

        self.check(&mut releases).await;
        movie.releases = releases;
        let acquisition = self.debrid_download(movie, false, cycle).await;
        self.conclude(movie, acquisition).await
    }

    async fn process_show(&self, show: &mut MediaItem, cycle: &Cycle) -> Outcome {
        if show.title.trim().is_empty() {
            error!(key = %show.media_key(), "Show is missing a title, skipping");
            return Outcome::default();
        }

        let (versions, wanted) = self
            .with_view(cycle, |view| {
                let wanted = media::released(show, view.today)
                    && (!media::collected(show, view.library)
                        || self.engine.version_missing(show, view))
                    && !self.engine.watched(show, view);
                (self.engine.versions(show, view), wanted)
            })
            .await;
        if versions.is_empty() || !wanted {
            return Outcome::default();
        }

        assign_anime_numbering(show);
        show.children = self
            .with_view(cycle, |view| self.engine.uncollected(show, view))
            .await;
        if show.children.is_empty() {
            return Outcome::default();
        }
        self.load_aliases(show, &versions).await;

        let mut outcome = Outcome::default();
        let mut parent_releases = Vec::new();
        if show.children.len() > 1 {
            let mut releases = self.scrape_titles(show, &deviation(show), true).await;
            self.check(&mut releases).await;
            parent_releases = releases;

            if show.children.len() >= self.config.multi_season_threshold {
                outcome.absorb(self.take_multi_season_pack(show, &parent_releases, cycle).await);
            }
        }

        // Each season reads only its own subtree; results come back in season order.
        let results = join_all(
            show.children
                .iter_mut()
                .map(|season| self.process_season(season, &parent_releases, cycle)),
        )
        .await;
        for result in results {
            outcome.absorb(result);
        }

        if !outcome.should_retry && self.config.autoremove.covers(MediaKind::Show) {
            self.remove_if_ended(show, cycle).await;
        }
        outcome
    }

    /// Take a multi-season pack when no season can do better on its own.
    /// Seasons the accepted pack covers are removed from the show.
    async fn take_multi_season_pack(
        &self,
        show: &mut MediaItem,
        releases: &[Release],
        cycle: &Cycle,
    ) -> Outcome {
        let packs: Vec<Release> = releases
            .iter()
            .filter(|r| is_multi_season_pack(&r.title))
            .cloned()
            .collect();
        if packs.is_empty() {
            return Outcome::default();
        }

        let pack = best_cached_resolution(&packs);
        let singles: Vec<Release> = releases
            .iter()
            .filter(|r| is_season_pack(&r.title) && !is_multi_season_pack(&r.title))
            .cloned()
            .collect();
        let floor = pack.unwrap_or(0);
        let bests: Vec<Option<u32>> = show
            .children
            .iter()
            .map(|season| compile(&deviation(season)).and_then(|re| unit_best(&singles, floor, &re)))
            .collect();
        if !prefer_pack(pack, &bests) {
            debug!(show = %show.title, pack = ?pack, seasons = ?bests, "Single seasons beat multi-season packs");
            return Outcome::default();
        }

        show.releases = packs;
        let acquisition = self.debrid_download(show, false, cycle).await;
        let Some(accepted) = acquisition.release.filter(|_| acquisition.downloaded) else {
            return Outcome::default();
        };

        let covered = season_range(&accepted.title);
        show.children.retain(|season| !pack_covers(covered, season));
        info!(
            show = %show.title,
            release = %accepted.title,
            remaining_seasons = show.children.len(),
            "Multi-season pack accepted"
        );
        Outcome::new(true, false)
    }

    async fn process_season(
        &self,
        season: &mut MediaItem,
        parent_releases: &[Release],
        cycle: &Cycle,
    ) -> Outcome {
        media::set_file_names(season, &cycle.library);
        let pack_key = season.pack_key();

        let present = self
            .with_view(cycle, |view| {
                season.children.iter().all(|e| {
                    media::collected(e, view.library) && !self.engine.version_missing(e, view)
                })
            })
            .await;
        if present {
            self.session.clear_pack(&pack_key).await;
            season.flags.pack_downloaded = true;
            return Outcome::default();
        }

        let max_wait = Duration::minutes(self.config.pack_wait_minutes);
        if self.session.pack_pending(&pack_key, cycle.now, max_wait).await {
            debug!(pack = %pack_key, "Season pack awaiting the library");
            return Outcome::new(true, true);
        }

        let pattern = deviation(season);
        let Some(re) = compile(&pattern) else {
            return Outcome::default();
        };
        let mut releases: Vec<Release> = parent_releases
            .iter()
            .filter(|r| re.is_match(&r.title))
            .cloned()
            .collect();

        let wants_pack = season.children.len() >= self.config.season_pack_min_episodes;
        let mut acquisition = Acquisition::default();
        if wants_pack && season_prefers_pack(season, &releases) {
            acquisition = self.submit_pack(season, &releases, cycle).await;
        }

        if !acquisition.downloaded {
            let mut fresh = self.scrape_titles(season, &pattern, true).await;
            self.check(&mut fresh).await;
            fresh.retain(|r| re.is_match(&r.title));
            merge_releases(&mut fresh, releases);
            releases = fresh;
            if wants_pack && season_prefers_pack(season, &releases) {
                acquisition = self.submit_pack(season, &releases, cycle).await;
            }
        }

        let mut outcome = Outcome::default();
        if let Some(accepted) = acquisition.release.filter(|_| acquisition.downloaded) {
            outcome.refreshed = true;
            let whole_season = is_season_pack(&accepted.title);
            season.children.retain_mut(|episode| {
                let covered = whole_season || media::matches_deviation(&deviation(episode), &accepted.title);
                if covered {
                    episode.flags.skip_scraping = true;
                }
                !covered
            });
            if season.children.is_empty() {
                return outcome;
            }
        }

        let results = join_all(
            season
                .children
                .iter_mut()
                .map(|episode| self.process_episode(episode, &releases, cycle)),
        )
        .await;
        for result in results {
            outcome.absorb(result);
        }
        outcome
    }

    async fn submit_pack(
        &self,
        season: &mut MediaItem,
        releases: &[Release],
        cycle: &Cycle,
    ) -> Acquisition {
        season.releases = releases
            .iter()
            .filter(|r| is_season_pack(&r.title))
            .cloned()
            .collect();
        self.debrid_download(season, false, cycle).await
    }

    async fn process_episode(
        &self,
        episode: &mut MediaItem,
        parent_releases: &[Release],
        cycle: &Cycle,
    ) -> Outcome {
        if episode.show_title().trim().is_empty() {
            error!(key = %episode.media_key(), "Episode is missing its show title, skipping");
            return Outcome::default();
        }

        let pattern = deviation(episode);
        let Some(re) = compile(&pattern) else {
            return Outcome::default();
        };
        episode.releases = parent_releases
            .iter()
            .filter(|r| re.is_match(&r.title))
            .cloned()
            .collect();

        let mut acquisition = Acquisition {
            retry: true,
            ..Default::default()
        };
        if !episode.releases.is_empty() {
            acquisition = self.debrid_download(episode, false, cycle).await;
        }
        if !acquisition.downloaded && !episode.flags.skip_scraping {
            let mut releases = self.scrape_titles(episode, &pattern, false).await;
            self.check(&mut releases).await;
            episode.releases = releases;
            acquisition = self.debrid_download(episode, false, cycle).await;
        }
        self.conclude(episode, acquisition).await
    }

    /// Submit the item's releases, trying each applicable version's ranking
    /// in turn. The first accepted release wins.
    async fn debrid_download(&self, item: &mut MediaItem, force: bool, cycle: &Cycle) -> Acquisition {
        let mut releases = std::mem::take(&mut item.releases);
        if let Some(duration_ms) = item.duration_ms {
            for release in &mut releases {
                release.set_bitrate(duration_ms);
            }
        }

        let versions = self
            .with_view(cycle, |view| self.engine.versions(item, view))
            .await;
        let (releases, decision) = self
            .policy
            .apply(item, releases, self.engine.all(), cycle.now)
            .await;
        item.flags.force_4k_only = decision.force_4k_only;
        item.flags.force_retries = decision.force_retries;
        item.flags.skip_watch = decision.skip_watch;

        let mut acquisition = Acquisition {
            decision,
            ..Default::default()
        };
        if releases.is_empty() || versions.is_empty() {
            debug!(item = %item.query(), "Nothing to submit");
            acquisition.retry = true;
            item.releases = releases;
            return acquisition;
        }

        for version in &versions {
            let allow_uncached = version.allows_uncached();
            for release in version.sort(releases.clone()) {
                let stream = if release.has_cached_copy() {
                    true
                } else if item.kind != MediaKind::Show && allow_uncached {
                    false
                } else {
                    continue;
                };

                match self.backend.download(item, &release, stream, force).await {
                    Ok(true) => {
                        self.record_acquisition(item, version, &release, stream, cycle)
                            .await;
                        acquisition.downloaded = true;
                        acquisition.version = Some(version.name.clone());
                        item.releases = vec![release.clone()];
                        acquisition.release = Some(release);
                        return acquisition;
                    }
                    Ok(false) => {
                        debug!(release = %release.title, version = %version.name, "Release not accepted");
                    }
                    Err(e) => {
                        warn!(
                            backend = self.backend.name(),
                            release = %release.title,
                            error = %e,
                            "Submission failed"
                        );
                    }
                }
            }
        }

        acquisition.retry = true;
        item.releases = releases;
        acquisition
    }

    async fn record_acquisition(
        &self,
        item: &mut MediaItem,
        version: &Version,
        release: &Release,
        stream: bool,
        cycle: &Cycle,
    ) {
        let keys: Vec<String> = match item.kind {
            MediaKind::Movie | MediaKind::Episode => vec![ledger_key(item, &version.name)],
            MediaKind::Season => item
                .episodes()
                .iter()
                .map(|e| ledger_key(e, &version.name))
                .collect(),
            MediaKind::Show => {
                let covered = season_range(&release.title);
                item.children
                    .iter()
                    .filter(|season| pack_covers(covered, season))
                    .flat_map(|season| season.children.iter())
                    .map(|e| ledger_key(e, &version.name))
                    .collect()
            }
        };
        self.session.mark_downloaded(keys).await;
        if !stream {
            self.session
                .mark_downloading(ledger_key(item, &version.name))
                .await;
        }
        if item.kind == MediaKind::Season {
            self.session.mark_pack(&item.pack_key(), cycle.now).await;
        }

        self.policy
            .maybe_queue_upgrade(
                item,
                release,
                item.primary_query(),
                deviation(item),
                cycle.now,
            )
            .await;
        self.session.record_success(&item.media_key()).await;
        item.version = Some(version.clone());
        item.downloaded_releases.push(release.title.clone());

        info!(
            item = %item.query(),
            version = %version.name,
            release = %release.title,
            cached = stream,
            "Release submitted"
        );
        ACQUISITIONS_TOTAL
            .with_label_values(&[item.kind.as_str(), "downloaded"])
            .inc();
    }

    async fn conclude(&self, item: &MediaItem, acquisition: Acquisition) -> Outcome {
        if acquisition.downloaded {
            if item.kind == MediaKind::Movie && self.config.autoremove.covers(MediaKind::Movie) {
                self.remove_from_watchlist(item).await;
            }
            return Outcome::new(true, false);
        }

        ACQUISITIONS_TOTAL
            .with_label_values(&[item.kind.as_str(), "nothing_found"])
            .inc();
        if acquisition.retry {
            self.watch(item, &acquisition.decision).await;
        }
        Outcome::new(false, acquisition.retry)
    }

    /// Count a failed attempt against the item's retry threshold.
    async fn watch(&self, item: &MediaItem, decision: &PolicyDecision) {
        if decision.skip_watch {
            debug!(item = %item.query(), "4K filter left nothing, failure not counted");
            return;
        }
        let declared = self
            .engine
            .applicable(item)
            .iter()
            .map(Version::retry_threshold)
            .max()
            .unwrap_or(0);
        let threshold = match decision.force_retries {
            Some(0) => 0,
            // One attempt must run at `ignored_count == required` for the
            // gated versions to apply.
            Some(required) => (required + 1).max(declared),
            None => declared,
        };

        let key = item.media_key();
        match self.session.record_failure(&key, threshold).await {
            RetryTransition::Untracked => {}
            RetryTransition::Ignored(failures) => {
                info!(item = %item.query(), attempt = failures, threshold, "Retrying next cycle");
                RETRY_TRANSITIONS.with_label_values(&["ignored"]).inc();
            }
            RetryTransition::Suppressed => {
                info!(item = %item.query(), threshold, "Retries exhausted, suppressing");
                RETRY_TRANSITIONS.with_label_values(&["suppressed"]).inc();
                for service in &self.ignore_services {
                    service.add(item).await;
                }
            }
        }
    }

    async fn remove_if_ended(&self, show: &MediaItem, cycle: &Cycle) {
        let Some(status) = &self.status else {
            return;
        };
        match status.show_status(show).await {
            Ok(Some(status)) if status.ended => {
                if is_show_complete(show, &cycle.library, &status) {
                    info!(show = %show.title, "Show ended and complete");
                    self.remove_from_watchlist(show).await;
                } else {
                    debug!(
                        show = %show.title,
                        expected = ?status.expected_episodes,
                        "Show ended but episodes are missing"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => warn!(show = %show.title, error = %e, "Show status lookup failed"),
        }
    }

    async fn remove_from_watchlist(&self, item: &MediaItem) {
        let Some(watchlist) = &self.watchlist else {
            return;
        };
        match watchlist.remove(item).await {
            Ok(()) => info!(title = %item.title, "Removed from watchlist"),
            Err(e) => warn!(title = %item.title, error = %e, "Watchlist removal failed"),
        }
    }
}
