//! The version engine: which versions an item still needs this session,
//! and the collection state derived from that.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::Version;
use crate::media::{self, MediaItem, MediaKind};

/// Read-only view of session state the engine evaluates against.
#[derive(Debug, Clone, Copy)]
pub struct SessionView<'a> {
    /// `"<query> [<version>]"` entries for acquisitions made this session.
    pub downloaded: &'a HashSet<String>,
    /// Same key format, for background transfers still in flight.
    pub downloading: &'a HashSet<String>,
    /// Media keys of suppressed items.
    pub suppressed: &'a HashSet<String>,
    pub library: &'a [MediaItem],
    /// Whether the library keeps per-file history.
    pub tracks_files: bool,
    pub today: NaiveDate,
}

/// Ledger key recording that `item` was acquired for `version_name`.
pub fn ledger_key(item: &MediaItem, version_name: &str) -> String {
    format!("{} [{}]", item.query(), version_name)
}

fn logged(item: &MediaItem, version_name: &str, ledger: &HashSet<String>) -> bool {
    match item.kind {
        MediaKind::Movie | MediaKind::Episode => ledger.contains(&ledger_key(item, version_name)),
        MediaKind::Show | MediaKind::Season => {
            let episodes = item.episodes();
            !episodes.is_empty()
                && episodes
                    .iter()
                    .all(|e| ledger.contains(&ledger_key(e, version_name)))
        }
    }
}

fn names(versions: &[Version]) -> Vec<&str> {
    versions.iter().map(|v| v.name.as_str()).collect()
}

/// Evaluates the configured versions against items.
#[derive(Debug, Clone)]
pub struct VersionEngine {
    versions: Vec<Version>,
}

impl VersionEngine {
    pub fn new(versions: Vec<Version>) -> Self {
        Self { versions }
    }

    pub fn all(&self) -> &[Version] {
        &self.versions
    }

    /// Enabled versions whose triggers apply to the item.
    pub fn applicable(&self, item: &MediaItem) -> Vec<Version> {
        self.versions
            .iter()
            .filter(|v| v.is_enabled() && v.applies(item))
            .cloned()
            .collect()
    }

    /// Versions the item still needs.
    ///
    /// Versions already acquired this session are removed. If that removes
    /// everything the full applicable list comes back. On libraries with
    /// file history, a fully collected item with nothing acquired this
    /// session gets derived `"<name> upgrade"` versions for any upgrade
    /// target its files miss.
    pub fn versions(&self, item: &MediaItem, view: &SessionView<'_>) -> Vec<Version> {
        let applicable = self.applicable(item);
        let mut versions: Vec<Version> = applicable
            .iter()
            .filter(|v| !logged(item, &v.name, view.downloaded))
            .cloned()
            .collect();
        if versions.is_empty() {
            versions = applicable.clone();
        }

        if !view.tracks_files {
            return versions;
        }
        if names(&versions) != names(&applicable) {
            return versions;
        }

        let upgradable: Vec<&Version> = versions
            .iter()
            .filter(|v| v.has_upgrade_rules())
            .filter(|v| !logged(item, &format!("{} upgrade", v.name), view.downloaded))
            .collect();
        if upgradable.is_empty() || !self.complete(item, view) {
            return versions;
        }

        upgradable
            .into_iter()
            .filter(|v| match item.kind {
                MediaKind::Movie | MediaKind::Episode => v.needs_upgrade(&item.existing_releases),
                MediaKind::Show | MediaKind::Season => item
                    .episodes()
                    .iter()
                    .any(|e| v.needs_upgrade(&e.existing_releases)),
            })
            .map(Version::upgrade_version)
            .collect()
    }

    /// Some, but not all, applicable versions are still needed.
    pub fn version_missing(&self, item: &MediaItem, view: &SessionView<'_>) -> bool {
        let versions = self.versions(item, view);
        !versions.is_empty() && names(&versions) != names(&self.applicable(item))
    }

    /// A background transfer for the item is already in flight.
    pub fn downloading(&self, item: &MediaItem, view: &SessionView<'_>) -> bool {
        let own = self
            .applicable(item)
            .iter()
            .any(|v| view.downloading.contains(&ledger_key(item, &v.name)));
        own || item.children.iter().any(|c| self.downloading(c, view))
    }

    pub fn watched(&self, item: &MediaItem, view: &SessionView<'_>) -> bool {
        view.suppressed.contains(&item.media_key())
    }

    fn still_wanted(&self, item: &MediaItem, view: &SessionView<'_>) -> bool {
        (!media::collected(item, view.library) || self.version_missing(item, view))
            && !self.watched(item, view)
            && media::released(item, view.today)
            && !self.downloading(item, view)
    }

    /// The part of the item that still needs acquiring: seasons (with their
    /// remaining episodes) for a show, episodes for a season, the item
    /// itself for movies and episodes. Seasons left without episodes are
    /// dropped.
    pub fn uncollected(&self, item: &MediaItem, view: &SessionView<'_>) -> Vec<MediaItem> {
        match item.kind {
            MediaKind::Movie | MediaKind::Episode => {
                if self.still_wanted(item, view) {
                    vec![item.clone()]
                } else {
                    Vec::new()
                }
            }
            MediaKind::Season => item
                .children
                .iter()
                .filter(|e| self.still_wanted(e, view))
                .cloned()
                .collect(),
            MediaKind::Show => item
                .children
                .iter()
                .filter(|s| self.still_wanted(s, view))
                .map(|s| {
                    let mut season = s.clone();
                    season.children = self.uncollected(s, view);
                    season
                })
                .filter(|s| !s.children.is_empty())
                .collect(),
        }
    }

    /// Every released, unsuppressed episode (or the movie) is in the library.
    pub fn complete(&self, item: &MediaItem, view: &SessionView<'_>) -> bool {
        match item.kind {
            MediaKind::Movie | MediaKind::Episode => media::collected(item, view.library),
            MediaKind::Show | MediaKind::Season => item.episodes().iter().all(|e| {
                media::collected(e, view.library)
                    || self.watched(e, view)
                    || !media::released(e, view.today)
            }),
        }
    }
}
