use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::release::Release;
use crate::version::Version;

/// Kind of a media item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    Show,
    Season,
    Episode,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Season => "season",
            MediaKind::Episode => "episode",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an ancestor (the show of a season, the season or show of an
/// episode).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lineage {
    pub eids: Vec<String>,
    pub guid: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub index: Option<u32>,
}

/// A file already present in the library, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingFile {
    pub resolution: u32,
    pub path: String,
}

impl std::fmt::Display for ExistingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}p) {}", self.resolution, self.path)
    }
}

/// Per-item tweaks applied when building search titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrapingAdjustment {
    /// Text injected before every alternate title.
    Prefix { text: String },
    /// Text injected after every alternate title.
    Suffix { text: String },
    /// Episodes are released by air date instead of SxxEyy numbering.
    AirDate,
}

/// Absolute numbering assigned to anime shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimeNumbering {
    /// Absolute episode number (episodes).
    pub absolute: Option<u32>,
    /// First absolute episode of the season (seasons).
    pub first: Option<u32>,
    /// Last absolute episode of the season (seasons).
    pub last: Option<u32>,
    /// Total regular episodes (shows).
    pub total: Option<u32>,
}

/// Runtime flags set while one scheduling cycle processes an item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleFlags {
    /// Retry threshold override set by the release policy.
    pub force_retries: Option<u32>,
    /// Candidates are restricted to 4K while the timer runs.
    pub force_4k_only: bool,
    /// Do not route a failed attempt through the retry tracker.
    pub skip_watch: bool,
    /// A season pack covered this episode, do not scrape it individually.
    pub skip_scraping: bool,
    /// A season pack was acquired this cycle.
    pub pack_downloaded: bool,
    /// Failures recorded for this item so far.
    pub ignored_count: u32,
    /// Availability reported by the metadata service, when asked.
    pub available: Option<bool>,
}

/// A wanted movie, show, season or episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// External identifiers, e.g. `imdb://tt0110912`.
    pub eids: Vec<String>,
    /// Catalog guid.
    pub guid: Option<String>,
    pub title: String,
    pub year: Option<i32>,
    /// Season number for seasons, episode number for episodes.
    pub index: Option<u32>,
    /// Show of a season, season of an episode.
    pub parent: Option<Lineage>,
    /// Show of an episode.
    pub grandparent: Option<Lineage>,
    /// Release date as `YYYY-MM-DD`.
    pub originally_available_at: Option<String>,
    pub leaf_count: Option<u32>,
    pub duration_ms: Option<u64>,
    pub genres: Vec<String>,
    /// Catalog status string, e.g. "ended".
    pub status: Option<String>,
    /// Seasons of a show, episodes of a season.
    pub children: Vec<MediaItem>,
    /// Services that already contributed data.
    pub services: Vec<String>,
    pub requested_by: Option<String>,
    pub existing_releases: Vec<ExistingFile>,
    pub downloaded_releases: Vec<String>,
    pub alternate_titles: Vec<String>,
    pub scraping_adjustments: Vec<ScrapingAdjustment>,
    pub anime: Option<AnimeNumbering>,

    #[serde(skip)]
    pub releases: Vec<Release>,
    /// Version that produced the last successful acquisition.
    #[serde(skip)]
    pub version: Option<Version>,
    #[serde(skip)]
    pub flags: CycleFlags,
}

impl MediaItem {
    pub fn new(kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            ..Default::default()
        }
    }

    /// Parsed release date; malformed dates are treated as absent.
    pub fn release_date(&self) -> Option<NaiveDate> {
        self.originally_available_at
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.get(..10).unwrap_or(d), "%Y-%m-%d").ok())
    }

    /// Season number of an episode.
    pub fn parent_index(&self) -> Option<u32> {
        self.parent.as_ref().and_then(|p| p.index)
    }

    /// Title of the show this item belongs to (its own title for movies and shows).
    pub fn show_title(&self) -> &str {
        let ancestor = match self.kind {
            MediaKind::Movie | MediaKind::Show => None,
            MediaKind::Season => self.parent.as_ref(),
            MediaKind::Episode => self.grandparent.as_ref(),
        };
        ancestor
            .and_then(|a| a.title.as_deref())
            .unwrap_or(&self.title)
    }

    /// Year of the show this item belongs to.
    pub fn show_year(&self) -> Option<i32> {
        match self.kind {
            MediaKind::Movie | MediaKind::Show => self.year,
            MediaKind::Season => self.parent.as_ref().and_then(|p| p.year),
            MediaKind::Episode => self.grandparent.as_ref().and_then(|g| g.year),
        }
    }

    /// Identifiers of the top-level entity (show for seasons and episodes).
    pub fn show_eids(&self) -> &[String] {
        let ancestor = match self.kind {
            MediaKind::Movie | MediaKind::Show => None,
            MediaKind::Season => self.parent.as_ref(),
            MediaKind::Episode => self.grandparent.as_ref(),
        };
        match ancestor {
            Some(a) => &a.eids,
            None => &self.eids,
        }
    }

    /// IMDb id (`tt...`) of the top-level entity, if known.
    pub fn imdb_id(&self) -> Option<&str> {
        self.show_eids()
            .iter()
            .find_map(|e| e.strip_prefix("imdb://"))
    }

    pub fn has_adjustment(&self, adjustment: &ScrapingAdjustment) -> bool {
        self.scraping_adjustments.contains(adjustment)
    }

    /// All episodes below this item (itself for an episode).
    pub fn episodes(&self) -> Vec<&MediaItem> {
        match self.kind {
            MediaKind::Episode => vec![self],
            MediaKind::Season => self.children.iter().collect(),
            MediaKind::Show => self
                .children
                .iter()
                .flat_map(|s| s.children.iter())
                .collect(),
            MediaKind::Movie => Vec::new(),
        }
    }

    /// Lineage describing this item, for use as a child's parent.
    pub fn as_lineage(&self) -> Lineage {
        Lineage {
            eids: self.eids.clone(),
            guid: self.guid.clone(),
            title: Some(self.title.clone()),
            year: self.year,
            index: self.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_date_parsing() {
        let mut item = MediaItem::new(MediaKind::Movie, "Heat");
        item.originally_available_at = Some("1995-12-15".to_string());
        assert_eq!(item.release_date(), NaiveDate::from_ymd_opt(1995, 12, 15));

        item.originally_available_at = Some("1995-12-15T00:00:00Z".to_string());
        assert_eq!(item.release_date(), NaiveDate::from_ymd_opt(1995, 12, 15));

        item.originally_available_at = Some("soon".to_string());
        assert_eq!(item.release_date(), None);
    }

    #[test]
    fn test_show_accessors_for_episode() {
        let mut episode = MediaItem::new(MediaKind::Episode, "Pilot");
        episode.parent = Some(Lineage {
            index: Some(1),
            ..Default::default()
        });
        episode.grandparent = Some(Lineage {
            eids: vec!["imdb://tt0903747".to_string()],
            title: Some("Breaking Bad".to_string()),
            year: Some(2008),
            ..Default::default()
        });

        assert_eq!(episode.show_title(), "Breaking Bad");
        assert_eq!(episode.show_year(), Some(2008));
        assert_eq!(episode.imdb_id(), Some("tt0903747"));
        assert_eq!(episode.parent_index(), Some(1));
    }

    #[test]
    fn test_existing_file_display() {
        let file = ExistingFile {
            resolution: 1080,
            path: "/movies/Heat.mkv".to_string(),
        };
        assert_eq!(file.to_string(), "(1080p) /movies/Heat.mkv");
    }
}
