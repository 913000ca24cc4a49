//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// Which kinds are removed from the watchlist once acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Autoremove {
    None,
    Movie,
    Show,
    #[default]
    Both,
}

impl Autoremove {
    pub fn covers(&self, kind: MediaKind) -> bool {
        match self {
            Autoremove::None => false,
            Autoremove::Movie => kind == MediaKind::Movie,
            Autoremove::Show => kind == MediaKind::Show,
            Autoremove::Both => matches!(kind, MediaKind::Movie | MediaKind::Show),
        }
    }
}

/// Configuration for the acquisition orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub autoremove: Autoremove,

    /// Extra rounds of title queries when a movie search comes back empty.
    #[serde(default)]
    pub scrape_retries: u32,

    /// Below this many results an IMDb id search supplements the title search.
    #[serde(default = "default_imdb_fallback_threshold")]
    pub imdb_fallback_threshold: usize,

    /// How long a submitted season pack is awaited before the season is
    /// searched again (minutes).
    #[serde(default = "default_pack_wait_minutes")]
    pub pack_wait_minutes: i64,

    /// Fewest outstanding episodes for which a season pack is considered.
    #[serde(default = "default_season_pack_min_episodes")]
    pub season_pack_min_episodes: usize,

    /// Outstanding seasons needed before multi-season packs are considered.
    #[serde(default = "default_multi_season_threshold")]
    pub multi_season_threshold: usize,
}

fn default_imdb_fallback_threshold() -> usize {
    20
}

fn default_pack_wait_minutes() -> i64 {
    360 // 6 hours
}

fn default_season_pack_min_episodes() -> usize {
    3
}

fn default_multi_season_threshold() -> usize {
    4
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            autoremove: Autoremove::default(),
            scrape_retries: 0,
            imdb_fallback_threshold: default_imdb_fallback_threshold(),
            pack_wait_minutes: default_pack_wait_minutes(),
            season_pack_min_episodes: default_season_pack_min_episodes(),
            multi_season_threshold: default_multi_season_threshold(),
        }
    }
}
