use serde::{Deserialize, Serialize};

use super::quality::parse_resolution;

/// Transfer protocol of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Torrent,
    Other,
}

/// A candidate release found by an indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// Source label, e.g. `[prowlarr: 1337x]`.
    pub source: String,
    pub protocol: Protocol,
    pub title: String,
    #[serde(default)]
    pub files: Vec<String>,
    /// Size in gigabytes.
    pub size_gb: f64,
    /// Magnet URIs or other links, in preference order.
    pub links: Vec<String>,
    pub seeders: u32,
    /// Vertical resolution derived from the title (0 when unknown).
    pub resolution: u32,
    /// Download backends that hold a cached copy.
    #[serde(default)]
    pub cached: Vec<String>,
    /// Download backends that may hold a cached copy.
    #[serde(default)]
    pub maybe_cached: Vec<String>,
    /// Average bitrate in Mbit/s, set once the item duration is known.
    #[serde(default)]
    pub bitrate: f64,
}

impl Release {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        size_gb: f64,
        links: Vec<String>,
        seeders: u32,
    ) -> Self {
        let title = title.into();
        Self {
            source: source.into(),
            protocol: Protocol::Torrent,
            resolution: parse_resolution(&title),
            title,
            files: Vec::new(),
            size_gb,
            links,
            seeders,
            cached: Vec::new(),
            maybe_cached: Vec::new(),
            bitrate: 0.0,
        }
    }

    /// Whether any backend holds (or may hold) a cached copy.
    pub fn has_cached_copy(&self) -> bool {
        !self.cached.is_empty() || !self.maybe_cached.is_empty()
    }

    /// Derive the bitrate from the runtime of the item this release is for.
    pub fn set_bitrate(&mut self, duration_ms: u64) {
        if duration_ms == 0 {
            return;
        }
        let seconds = duration_ms as f64 / 1000.0;
        self.bitrate = self.size_gb * 8000.0 / seconds;
    }
}
