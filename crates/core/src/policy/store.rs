use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::media::{Lineage, MediaItem, MediaKind};

pub const POLICY_FILE_NAME: &str = "release_policy.json";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A 1080p acquisition waiting for a 4K release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeEntry {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub originally_available_at: Option<String>,
    #[serde(default)]
    pub eids: Vec<String>,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub parent_title: Option<String>,
    #[serde(default)]
    pub parent_year: Option<i32>,
    #[serde(default)]
    pub parent_index: Option<u32>,
    #[serde(default)]
    pub parent_eids: Vec<String>,
    #[serde(default)]
    pub parent_guid: Option<String>,
    #[serde(default)]
    pub grandparent_title: Option<String>,
    #[serde(default)]
    pub grandparent_year: Option<i32>,
    #[serde(default)]
    pub grandparent_eids: Vec<String>,
    #[serde(default)]
    pub grandparent_guid: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
    pub query: String,
    /// Deviation pattern used to filter scrape results.
    pub altquery: String,
    /// Unix timestamps.
    pub added: i64,
    pub last_checked: i64,
}

impl UpgradeEntry {
    pub fn from_item(item: &MediaItem, query: String, altquery: String, now: i64) -> Self {
        let parent = item.parent.clone().unwrap_or_default();
        let grandparent = item.grandparent.clone().unwrap_or_default();
        Self {
            kind: item.kind,
            title: item.title.clone(),
            year: item.year,
            originally_available_at: item.originally_available_at.clone(),
            eids: item.eids.clone(),
            guid: item.guid.clone(),
            parent_title: parent.title,
            parent_year: parent.year,
            parent_index: parent.index,
            parent_eids: parent.eids,
            parent_guid: parent.guid,
            grandparent_title: grandparent.title,
            grandparent_year: grandparent.year,
            grandparent_eids: grandparent.eids,
            grandparent_guid: grandparent.guid,
            index: item.index,
            query,
            altquery,
            added: now,
            last_checked: now,
        }
    }

    /// Rebuild a media item that acquisition can run against.
    pub fn to_item(&self) -> MediaItem {
        let mut item = MediaItem::new(self.kind, self.title.clone());
        item.year = self.year;
        item.originally_available_at = self.originally_available_at.clone();
        item.eids = self.eids.clone();
        item.guid = self.guid.clone();
        item.index = self.index;
        if self.kind == MediaKind::Season || self.kind == MediaKind::Episode {
            item.parent = Some(Lineage {
                eids: self.parent_eids.clone(),
                guid: self.parent_guid.clone(),
                title: self.parent_title.clone(),
                year: self.parent_year,
                index: self.parent_index,
                ..Default::default()
            });
        }
        if self.kind == MediaKind::Episode {
            item.grandparent = Some(Lineage {
                eids: self.grandparent_eids.clone(),
                guid: self.grandparent_guid.clone(),
                title: self.grandparent_title.clone(),
                year: self.grandparent_year,
                ..Default::default()
            });
        }
        item
    }
}

/// Contents of `release_policy.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyState {
    /// Media key to unix timestamp the 4K timer started at.
    #[serde(default)]
    pub timers: BTreeMap<String, i64>,
    #[serde(default)]
    pub upgrade_queue: BTreeMap<String, UpgradeEntry>,
}

/// File-backed policy state. Every mutation is a read-modify-write of the
/// whole file under one lock.
#[derive(Debug)]
pub struct PolicyStore {
    path: Option<PathBuf>,
    state: Mutex<PolicyState>,
}

impl PolicyStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            state: Mutex::new(Self::load(path)),
        }
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(PolicyState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn load(path: &Path) -> PolicyState {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PolicyState::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read policy state");
                return PolicyState::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid policy state, starting empty");
                PolicyState::default()
            }
        }
    }

    async fn write(path: &Path, state: &PolicyState) -> Result<(), PolicyError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn snapshot(&self) -> PolicyState {
        self.state.lock().await.clone()
    }

    /// Mutate the state and persist it if anything changed. The lock is held
    /// until the file is written, so saves land in mutation order. Write
    /// failures are logged; the in-memory state stays authoritative.
    pub async fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PolicyState) -> R,
    {
        let mut state = self.state.lock().await;
        let before = state.clone();
        let result = f(&mut state);
        if *state != before {
            if let Some(path) = &self.path {
                match Self::write(path, &state).await {
                    Ok(()) => debug!(path = %path.display(), "Saved policy state"),
                    Err(e) => warn!(path = %path.display(), error = %e, "Failed to save policy state"),
                }
            }
        }
        result
    }
}
