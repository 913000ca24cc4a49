//! Cross-service identity: equality, stable media keys and pack keys.

use super::{Lineage, MediaItem, MediaKind};

fn same_entity(
    a_eids: &[String],
    a_guid: &Option<String>,
    b_eids: &[String],
    b_guid: &Option<String>,
) -> bool {
    if a_eids.iter().any(|e| b_eids.contains(e)) {
        return true;
    }
    matches!((a_guid, b_guid), (Some(a), Some(b)) if a == b)
}

fn same_lineage(a: Option<&Lineage>, b: Option<&Lineage>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_entity(&a.eids, &a.guid, &b.eids, &b.guid),
        _ => false,
    }
}

/// Movies and shows are equal when their identifiers intersect (or their
/// catalog guids match). Seasons also need the same season index, episodes
/// the same season and episode index. Missing ancestry compares unequal.
impl PartialEq for MediaItem {
    fn eq(&self, other: &Self) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            MediaKind::Movie | MediaKind::Show => {
                same_entity(&self.eids, &self.guid, &other.eids, &other.guid)
            }
            MediaKind::Season => {
                self.index.is_some()
                    && self.index == other.index
                    && same_lineage(self.parent.as_ref(), other.parent.as_ref())
            }
            MediaKind::Episode => {
                self.index.is_some()
                    && self.index == other.index
                    && self.parent_index().is_some()
                    && self.parent_index() == other.parent_index()
                    && same_lineage(self.grandparent.as_ref(), other.grandparent.as_ref())
            }
        }
    }
}

fn identity_string(eids: &[String], guid: Option<&str>, title: &str, year: Option<i32>) -> String {
    if !eids.is_empty() {
        let mut sorted: Vec<&str> = eids.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        return sorted.join(",");
    }
    if let Some(guid) = guid {
        return guid.to_string();
    }
    match year {
        Some(year) => format!("title:{}:{}", title, year),
        None => format!("title:{}", title),
    }
}

fn lineage_identity(lineage: Option<&Lineage>) -> String {
    match lineage {
        Some(l) => identity_string(
            &l.eids,
            l.guid.as_deref(),
            l.title.as_deref().unwrap_or_default(),
            l.year,
        ),
        None => "unknown".to_string(),
    }
}

impl MediaItem {
    /// Stable cross-service key used by persisted policy state and the
    /// retry tracker.
    pub fn media_key(&self) -> String {
        match self.kind {
            MediaKind::Movie | MediaKind::Show => format!(
                "{}|{}",
                self.kind,
                identity_string(&self.eids, self.guid.as_deref(), &self.title, self.year)
            ),
            MediaKind::Season => format!(
                "season|{}|S{:02}",
                lineage_identity(self.parent.as_ref()),
                self.index.unwrap_or(0)
            ),
            MediaKind::Episode => format!(
                "episode|{}|S{:02}E{:02}",
                lineage_identity(self.grandparent.as_ref()),
                self.parent_index().unwrap_or(0),
                self.index.unwrap_or(0)
            ),
        }
    }

    /// Key of the season pack covering this season.
    pub fn pack_key(&self) -> String {
        let show = match self.parent.as_ref() {
            Some(parent) if !parent.eids.is_empty() => {
                let mut eids = parent.eids.clone();
                eids.sort_unstable();
                eids.join(",")
            }
            Some(parent) => parent
                .guid
                .clone()
                .or_else(|| parent.title.clone())
                .unwrap_or_default(),
            None => String::new(),
        };
        format!("season|{}|{}", show, self.index.unwrap_or(0))
    }
}
