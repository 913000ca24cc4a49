//! Library lookups: release state, collection state and existing files.

use chrono::NaiveDate;

use super::{MediaItem, MediaKind};

/// Whether the item has been released as of `today`.
///
/// Close to the release date the availability reported by the metadata
/// service wins when it was asked. A missing or malformed date counts as
/// not released, except for shows and seasons, which are released once any
/// child is.
pub fn released(item: &MediaItem, today: NaiveDate) -> bool {
    let Some(date) = item.release_date() else {
        return matches!(item.kind, MediaKind::Show | MediaKind::Season)
            && item.children.iter().any(|c| released(c, today));
    };
    let days = (today - date).num_days();
    match item.kind {
        MediaKind::Movie => {
            if (-30..=180).contains(&days) {
                item.flags.available.unwrap_or(days >= 0)
            } else {
                days > 0
            }
        }
        _ => {
            if (-1..=1).contains(&days) {
                item.flags.available.unwrap_or(days >= 0)
            } else {
                days >= 0
            }
        }
    }
}

fn show_in_library<'a>(item: &MediaItem, library: &'a [MediaItem]) -> Option<&'a MediaItem> {
    let lineage = match item.kind {
        MediaKind::Season => item.parent.as_ref()?,
        MediaKind::Episode => item.grandparent.as_ref()?,
        _ => return None,
    };
    let mut target = MediaItem::new(MediaKind::Show, lineage.title.clone().unwrap_or_default());
    target.eids = lineage.eids.clone();
    target.guid = lineage.guid.clone();
    library.iter().find(|l| **l == target)
}

/// The library copy of an item, descending into shows for seasons and episodes.
pub fn find_in_library<'a>(item: &MediaItem, library: &'a [MediaItem]) -> Option<&'a MediaItem> {
    match item.kind {
        MediaKind::Movie | MediaKind::Show => library.iter().find(|l| *l == item),
        MediaKind::Season => show_in_library(item, library)?
            .children
            .iter()
            .find(|s| s.index.is_some() && s.index == item.index),
        MediaKind::Episode => show_in_library(item, library)?
            .children
            .iter()
            .find(|s| s.index.is_some() && s.index == item.parent_index())?
            .children
            .iter()
            .find(|e| e.index.is_some() && e.index == item.index),
    }
}

fn expected_leaves(item: &MediaItem) -> u32 {
    match item.kind {
        MediaKind::Season => item.leaf_count.unwrap_or(item.children.len() as u32),
        MediaKind::Show => item
            .leaf_count
            .unwrap_or_else(|| item.children.iter().map(expected_leaves).sum()),
        _ => 1,
    }
}

/// Whether the library already holds the item. Shows and seasons count as
/// collected once the library holds at least as many episodes.
pub fn collected(item: &MediaItem, library: &[MediaItem]) -> bool {
    let Some(found) = find_in_library(item, library) else {
        return false;
    };
    match item.kind {
        MediaKind::Movie | MediaKind::Episode => true,
        MediaKind::Show | MediaKind::Season => expected_leaves(found) >= expected_leaves(item),
    }
}

/// Copy existing file descriptors from the library onto the item and its
/// descendants.
pub fn set_file_names(item: &mut MediaItem, library: &[MediaItem]) {
    match item.kind {
        MediaKind::Movie | MediaKind::Episode => {
            if let Some(found) = find_in_library(item, library) {
                item.existing_releases = found.existing_releases.clone();
            }
        }
        MediaKind::Show | MediaKind::Season => {
            for child in &mut item.children {
                set_file_names(child, library);
            }
        }
    }
}

/// Regular (non-special) episodes of a show present in the library.
pub fn local_episode_count(show: &MediaItem, library: &[MediaItem]) -> u32 {
    let Some(found) = find_in_library(show, library) else {
        return 0;
    };
    found
        .children
        .iter()
        .filter(|s| s.index.unwrap_or(0) > 0)
        .map(expected_leaves)
        .sum()
}
