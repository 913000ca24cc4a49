//! Merging authoritative catalog records into wanted items.

use tracing::debug;

use super::{MediaItem, MediaKind};
use crate::library::{CatalogAdapter, CatalogError};

/// Options for [`match_item`].
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Name of the original request/watchlist service. Items known only to
    /// it take the upstream episode lists as-is.
    pub request_service: Option<String>,
}

impl MediaItem {
    /// Overwrite scalar fields with `record`, keeping identity fields that
    /// are already set.
    pub(crate) fn overwrite_scalars(&mut self, record: &MediaItem) {
        if !record.title.is_empty() {
            self.title = record.title.clone();
        }
        if record.year.is_some() {
            self.year = record.year;
        }
        if self.guid.is_none() {
            self.guid = record.guid.clone();
        }
        for eid in &record.eids {
            if !self.eids.contains(eid) {
                self.eids.push(eid.clone());
            }
        }
        if self.parent.is_none() {
            self.parent = record.parent.clone();
        }
        if self.grandparent.is_none() {
            self.grandparent = record.grandparent.clone();
        }
        if record.originally_available_at.is_some() {
            self.originally_available_at = record.originally_available_at.clone();
        }
        if record.leaf_count.is_some() {
            self.leaf_count = record.leaf_count;
        }
        if record.duration_ms.is_some() {
            self.duration_ms = record.duration_ms;
        }
        if record.status.is_some() {
            self.status = record.status.clone();
        }
        if !record.genres.is_empty() {
            self.genres = record.genres.clone();
        }
        if !record.existing_releases.is_empty() {
            self.existing_releases = record.existing_releases.clone();
        }
    }

    fn append_service(&mut self, service: &str) {
        if !self.services.iter().any(|s| s == service) {
            self.services.push(service.to_string());
        }
        for child in &mut self.children {
            child.append_service(service);
        }
    }

    fn backfill(&mut self, services: &[String], requested_by: &Option<String>) {
        if self.services.is_empty() {
            self.services = services.to_vec();
        }
        if self.requested_by.is_none() {
            self.requested_by = requested_by.clone();
        }
        for child in &mut self.children {
            child.backfill(services, requested_by);
        }
    }
}

fn intersect_children(local: &mut MediaItem, upstream: &MediaItem) {
    local
        .children
        .retain(|c| upstream.children.iter().any(|u| u.index == c.index));
    for child in &mut local.children {
        if let Some(up) = upstream.children.iter().find(|u| u.index == child.index) {
            child.overwrite_scalars(up);
        }
    }
}

fn merge_record(item: &mut MediaItem, record: MediaItem, request_only: bool) {
    item.overwrite_scalars(&record);
    match item.kind {
        MediaKind::Movie | MediaKind::Episode => {}
        MediaKind::Season => intersect_children(item, &record),
        MediaKind::Show if request_only => {
            let services = item.services.clone();
            let requested_by = item.requested_by.clone();
            let mut seasons = Vec::new();
            for mut season in record.children {
                if item.children.iter().any(|s| s.index == season.index) {
                    season.backfill(&services, &requested_by);
                    seasons.push(season);
                }
            }
            item.children = seasons;
        }
        MediaKind::Show => {
            item.children
                .retain(|s| record.children.iter().any(|u| u.index == s.index));
            for season in &mut item.children {
                if let Some(up) = record.children.iter().find(|u| u.index == season.index) {
                    season.overwrite_scalars(up);
                    intersect_children(season, up);
                }
            }
        }
    }
}

/// Merge the record `adapter` holds for `item` into it.
///
/// Returns `Ok(false)` and leaves the item untouched when the service has
/// no matching record. Items the service already contributed to are not
/// looked up again.
pub async fn match_item(
    item: &mut MediaItem,
    adapter: &dyn CatalogAdapter,
    options: &MergeOptions,
) -> Result<bool, CatalogError> {
    let service = adapter.name().to_string();
    // An item with no services came from the request service.
    let origin = options
        .request_service
        .as_ref()
        .filter(|_| item.services.is_empty());
    if item.services.contains(&service) || origin == Some(&service) {
        if let Some(origin) = origin {
            item.services.push(origin.clone());
        }
        return Ok(true);
    }

    let Some(record) = adapter.lookup(item).await? else {
        debug!(service = %service, title = %item.title, "No catalog match");
        return Ok(false);
    };

    if let Some(origin) = origin {
        item.services.push(origin.clone());
    }
    let request_only = options
        .request_service
        .as_ref()
        .is_some_and(|r| item.services.len() == 1 && &item.services[0] == r);
    merge_record(item, record, request_only);
    item.append_service(&service);
    debug!(service = %service, title = %item.title, "Merged catalog record");
    Ok(true)
}
