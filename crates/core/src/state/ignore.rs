use async_trait::async_trait;

use crate::media::MediaItem;

/// An external list of suppressed items (a watched list, a label, ...).
///
/// Failures are the implementation's to log; suppression bookkeeping must
/// not abort acquisition.
#[async_trait]
pub trait IgnoreService: Send + Sync {
    fn name(&self) -> &str;

    /// Record the item as suppressed.
    async fn add(&self, item: &MediaItem);

    /// Reverse a suppression.
    async fn remove(&self, item: &MediaItem);

    /// Whether the item is suppressed.
    async fn check(&self, item: &MediaItem) -> bool;
}
