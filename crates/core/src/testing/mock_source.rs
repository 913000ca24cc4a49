//! Mock release source for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::media::compile_deviation;
use crate::release::Release;
use crate::searcher::{ReleaseSource, SearchError, TargetIds};

/// A recorded scrape for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedScrape {
    pub query: String,
    pub pattern: String,
    pub ids: Option<TargetIds>,
}

/// A query handler that produces releases based on the query.
type QueryHandler = Box<dyn Fn(&str) -> Option<Vec<Release>> + Send + Sync>;

/// Mock implementation of the ReleaseSource trait.
///
/// Configured releases are filtered through the caller's deviation pattern,
/// the way a real indexer pipeline would, so one release list can serve
/// every query of a test.
///
/// # Example
///
/// ```rust,ignore
/// let source = MockReleaseSource::new();
/// source.set_releases(vec![fixtures::cached_release("Heat.1995.1080p.BluRay")]).await;
///
/// let releases = source.scrape("Heat.1995", &deviation(&movie), None).await?;
/// assert_eq!(source.scrape_count().await, 1);
/// ```
pub struct MockReleaseSource {
    releases: Arc<RwLock<Vec<Release>>>,
    scrapes: Arc<RwLock<Vec<RecordedScrape>>>,
    next_error: Arc<RwLock<Option<SearchError>>>,
    query_handler: Arc<RwLock<Option<QueryHandler>>>,
}

impl std::fmt::Debug for MockReleaseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockReleaseSource")
            .field("releases", &"<releases>")
            .field("scrapes", &"<scrapes>")
            .field("query_handler", &"<handler>")
            .finish()
    }
}

impl Default for MockReleaseSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReleaseSource {
    pub fn new() -> Self {
        Self {
            releases: Arc::new(RwLock::new(Vec::new())),
            scrapes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            query_handler: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_releases(&self, releases: Vec<Release>) {
        *self.releases.write().await = releases;
    }

    pub async fn add_release(&self, release: Release) {
        self.releases.write().await.push(release);
    }

    /// Override the release list for queries the handler answers.
    pub async fn set_query_handler<F>(&self, handler: F)
    where
        F: Fn(&str) -> Option<Vec<Release>> + Send + Sync + 'static,
    {
        *self.query_handler.write().await = Some(Box::new(handler));
    }

    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_scrapes(&self) -> Vec<RecordedScrape> {
        self.scrapes.read().await.clone()
    }

    pub async fn scrape_count(&self) -> usize {
        self.scrapes.read().await.len()
    }

    pub async fn queries(&self) -> Vec<String> {
        self.scrapes
            .read()
            .await
            .iter()
            .map(|s| s.query.clone())
            .collect()
    }
}

#[async_trait]
impl ReleaseSource for MockReleaseSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn scrape(
        &self,
        query: &str,
        pattern: &str,
        ids: Option<&TargetIds>,
    ) -> Result<Vec<Release>, SearchError> {
        self.scrapes.write().await.push(RecordedScrape {
            query: query.to_string(),
            pattern: pattern.to_string(),
            ids: ids.cloned(),
        });

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let candidates = {
            let handler = self.query_handler.read().await;
            match handler.as_ref().and_then(|h| h(query)) {
                Some(releases) => releases,
                None => self.releases.read().await.clone(),
            }
        };

        let deviation =
            compile_deviation(pattern).map_err(|e| SearchError::InvalidPattern(e.to_string()))?;
        Ok(candidates
            .into_iter()
            .filter(|r| deviation.is_match(&r.title))
            .collect())
    }
}
