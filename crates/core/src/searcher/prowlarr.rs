//! Prowlarr search backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ProwlarrConfig;
use crate::media::compile_deviation;
use crate::metrics;
use crate::release::{Protocol, Release};

use super::pipeline::{filter_hits, resolution_budget};
use super::resolver::{MagnetResolver, ResolverSettings};
use super::{RawHit, ReleaseSource, SearchError, TargetIds};

/// Searches a Prowlarr instance and resolves the hits into magnets.
pub struct ProwlarrSearcher {
    client: Client,
    config: ProwlarrConfig,
    resolver: MagnetResolver,
}

impl ProwlarrSearcher {
    pub fn new(config: ProwlarrConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        let resolver = MagnetResolver::new(ResolverSettings {
            timeout: Duration::from_secs(config.resolver_timeout_secs),
            concurrency: config.concurrency,
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })?;
        Ok(Self {
            client,
            config,
            resolver,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/api/v1/search", self.config.url.trim_end_matches('/'))
    }

    fn search_params(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", query.to_string()),
            ("type", "search".to_string()),
            ("limit", self.config.max_results.to_string()),
            ("offset", "0".to_string()),
        ];
        params.extend(
            self.config
                .categories
                .iter()
                .map(|c| ("categories", c.to_string())),
        );
        params
    }

    /// Run the indexer search and return the raw hits.
    pub async fn search_raw(&self, query: &str) -> Result<Vec<RawHit>, SearchError> {
        debug!(query = query, "Searching Prowlarr");

        let response = self
            .client
            .get(self.search_url())
            .header("X-Api-Key", &self.config.api_key)
            .query(&self.search_params(query))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let results: Vec<ProwlarrResult> = response
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(results.into_iter().map(RawHit::from).collect())
    }
}

#[async_trait]
impl ReleaseSource for ProwlarrSearcher {
    fn name(&self) -> &str {
        "prowlarr"
    }

    async fn scrape(
        &self,
        query: &str,
        pattern: &str,
        ids: Option<&TargetIds>,
    ) -> Result<Vec<Release>, SearchError> {
        let deviation =
            compile_deviation(pattern).map_err(|e| SearchError::InvalidPattern(e.to_string()))?;

        let hits = match self.search_raw(query).await {
            Ok(hits) => {
                metrics::SEARCHES_TOTAL.with_label_values(&["success"]).inc();
                hits
            }
            Err(e) => {
                metrics::SEARCHES_TOTAL.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };
        let total = hits.len();
        metrics::SEARCH_HITS
            .with_label_values(&["received"])
            .observe(total as f64);

        let kept = filter_hits(hits, query, &deviation, ids);
        metrics::SEARCH_HITS
            .with_label_values(&["kept"])
            .observe(kept.len() as f64);

        let (direct, pending): (Vec<RawHit>, Vec<RawHit>) =
            kept.into_iter().partition(|hit| hit.magnet_url.is_some());
        let pending = resolution_budget(pending, self.config.max_resolve, self.config.fallback_episodes);
        let resolving = pending.len();

        let mut releases: Vec<Release> = direct
            .into_iter()
            .filter_map(|hit| {
                let magnet = hit.magnet_url.clone()?;
                Some(hit.into_release(magnet))
            })
            .collect();
        releases.extend(self.resolver.resolve_all(pending).await);

        info!(
            query = query,
            hits = total,
            resolving = resolving,
            releases = releases.len(),
            "Prowlarr scrape complete"
        );
        Ok(releases)
    }
}

/// Prowlarr search result, as returned by `/api/v1/search`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProwlarrResult {
    title: String,
    #[serde(default)]
    indexer: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    categories: Vec<ProwlarrCategory>,
    #[serde(default)]
    seeders: Option<u32>,
    #[serde(default)]
    magnet_url: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    imdb_id: Option<u64>,
    #[serde(default)]
    tmdb_id: Option<u64>,
    #[serde(default)]
    tvdb_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProwlarrCategory {
    id: u32,
}

impl From<ProwlarrResult> for RawHit {
    fn from(r: ProwlarrResult) -> Self {
        let protocol = match r.protocol.as_deref() {
            Some("torrent") | None => Protocol::Torrent,
            Some(_) => Protocol::Other,
        };
        // Some indexers put the magnet in the download link.
        let (magnet_url, download_url) = match (r.magnet_url, r.download_url) {
            (None, Some(url)) if url.starts_with("magnet:") => (Some(url), None),
            other => other,
        };
        RawHit {
            title: r.title,
            indexer: r.indexer.unwrap_or_else(|| "unknown".to_string()),
            size_bytes: r.size.filter(|&s| s > 0),
            protocol,
            categories: r.categories.into_iter().map(|c| c.id).collect(),
            seeders: r.seeders.unwrap_or(0),
            magnet_url,
            download_url,
            imdb_id: r.imdb_id,
            tmdb_id: r.tmdb_id,
            tvdb_id: r.tvdb_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProwlarrConfig {
        ProwlarrConfig {
            url: "http://localhost:9696/".to_string(),
            api_key: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_search_url_and_params() {
        let searcher = ProwlarrSearcher::new(config()).unwrap();
        assert_eq!(searcher.search_url(), "http://localhost:9696/api/v1/search");

        let params = searcher.search_params("Heat 1995");
        assert!(params.contains(&("query", "Heat 1995".to_string())));
        assert!(params.contains(&("type", "search".to_string())));
        assert!(params.contains(&("offset", "0".to_string())));
        assert!(params.contains(&("categories", "2000".to_string())));
        assert!(params.contains(&("categories", "5000".to_string())));
    }

    #[test]
    fn test_parse_results() {
        let body = r#"[
            {
                "title": "Heat 1995 1080p BluRay",
                "indexer": "1337x",
                "size": 8000000000,
                "protocol": "torrent",
                "categories": [{"id": 2040, "name": "Movies/HD"}],
                "seeders": 120,
                "downloadUrl": "http://localhost:9696/1/download?link=abc&amp;file=Heat",
                "imdbId": 113277,
                "tmdbId": 0
            },
            {
                "title": "Heat 1995 2160p",
                "indexer": "rarbg",
                "categories": [{"id": 2045}],
                "downloadUrl": "magnet:?xt=urn:btih:def"
            }
        ]"#;
        let results: Vec<ProwlarrResult> = serde_json::from_str(body).unwrap();
        let hits: Vec<RawHit> = results.into_iter().map(RawHit::from).collect();

        assert_eq!(hits[0].indexer, "1337x");
        assert_eq!(hits[0].categories, vec![2040]);
        assert_eq!(hits[0].seeders, 120);
        assert_eq!(hits[0].imdb_id, Some(113277));
        assert!(hits[0].magnet_url.is_none());
        assert!(hits[0].has_ids());

        assert_eq!(hits[1].magnet_url.as_deref(), Some("magnet:?xt=urn:btih:def"));
        assert!(hits[1].download_url.is_none());
        assert_eq!(hits[1].size_bytes, None);
        assert!(!hits[1].has_ids());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_rejected() {
        let searcher = ProwlarrSearcher::new(config()).unwrap();
        let result = searcher.scrape("Heat", "(unclosed", None).await;
        assert!(matches!(result, Err(SearchError::InvalidPattern(_))));
    }
}
