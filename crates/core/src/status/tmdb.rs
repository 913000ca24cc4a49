//! TMDB-backed show status lookups with a JSON disk cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{is_ended_status, ShowStatus, StatusError, StatusService};
use crate::config::TmdbConfig;
use crate::media::MediaItem;

const TMDB_API_URL: &str = "https://api.themoviedb.org/3";

/// Cache keys for a show, most specific first.
pub fn cache_keys(show: &MediaItem) -> Vec<String> {
    let mut keys = Vec::new();
    for prefix in ["tmdb", "imdb", "tvdb"] {
        let scheme = format!("{}://", prefix);
        keys.extend(
            show.show_eids()
                .iter()
                .filter_map(|eid| eid.strip_prefix(scheme.as_str()))
                .map(|id| format!("{}:{}", prefix, id)),
        );
    }
    keys.push(format!(
        "title:{}:{}",
        show.show_title().to_lowercase(),
        show.show_year().map(|y| y.to_string()).unwrap_or_default()
    ));
    keys
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    #[serde(default)]
    tv_results: Vec<TvResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TvResult>,
}

#[derive(Debug, Clone, Deserialize)]
struct TvResult {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    original_name: String,
    #[serde(default)]
    first_air_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TvDetails {
    id: u64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    in_production: Option<bool>,
    #[serde(default)]
    number_of_episodes: Option<u32>,
    #[serde(default)]
    seasons: Vec<TvSeason>,
}

#[derive(Debug, Deserialize)]
struct TvSeason {
    season_number: u32,
    #[serde(default)]
    episode_count: u32,
}

/// Pick the best search result: exact title match first, then matching year.
fn best_match(results: &[TvResult], title: &str, year: Option<i32>) -> Option<u64> {
    let title = title.to_lowercase();
    results
        .iter()
        .enumerate()
        .max_by_key(|(position, r)| {
            let mut score = 0;
            if r.name.to_lowercase() == title || r.original_name.to_lowercase() == title {
                score += 2;
            }
            let first_year = r
                .first_air_date
                .as_deref()
                .and_then(|d| d.get(..4))
                .and_then(|y| y.parse::<i32>().ok());
            if year.is_some() && first_year == year {
                score += 1;
            }
            // Earlier results win ties.
            (score, std::cmp::Reverse(*position))
        })
        .map(|(_, r)| r.id)
}

fn status_from_details(details: &TvDetails, now: DateTime<Utc>) -> ShowStatus {
    let regular: Vec<&TvSeason> = details
        .seasons
        .iter()
        .filter(|s| s.season_number >= 1)
        .collect();
    let (expected_episodes, expected_source) = if !regular.is_empty() {
        (
            Some(regular.iter().map(|s| s.episode_count).sum()),
            Some("seasons".to_string()),
        )
    } else if let Some(n) = details.number_of_episodes {
        (Some(n), Some("number_of_episodes".to_string()))
    } else {
        (None, None)
    };
    ShowStatus {
        tmdb_id: Some(details.id),
        status: details.status.clone(),
        in_production: details.in_production,
        ended: details.status.as_deref().is_some_and(is_ended_status),
        expected_episodes,
        expected_source,
        source: "tmdb".to_string(),
        checked_at: now.timestamp(),
    }
}

/// Show status service backed by the TMDB API.
pub struct TmdbStatusClient {
    client: Client,
    api_key: String,
    base_url: String,
    cache_path: PathBuf,
    cache: Mutex<HashMap<String, ShowStatus>>,
}

impl TmdbStatusClient {
    pub fn new(config: &TmdbConfig, cache_path: PathBuf) -> Result<Self, StatusError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StatusError::ConnectionFailed(e.to_string()))?;
        let cache = load_cache(&cache_path);
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: TMDB_API_URL.to_string(),
            cache_path,
            cache: Mutex::new(cache),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fresh cached status under any of the keys.
    pub fn cached(&self, keys: &[String], now: DateTime<Utc>) -> Option<ShowStatus> {
        let cache = self.cache.lock().unwrap();
        keys.iter()
            .filter_map(|k| cache.get(k))
            .find(|s| s.is_fresh(now))
            .map(|s| ShowStatus {
                source: "cache".to_string(),
                ..s.clone()
            })
    }

    fn store(&self, key: &str, status: &ShowStatus) {
        let mut cache = self.cache.lock().unwrap();
        cache.insert(key.to_string(), status.clone());
        if let Some(id) = status.tmdb_id {
            cache.insert(format!("tmdb:{}", id), status.clone());
        }
        if let Err(e) = save_cache(&self.cache_path, &cache) {
            warn!(path = %self.cache_path.display(), error = %e, "Failed to save status cache");
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, StatusError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(StatusError::ApiError(format!("HTTP {} for {}", status, path)));
        }
        response
            .json()
            .await
            .map_err(|e| StatusError::ApiError(format!("Failed to parse response: {}", e)))
    }

    async fn find(&self, external_id: &str, source: &str) -> Result<Option<u64>, StatusError> {
        let found: FindResponse = self
            .get(
                &format!("/find/{}", external_id),
                &[("external_source", source.to_string())],
            )
            .await?;
        Ok(found.tv_results.first().map(|r| r.id))
    }

    async fn resolve_tmdb_id(&self, show: &MediaItem) -> Result<Option<u64>, StatusError> {
        let eids = show.show_eids();
        if let Some(id) = eids
            .iter()
            .filter_map(|e| e.strip_prefix("tmdb://"))
            .find_map(|id| id.parse().ok())
        {
            return Ok(Some(id));
        }
        for (scheme, source) in [("imdb://", "imdb_id"), ("tvdb://", "tvdb_id")] {
            if let Some(external) = eids.iter().find_map(|e| e.strip_prefix(scheme)) {
                if let Some(id) = self.find(external, source).await? {
                    return Ok(Some(id));
                }
            }
        }

        let mut params = vec![("query", show.show_title().to_string())];
        if let Some(year) = show.show_year() {
            params.push(("first_air_date_year", year.to_string()));
        }
        let search: SearchResponse = self.get("/search/tv", &params).await?;
        Ok(best_match(&search.results, show.show_title(), show.show_year()))
    }
}

#[async_trait]
impl StatusService for TmdbStatusClient {
    fn name(&self) -> &str {
        "tmdb"
    }

    async fn show_status(&self, show: &MediaItem) -> Result<Option<ShowStatus>, StatusError> {
        let now = Utc::now();
        let keys = cache_keys(show);
        if let Some(status) = self.cached(&keys, now) {
            debug!(show = %show.show_title(), "Show status from cache");
            return Ok(Some(status));
        }

        let Some(tmdb_id) = self.resolve_tmdb_id(show).await? else {
            debug!(show = %show.show_title(), "Show not found on TMDB");
            return Ok(None);
        };
        let details: TvDetails = self.get(&format!("/tv/{}", tmdb_id), &[]).await?;
        let status = status_from_details(&details, now);
        debug!(
            show = %show.show_title(),
            tmdb_id = tmdb_id,
            ended = status.ended,
            expected = ?status.expected_episodes,
            "Show status from TMDB"
        );
        if let Some(key) = keys.first() {
            self.store(key, &status);
        }
        Ok(Some(status))
    }
}

fn load_cache(path: &Path) -> HashMap<String, ShowStatus> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable status cache");
            HashMap::new()
        }),
        Err(_) => HashMap::new(),
    }
}

fn save_cache(path: &Path, cache: &HashMap<String, ShowStatus>) -> Result<(), StatusError> {
    let text =
        serde_json::to_string_pretty(cache).map_err(|e| StatusError::Cache(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| StatusError::Cache(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use tempfile::TempDir;

    fn config() -> TmdbConfig {
        TmdbConfig {
            api_key: "key".to_string(),
            cache_path: None,
            timeout_secs: 1,
        }
    }

    fn wire() -> MediaItem {
        let mut show = MediaItem::new(MediaKind::Show, "The Wire");
        show.year = Some(2002);
        show.eids = vec!["imdb://tt0306414".to_string(), "tvdb://79126".to_string()];
        show
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(
            cache_keys(&wire()),
            vec!["imdb:tt0306414", "tvdb:79126", "title:the wire:2002"]
        );
    }

    #[test]
    fn test_best_match_prefers_exact_title_then_year() {
        let results = vec![
            TvResult {
                id: 1,
                name: "The Wire Extra".to_string(),
                original_name: String::new(),
                first_air_date: Some("2002-06-02".to_string()),
            },
            TvResult {
                id: 2,
                name: "The Wire".to_string(),
                original_name: String::new(),
                first_air_date: Some("1990-01-01".to_string()),
            },
            TvResult {
                id: 3,
                name: "The Wire".to_string(),
                original_name: String::new(),
                first_air_date: Some("2002-06-02".to_string()),
            },
        ];
        assert_eq!(best_match(&results, "The Wire", Some(2002)), Some(3));
        assert_eq!(best_match(&results, "The Wire", None), Some(2));
        assert_eq!(best_match(&[], "The Wire", None), None);
    }

    #[test]
    fn test_status_from_details() {
        let details: TvDetails = serde_json::from_str(
            r#"{
                "id": 1438,
                "status": "Ended",
                "in_production": false,
                "number_of_episodes": 62,
                "seasons": [
                    {"season_number": 0, "episode_count": 9},
                    {"season_number": 1, "episode_count": 13},
                    {"season_number": 2, "episode_count": 12}
                ]
            }"#,
        )
        .unwrap();
        let status = status_from_details(&details, Utc::now());
        assert!(status.ended);
        assert_eq!(status.tmdb_id, Some(1438));
        assert_eq!(status.expected_episodes, Some(25));
        assert_eq!(status.expected_source.as_deref(), Some("seasons"));
        assert_eq!(status.source, "tmdb");
    }

    #[tokio::test]
    async fn test_fresh_cache_entry_is_served_without_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tmdb_status_cache.json");
        let now = Utc::now();
        let entry = ShowStatus {
            tmdb_id: Some(1438),
            status: Some("Ended".to_string()),
            in_production: Some(false),
            ended: true,
            expected_episodes: Some(60),
            expected_source: Some("seasons".to_string()),
            source: "tmdb".to_string(),
            checked_at: now.timestamp() - 3600,
        };
        let cache = HashMap::from([("imdb:tt0306414".to_string(), entry)]);
        save_cache(&path, &cache).unwrap();

        let client = TmdbStatusClient::new(&config(), path)
            .unwrap()
            .with_base_url("http://127.0.0.1:1");
        let status = client.show_status(&wire()).await.unwrap().unwrap();
        assert_eq!(status.source, "cache");
        assert_eq!(status.expected_episodes, Some(60));
    }

    #[test]
    fn test_store_writes_id_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        let client = TmdbStatusClient::new(&config(), path.clone()).unwrap();
        let status = ShowStatus {
            tmdb_id: Some(1438),
            status: Some("Returning Series".to_string()),
            in_production: Some(true),
            ended: false,
            expected_episodes: None,
            expected_source: None,
            source: "tmdb".to_string(),
            checked_at: Utc::now().timestamp(),
        };
        client.store("title:the wire:2002", &status);

        let reloaded = load_cache(&path);
        assert!(reloaded.contains_key("title:the wire:2002"));
        assert!(reloaded.contains_key("tmdb:1438"));
    }
}
