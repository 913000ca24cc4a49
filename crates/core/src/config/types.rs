use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

pub use crate::orchestrator::{Autoremove, OrchestratorConfig};
use crate::policy::{PolicySettings, POLICY_FILE_NAME};
use crate::version::Version;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub searcher: SearcherConfig,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Acquisition profiles. The built-in default profile is used when empty.
    #[serde(default)]
    pub versions: Vec<Version>,
}

impl Config {
    /// Configured versions, or the built-in default profile.
    pub fn versions(&self) -> Vec<Version> {
        if self.versions.is_empty() {
            vec![Version::default_profile()]
        } else {
            self.versions.clone()
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Collection backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Whether the collection keeps per-file history (enables upgrade derivation).
    #[serde(default = "default_true")]
    pub tracks_files: bool,
    /// Name of the service items were originally requested from.
    #[serde(default)]
    pub request_service: Option<String>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            tracks_files: true,
            request_service: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Release policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// Directory holding the persisted policy state.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_timer_window_days")]
    pub timer_window_days: i64,
    #[serde(default = "default_stale_after_days")]
    pub stale_after_days: i64,
    #[serde(default = "default_upgrade_max_age_days")]
    pub upgrade_max_age_days: i64,
    #[serde(default = "default_upgrade_check_interval_days")]
    pub upgrade_check_interval_days: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            timer_window_days: default_timer_window_days(),
            stale_after_days: default_stale_after_days(),
            upgrade_max_age_days: default_upgrade_max_age_days(),
            upgrade_check_interval_days: default_upgrade_check_interval_days(),
        }
    }
}

impl PolicyConfig {
    pub fn policy_file(&self) -> PathBuf {
        self.state_dir.join(POLICY_FILE_NAME)
    }

    pub fn settings(&self) -> PolicySettings {
        PolicySettings {
            timer_window: chrono::Duration::days(self.timer_window_days),
            stale_after: chrono::Duration::days(self.stale_after_days),
            upgrade_max_age: chrono::Duration::days(self.upgrade_max_age_days),
            upgrade_check_interval: chrono::Duration::days(self.upgrade_check_interval_days),
        }
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_timer_window_days() -> i64 {
    2
}

fn default_stale_after_days() -> i64 {
    365
}

fn default_upgrade_max_age_days() -> i64 {
    730
}

fn default_upgrade_check_interval_days() -> i64 {
    7
}

/// Searcher configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearcherConfig {
    #[serde(default)]
    pub prowlarr: Option<ProwlarrConfig>,
}

/// Prowlarr search backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProwlarrConfig {
    /// Prowlarr server URL (e.g., "http://localhost:9696")
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// Indexer categories to search (default: movies and TV).
    #[serde(default = "default_categories")]
    pub categories: Vec<u32>,
    /// Search request timeout in seconds.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
    /// Per-link resolution timeout in seconds.
    #[serde(default = "default_resolver_timeout")]
    pub resolver_timeout_secs: u64,
    /// Most download links resolved per search.
    #[serde(default = "default_max_resolve")]
    pub max_resolve: usize,
    /// Single-episode hits resolved alongside season packs.
    #[serde(default = "default_fallback_episodes")]
    pub fallback_episodes: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Retries after a resolution timeout.
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ProwlarrConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9696".to_string(),
            api_key: String::new(),
            max_results: default_max_results(),
            categories: default_categories(),
            timeout_secs: default_search_timeout(),
            resolver_timeout_secs: default_resolver_timeout(),
            max_resolve: default_max_resolve(),
            fallback_episodes: default_fallback_episodes(),
            concurrency: default_concurrency(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_results() -> u32 {
    100
}

fn default_categories() -> Vec<u32> {
    vec![2000, 5000]
}

fn default_search_timeout() -> u64 {
    60
}

fn default_resolver_timeout() -> u64 {
    30
}

fn default_max_resolve() -> usize {
    50
}

fn default_fallback_episodes() -> usize {
    5
}

fn default_concurrency() -> usize {
    10
}

fn default_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// TMDB show status configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    pub api_key: String,
    /// Status cache file (default: `<state_dir>/tmdb_status_cache.json`).
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default = "default_tmdb_timeout")]
    pub timeout_secs: u64,
}

impl TmdbConfig {
    pub fn cache_path(&self, policy: &PolicyConfig) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| policy.state_dir.join("tmdb_status_cache.json"))
    }
}

fn default_tmdb_timeout() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub policy: PolicyConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prowlarr: Option<SanitizedProwlarrConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<SanitizedTmdbConfig>,
    pub orchestrator: OrchestratorConfig,
    pub versions: Vec<Version>,
}

/// Sanitized Prowlarr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProwlarrConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub max_results: u32,
    pub categories: Vec<u32>,
    pub max_resolve: usize,
    pub concurrency: usize,
}

/// Sanitized TMDB config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTmdbConfig {
    pub api_key_configured: bool,
    pub cache_path: PathBuf,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            library: config.library.clone(),
            policy: config.policy.clone(),
            prowlarr: config
                .searcher
                .prowlarr
                .as_ref()
                .map(|p| SanitizedProwlarrConfig {
                    url: p.url.clone(),
                    api_key_configured: !p.api_key.is_empty(),
                    max_results: p.max_results,
                    categories: p.categories.clone(),
                    max_resolve: p.max_resolve,
                    concurrency: p.concurrency,
                }),
            tmdb: config.tmdb.as_ref().map(|t| SanitizedTmdbConfig {
                api_key_configured: !t.api_key.is_empty(),
                cache_path: t.cache_path(&config.policy),
            }),
            orchestrator: config.orchestrator.clone(),
            versions: config.versions(),
        }
    }
}
