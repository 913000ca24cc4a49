pub mod config;
pub mod download;
pub mod library;
pub mod media;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod release;
pub mod searcher;
pub mod state;
pub mod status;
pub mod testing;
pub mod version;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use download::{DownloadBackend, DownloadError};
pub use library::{CatalogAdapter, CatalogError, Library, MetadataService, Watchlist};
pub use media::{MediaItem, MediaKind};
pub use orchestrator::{Autoremove, Orchestrator, OrchestratorConfig, Outcome, SweepReport};
pub use policy::{PolicyDecision, PolicyError, PolicySettings, PolicyStore, ReleasePolicy, UpgradeEntry};
pub use release::{Protocol, Release};
pub use searcher::{MagnetResolver, ProwlarrSearcher, ReleaseSource, SearchError, TargetIds};
pub use state::{IgnoreService, RetryTransition, SessionState};
pub use status::{ShowStatus, StatusError, StatusService, TmdbStatusClient};
pub use version::{Rule, Version, VersionEngine};
