//! Acquisition orchestrator.
//!
//! Decides, per wanted item, what to search for, which release to take and
//! whether to retry later:
//! - **Movies and episodes**: searched by title, submitted release by release
//! - **Shows and seasons**: season packs are weighed against per-unit releases
//!   before falling through to seasons and episodes
//! - **Failures**: counted against the item's retry threshold until it is suppressed

mod arbitration;
mod config;
mod runner;
mod types;

pub use arbitration::{best_cached_resolution, prefer_pack, unit_best};
pub use config::{Autoremove, OrchestratorConfig};
pub use runner::Orchestrator;
pub use types::{Acquisition, Outcome, SweepReport};
