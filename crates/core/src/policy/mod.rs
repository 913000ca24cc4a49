//! Release policy: a 4K grace timer that holds back sub-4K releases for new
//! items, and a queue of 1080p acquisitions to revisit once 4K shows up.
//!
//! Both live in one JSON file (`release_policy.json`) that is rewritten in
//! full on every change.

mod guard;
mod store;

pub use guard::{PolicyDecision, PolicySettings, ReleasePolicy};
pub use store::{PolicyError, PolicyState, PolicyStore, UpgradeEntry, POLICY_FILE_NAME};
