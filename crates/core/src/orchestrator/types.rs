//! Types for the acquisition orchestrator.

use serde::Serialize;

use crate::policy::PolicyDecision;
use crate::release::Release;

/// What processing one item achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Something was submitted; the library should be refreshed.
    pub refreshed: bool,
    /// The item is still wanted and should be tried again next cycle.
    pub should_retry: bool,
}

impl Outcome {
    pub fn new(refreshed: bool, should_retry: bool) -> Self {
        Self {
            refreshed,
            should_retry,
        }
    }

    /// Aggregate a child outcome into this one.
    pub fn absorb(&mut self, other: Outcome) {
        self.refreshed |= other.refreshed;
        self.should_retry |= other.should_retry;
    }
}

/// Result of one attempt to submit an item's candidate releases.
#[derive(Debug, Clone, Default)]
pub struct Acquisition {
    pub downloaded: bool,
    /// Nothing was accepted; at least one version was attempted.
    pub retry: bool,
    /// The accepted release.
    pub release: Option<Release>,
    /// Name of the version the release was accepted for.
    pub version: Option<String>,
    pub decision: PolicyDecision,
}

/// Counts from one upgrade sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub checked: usize,
    pub upgraded: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_absorb() {
        let mut outcome = Outcome::default();
        outcome.absorb(Outcome::new(true, false));
        outcome.absorb(Outcome::new(false, true));
        assert_eq!(outcome, Outcome::new(true, true));
    }
}
