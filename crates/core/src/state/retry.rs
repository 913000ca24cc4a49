//! Retry bookkeeping: Active → Ignored(n) → Suppressed.

use std::collections::{HashMap, HashSet};

/// Result of recording a failed acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryTransition {
    /// No retry threshold applies, nothing was recorded.
    Untracked,
    /// The item has failed this many times.
    Ignored(u32),
    /// The threshold was reached and the item is now suppressed.
    Suppressed,
}

#[derive(Debug, Default, Clone)]
pub struct RetryTracker {
    ignored: HashMap<String, u32>,
    suppressed: HashSet<String>,
}

impl RetryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure against a retry threshold. The failure that brings
    /// the count to `threshold` suppresses the item.
    pub fn record_failure(&mut self, key: &str, threshold: u32) -> RetryTransition {
        if threshold == 0 {
            return RetryTransition::Untracked;
        }
        let failures = self.ignored.get(key).copied().unwrap_or(0) + 1;
        if failures >= threshold {
            self.ignored.remove(key);
            self.suppressed.insert(key.to_string());
            RetryTransition::Suppressed
        } else {
            self.ignored.insert(key.to_string(), failures);
            RetryTransition::Ignored(failures)
        }
    }

    pub fn record_success(&mut self, key: &str) {
        self.ignored.remove(key);
    }

    pub fn failures(&self, key: &str) -> u32 {
        self.ignored.get(key).copied().unwrap_or(0)
    }

    pub fn is_suppressed(&self, key: &str) -> bool {
        self.suppressed.contains(key)
    }

    /// Explicitly reverse a suppression. Returns whether the key was suppressed.
    pub fn unsuppress(&mut self, key: &str) -> bool {
        self.suppressed.remove(key)
    }

    pub fn suppressed(&self) -> &HashSet<String> {
        &self.suppressed
    }

    pub fn ignored(&self) -> &HashMap<String, u32> {
        &self.ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_failures_suppress_at_threshold_three() {
        let mut tracker = RetryTracker::new();
        assert_eq!(tracker.record_failure("movie|a", 3), RetryTransition::Ignored(1));
        assert_eq!(tracker.record_failure("movie|a", 3), RetryTransition::Ignored(2));
        assert_eq!(tracker.record_failure("movie|a", 3), RetryTransition::Suppressed);
        assert!(tracker.is_suppressed("movie|a"));
        assert_eq!(tracker.failures("movie|a"), 0);
    }

    #[test]
    fn test_success_resets() {
        let mut tracker = RetryTracker::new();
        tracker.record_failure("movie|a", 3);
        tracker.record_failure("movie|a", 3);
        tracker.record_success("movie|a");
        assert_eq!(tracker.failures("movie|a"), 0);
        assert_eq!(tracker.record_failure("movie|a", 3), RetryTransition::Ignored(1));
        assert!(!tracker.is_suppressed("movie|a"));
    }

    #[test]
    fn test_zero_threshold_is_untracked() {
        let mut tracker = RetryTracker::new();
        assert_eq!(tracker.record_failure("movie|a", 0), RetryTransition::Untracked);
        assert!(tracker.ignored().is_empty());
    }

    #[test]
    fn test_unsuppress() {
        let mut tracker = RetryTracker::new();
        tracker.record_failure("movie|a", 1);
        assert!(tracker.is_suppressed("movie|a"));
        assert!(tracker.unsuppress("movie|a"));
        assert!(!tracker.unsuppress("movie|a"));
        assert!(!tracker.is_suppressed("movie|a"));
    }
}
