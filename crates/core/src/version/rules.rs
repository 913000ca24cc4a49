//! Rule evaluation: requirement filtering, ranking and upgrade checks.

use std::cmp::Ordering;

use regex_lite::Regex;
use tracing::warn;

use super::{Rule, RuleField, RuleKind, RuleOperator, Version};
use crate::media::ExistingFile;
use crate::release::Release;

fn numeric(field: RuleField, release: &Release) -> Option<f64> {
    match field {
        RuleField::Resolution => Some(release.resolution as f64),
        RuleField::Size => Some(release.size_gb),
        RuleField::Seeders => Some(release.seeders as f64),
        RuleField::Bitrate => Some(release.bitrate),
        RuleField::Title | RuleField::Source | RuleField::CacheStatus => None,
    }
}

fn numeric_field(field: RuleField) -> bool {
    matches!(
        field,
        RuleField::Resolution | RuleField::Size | RuleField::Seeders | RuleField::Bitrate
    )
}

fn text(field: RuleField, release: &Release) -> Option<&str> {
    match field {
        RuleField::Title => Some(&release.title),
        RuleField::Source => Some(&release.source),
        _ => None,
    }
}

fn compare_number(operator: RuleOperator, value: f64, target: f64) -> bool {
    match operator {
        RuleOperator::Eq => (value - target).abs() < f64::EPSILON,
        RuleOperator::Ge => value >= target,
        RuleOperator::Le => value <= target,
        _ => true,
    }
}

/// A rule with its value parsed once for repeated evaluation.
struct CompiledRule<'a> {
    rule: &'a Rule,
    number: Option<f64>,
    pattern: Option<Regex>,
}

impl<'a> CompiledRule<'a> {
    fn compile(rule: &'a Rule) -> Option<Self> {
        let pattern = match rule.operator {
            RuleOperator::Include | RuleOperator::Exclude => {
                match Regex::new(&format!("(?i){}", rule.value)) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(value = %rule.value, error = %e, "Skipping rule with invalid pattern");
                        return None;
                    }
                }
            }
            _ => None,
        };
        Some(Self {
            rule,
            number: rule.value.trim().parse().ok(),
            pattern,
        })
    }

    fn matches_text(&self, release: &Release) -> bool {
        match (&self.pattern, text(self.rule.field, release)) {
            (Some(re), Some(t)) => re.is_match(t),
            _ => false,
        }
    }

    fn accepts(&self, release: &Release) -> bool {
        match self.rule.operator {
            RuleOperator::Eq | RuleOperator::Ge | RuleOperator::Le => {
                match (numeric(self.rule.field, release), self.number) {
                    (Some(value), Some(target)) => compare_number(self.rule.operator, value, target),
                    _ => true,
                }
            }
            RuleOperator::Include => self.matches_text(release),
            RuleOperator::Exclude => !self.matches_text(release),
            RuleOperator::Cached => release.has_cached_copy(),
            RuleOperator::Uncached => !release.has_cached_copy(),
            RuleOperator::Highest | RuleOperator::Lowest => true,
        }
    }

    /// Ordering where `Less` means `a` ranks first.
    fn compare(&self, a: &Release, b: &Release) -> Ordering {
        let field = self.rule.field;
        match self.rule.operator {
            RuleOperator::Highest => numeric(field, b)
                .partial_cmp(&numeric(field, a))
                .unwrap_or(Ordering::Equal),
            RuleOperator::Lowest => numeric(field, a)
                .partial_cmp(&numeric(field, b))
                .unwrap_or(Ordering::Equal),
            _ => self.accepts(b).cmp(&self.accepts(a)),
        }
    }
}

fn default_order(a: &Release, b: &Release) -> Ordering {
    b.has_cached_copy()
        .cmp(&a.has_cached_copy())
        .then(b.resolution.cmp(&a.resolution))
        .then(b.seeders.cmp(&a.seeders))
}

impl Rule {
    /// Check that the value fits the operator: comparisons need a number,
    /// include/exclude need a valid pattern.
    pub fn validate(&self) -> Result<(), String> {
        match self.operator {
            RuleOperator::Eq | RuleOperator::Ge | RuleOperator::Le => {
                if numeric_field(self.field) && self.value.trim().parse::<f64>().is_err() {
                    return Err(format!("value '{}' is not a number", self.value));
                }
            }
            RuleOperator::Include | RuleOperator::Exclude => {
                Regex::new(&format!("(?i){}", self.value))
                    .map_err(|e| format!("value '{}' is not a valid pattern: {}", self.value, e))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// True when files exist and none of them meets this rule.
    pub fn needs_upgrade(&self, existing: &[ExistingFile]) -> bool {
        if existing.is_empty() {
            return false;
        }
        match (self.field, self.operator) {
            (RuleField::Resolution, RuleOperator::Eq | RuleOperator::Ge | RuleOperator::Le) => {
                let Ok(target) = self.value.trim().parse::<f64>() else {
                    return false;
                };
                !existing
                    .iter()
                    .any(|f| compare_number(self.operator, f.resolution as f64, target))
            }
            (RuleField::Title, RuleOperator::Include | RuleOperator::Exclude) => {
                let Ok(re) = Regex::new(&format!("(?i){}", self.value)) else {
                    return false;
                };
                let include = self.operator == RuleOperator::Include;
                !existing.iter().any(|f| re.is_match(&f.path) == include)
            }
            _ => false,
        }
    }
}

impl Version {
    /// Drop releases failing a requirement and rank the rest by the rule list,
    /// then by cache status, resolution and seeders.
    pub fn sort(&self, releases: Vec<Release>) -> Vec<Release> {
        let compiled: Vec<CompiledRule> = self
            .rules
            .iter()
            .filter(|r| r.kind != RuleKind::Upgrade)
            .filter_map(CompiledRule::compile)
            .collect();

        let mut kept: Vec<Release> = releases
            .into_iter()
            .filter(|release| {
                compiled
                    .iter()
                    .filter(|c| c.rule.kind == RuleKind::Requirement)
                    .all(|c| c.accepts(release))
            })
            .collect();

        kept.sort_by(|a, b| {
            compiled
                .iter()
                .map(|c| c.compare(a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or_else(|| default_order(a, b))
        });
        kept
    }
}
