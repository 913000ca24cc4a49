use serde::{Deserialize, Serialize};

use crate::media::{ExistingFile, MediaItem, MediaKind};

/// Which media kinds a version targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaScope {
    #[default]
    All,
    Movies,
    Shows,
}

/// When a version applies to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum Trigger {
    MediaType { scope: MediaScope },
    /// Retry threshold: failed items are retried this many times before
    /// being suppressed.
    RetriesAtMost { count: u32 },
    /// The version only applies once the item failed this many times.
    RetriesAtLeast { count: u32 },
}

/// Whether a rule filters, ranks, or describes an upgrade target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Requirement,
    Preference,
    Upgrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleField {
    Resolution,
    Title,
    Source,
    /// Size in GB.
    Size,
    Seeders,
    /// Bitrate in Mbit/s.
    Bitrate,
    #[serde(alias = "cache status")]
    CacheStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "highest")]
    Highest,
    #[serde(rename = "lowest")]
    Lowest,
    #[serde(rename = "include")]
    Include,
    #[serde(rename = "exclude")]
    Exclude,
    #[serde(rename = "cached")]
    Cached,
    #[serde(rename = "uncached")]
    Uncached,
}

/// One `(field, kind, operator, value)` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: RuleField,
    pub kind: RuleKind,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: String,
}

impl Rule {
    pub fn new(field: RuleField, kind: RuleKind, operator: RuleOperator, value: &str) -> Self {
        Self {
            field,
            kind,
            operator,
            value: value.to_string(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_lang() -> String {
    "en".to_string()
}

/// A named acquisition profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Version {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            lang: default_lang(),
            triggers: Vec::new(),
            rules,
        }
    }

    /// Built-in profile used when none is configured.
    pub fn default_profile() -> Self {
        Self::new(
            "default",
            vec![
                Rule::new(RuleField::Resolution, RuleKind::Requirement, RuleOperator::Le, "2160"),
                Rule::new(RuleField::Resolution, RuleKind::Preference, RuleOperator::Highest, ""),
                Rule::new(RuleField::CacheStatus, RuleKind::Preference, RuleOperator::Cached, ""),
                Rule::new(RuleField::Seeders, RuleKind::Preference, RuleOperator::Highest, ""),
            ],
        )
    }

    /// Disabled explicitly or by a struck-through name.
    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.name.contains('\u{0336}')
    }

    pub fn applies(&self, item: &MediaItem) -> bool {
        self.targets(item.kind)
            && self.triggers.iter().all(|trigger| match trigger {
                Trigger::RetriesAtLeast { count } => item.flags.ignored_count >= *count,
                _ => true,
            })
    }

    /// Media-type scope only, ignoring retry gates.
    pub fn targets(&self, kind: MediaKind) -> bool {
        self.triggers.iter().all(|trigger| match trigger {
            Trigger::MediaType { scope } => match scope {
                MediaScope::All => true,
                MediaScope::Movies => kind == MediaKind::Movie,
                MediaScope::Shows => kind != MediaKind::Movie,
            },
            _ => true,
        })
    }

    /// Retry threshold declared by `retries <=` triggers, 0 when none.
    pub fn retry_threshold(&self) -> u32 {
        self.triggers
            .iter()
            .filter_map(|t| match t {
                Trigger::RetriesAtMost { count } => Some(*count),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Failures required before this version applies, 0 when ungated.
    pub fn required_failures(&self) -> u32 {
        self.triggers
            .iter()
            .filter_map(|t| match t {
                Trigger::RetriesAtLeast { count } => Some(*count),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Uncached acquisition is allowed unless a requirement demands cached releases.
    pub fn allows_uncached(&self) -> bool {
        !self.rules.iter().any(|r| {
            r.field == RuleField::CacheStatus
                && r.kind == RuleKind::Requirement
                && r.operator == RuleOperator::Cached
        })
    }

    pub fn has_upgrade_rules(&self) -> bool {
        self.rules.iter().any(|r| r.kind == RuleKind::Upgrade)
    }

    /// Whether a requirement caps this version at 1080p or below.
    pub fn is_capped_at_1080(&self) -> bool {
        self.rules.iter().any(|r| {
            r.field == RuleField::Resolution
                && r.kind == RuleKind::Requirement
                && r.operator == RuleOperator::Le
                && r.value.trim().parse::<u32>().is_ok_and(|v| v <= 1080)
        })
    }

    /// Whether the files already present miss this version's upgrade target.
    pub fn needs_upgrade(&self, existing: &[ExistingFile]) -> bool {
        self.rules
            .iter()
            .filter(|r| r.kind == RuleKind::Upgrade)
            .any(|r| r.needs_upgrade(existing))
    }

    /// Derived `"<name> upgrade"` version: upgrade rules become requirements
    /// and bitrate rules are dropped.
    pub fn upgrade_version(&self) -> Version {
        let rules = self
            .rules
            .iter()
            .filter(|r| r.field != RuleField::Bitrate)
            .map(|r| {
                let mut rule = r.clone();
                if rule.kind == RuleKind::Upgrade {
                    rule.kind = RuleKind::Requirement;
                }
                rule
            })
            .collect();
        Version {
            name: format!("{} upgrade", self.name),
            enabled: self.enabled,
            lang: self.lang.clone(),
            triggers: self.triggers.clone(),
            rules,
        }
    }
}
