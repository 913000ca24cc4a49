//! Versions: named acquisition profiles and the rule engine that decides
//! which of them an item still needs.

mod engine;
mod rules;
mod types;

pub use engine::{ledger_key, SessionView, VersionEngine};
pub use types::{MediaScope, Rule, RuleField, RuleKind, RuleOperator, Trigger, Version};
