//! Compatibility rules gating libraries, arguments and whole releases.
//!
//! A rule list is evaluated in order starting from "disallow". Every rule
//! whose OS restriction and feature requirements match the environment
//! overwrites the running result with its own action. A missing or empty
//! list always allows.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::platform::{FeatureMatcher, LaunchEnvironment, OperatingSystem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Allow,
    Disallow,
}

/// OS constraints of a rule. Absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsRestriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<OperatingSystem>,
    /// Must match the whole OS version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<RulePattern>,
    /// Must match the whole architecture string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<RulePattern>,
}

impl OsRestriction {
    pub fn matches(&self, env: &LaunchEnvironment) -> bool {
        if let Some(name) = self.name {
            if name != env.os {
                return false;
            }
        }
        self.version.as_ref().map_or(true, |p| p.matches(&env.os_version))
            && self.arch.as_ref().map_or(true, |p| p.matches(&env.arch))
    }
}

/// A rule regex, compiled when the rule is read.
///
/// Serializes back to the pattern text it was read from.
#[derive(Debug, Clone)]
pub struct RulePattern {
    source: String,
    regex: Option<Regex>,
}

impl RulePattern {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let regex = match Regex::new(&format!("^(?:{source})$")) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %source, error = %e, "Ignoring unparsable rule pattern");
                None
            }
        };
        Self { source, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Whole-string match. An unparsable pattern matches anything.
    pub fn matches(&self, value: &str) -> bool {
        self.regex.as_ref().map_or(true, |regex| regex.is_match(value))
    }
}

impl PartialEq for RulePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RulePattern {}

impl From<&str> for RulePattern {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl Serialize for RulePattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for RulePattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    #[serde(default)]
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRestriction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, Value>>,
}

impl CompatibilityRule {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            ..Self::default()
        }
    }

    pub fn for_os(mut self, os: OperatingSystem) -> Self {
        self.os.get_or_insert_with(OsRestriction::default).name = Some(os);
        self
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: bool) -> Self {
        self.features
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), Value::Bool(value));
        self
    }

    /// The action this rule contributes, or `None` if it does not apply.
    pub fn applied_action(&self, env: &LaunchEnvironment) -> Option<RuleAction> {
        if let Some(os) = &self.os {
            if !os.matches(env) {
                return None;
            }
        }
        if let Some(features) = &self.features {
            let all_present = features
                .iter()
                .all(|(name, value)| env.features.has_feature(name, value));
            if !all_present {
                return None;
            }
        }
        Some(self.action)
    }
}

/// Evaluate a rule list against `env`.
pub fn rules_allow(rules: Option<&[CompatibilityRule]>, env: &LaunchEnvironment) -> bool {
    let rules = match rules {
        Some(rules) if !rules.is_empty() => rules,
        _ => return true,
    };

    let action = rules
        .iter()
        .filter_map(|rule| rule.applied_action(env))
        .last()
        .unwrap_or(RuleAction::Disallow);
    action == RuleAction::Allow
}
