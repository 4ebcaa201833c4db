//! Host platform description used to evaluate compatibility rules.
//!
//! Rules never look up the running system themselves: callers build a
//! [`LaunchEnvironment`] (usually via [`LaunchEnvironment::current`]) and
//! pass it in, which keeps evaluation a pure function and lets tests
//! describe any platform.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Feature flag: the player only has a demo account.
pub const FEATURE_DEMO_USER: &str = "is_demo_user";

/// Feature flag: the player chose a custom window resolution.
pub const FEATURE_CUSTOM_RESOLUTION: &str = "has_custom_resolution";

/// Features the launcher always knows about; unset means off.
pub const KNOWN_FEATURES: &[&str] = &[FEATURE_DEMO_USER, FEATURE_CUSTOM_RESOLUTION];

/// Operating systems named in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Linux,
    Windows,
    Osx,
    #[serde(other)]
    Unknown,
}

impl OperatingSystem {
    /// Descriptor name of the OS.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Osx => "osx",
            Self::Unknown => "unknown",
        }
    }

    /// Substrings that identify this OS in a platform name.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Linux => &["linux", "unix"],
            Self::Windows => &["win"],
            Self::Osx => &["mac"],
            Self::Unknown => &[],
        }
    }

    /// Classify a platform name such as `std::env::consts::OS`.
    pub fn from_platform_name(name: &str) -> Self {
        let name = name.to_lowercase();
        [Self::Linux, Self::Windows, Self::Osx]
            .into_iter()
            .find(|os| os.aliases().iter().any(|alias| name.contains(alias)))
            .unwrap_or(Self::Unknown)
    }

    /// The OS this binary is running on.
    pub fn current() -> Self {
        Self::from_platform_name(std::env::consts::OS)
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answers feature requirements in compatibility rules.
pub trait FeatureMatcher {
    fn has_feature(&self, name: &str, value: &Value) -> bool;
}

/// Boolean feature flags.
///
/// Unset [`KNOWN_FEATURES`] read as `false`. Any other unset feature never
/// matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    flags: BTreeMap<String, bool>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.flags.insert(name.into(), enabled);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, enabled: bool) {
        self.flags.insert(name.into(), enabled);
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags
            .get(name)
            .copied()
            .or_else(|| KNOWN_FEATURES.contains(&name).then_some(false))
    }

    /// Whether `name` is set to true.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }
}

impl FeatureMatcher for FeatureSet {
    fn has_feature(&self, name: &str, value: &Value) -> bool {
        match (self.get(name), value.as_bool()) {
            (Some(actual), Some(wanted)) => actual == wanted,
            _ => false,
        }
    }
}

/// Everything rule evaluation needs to know about the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnvironment {
    pub os: OperatingSystem,
    /// Kernel or OS release, matched by `os.version` rule regexes.
    pub os_version: String,
    /// CPU architecture, matched by `os.arch` rule regexes.
    pub arch: String,
    pub features: FeatureSet,
}

impl LaunchEnvironment {
    pub fn new(os: OperatingSystem, os_version: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os,
            os_version: os_version.into(),
            arch: arch.into(),
            features: FeatureSet::new(),
        }
    }

    /// Describe the running host.
    pub fn current() -> Self {
        Self::new(OperatingSystem::current(), detect_os_version(), std::env::consts::ARCH)
    }

    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    /// `64` or `32`, substituted for `${arch}` in native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        if self.arch.contains("64") {
            "64"
        } else {
            "32"
        }
    }
}

#[cfg(target_os = "linux")]
fn detect_os_version() -> String {
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

#[cfg(not(target_os = "linux"))]
fn detect_os_version() -> String {
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name_aliases() {
        assert_eq!(OperatingSystem::from_platform_name("linux"), OperatingSystem::Linux);
        assert_eq!(OperatingSystem::from_platform_name("Windows 10"), OperatingSystem::Windows);
        assert_eq!(OperatingSystem::from_platform_name("macos"), OperatingSystem::Osx);
        assert_eq!(OperatingSystem::from_platform_name("haiku"), OperatingSystem::Unknown);
    }

    #[test]
    fn test_os_serde_names() {
        let os: OperatingSystem = serde_json::from_str("\"osx\"").unwrap();
        assert_eq!(os, OperatingSystem::Osx);
        let other: OperatingSystem = serde_json::from_str("\"solaris\"").unwrap();
        assert_eq!(other, OperatingSystem::Unknown);
        assert_eq!(serde_json::to_string(&OperatingSystem::Windows).unwrap(), "\"windows\"");
    }

    #[test]
    fn test_feature_matching() {
        let features = FeatureSet::new().with(FEATURE_DEMO_USER, true);
        assert!(features.has_feature(FEATURE_DEMO_USER, &Value::Bool(true)));
        assert!(!features.has_feature(FEATURE_DEMO_USER, &Value::Bool(false)));
        assert!(!features.has_feature(FEATURE_CUSTOM_RESOLUTION, &Value::Bool(true)));
        assert!(!features.has_feature(FEATURE_DEMO_USER, &Value::String("yes".into())));
    }

    #[test]
    fn test_unset_known_features_are_off() {
        let features = FeatureSet::new();
        assert!(features.has_feature(FEATURE_DEMO_USER, &Value::Bool(false)));
        assert!(features.has_feature(FEATURE_CUSTOM_RESOLUTION, &Value::Bool(false)));
        assert!(!features.has_feature(FEATURE_CUSTOM_RESOLUTION, &Value::Bool(true)));
        assert!(!features.is_enabled(FEATURE_DEMO_USER));

        assert!(!features.has_feature("has_quick_plays_support", &Value::Bool(false)));
        assert_eq!(features.get("has_quick_plays_support"), None);
    }

    #[test]
    fn test_arch_bits() {
        assert_eq!(LaunchEnvironment::new(OperatingSystem::Linux, "", "x86_64").arch_bits(), "64");
        assert_eq!(LaunchEnvironment::new(OperatingSystem::Linux, "", "x86").arch_bits(), "32");
    }
}
