//! Launch arguments, optionally gated by compatibility rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::rule::{rules_allow, CompatibilityRule};
use crate::platform::LaunchEnvironment;

/// Launch phase an argument list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    Game,
    Jvm,
}

/// One argument entry: a plain string, or values guarded by rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawArgument", into = "RawArgument")]
pub struct Argument {
    pub values: Vec<String>,
    pub rules: Option<Vec<CompatibilityRule>>,
}

impl Argument {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
            rules: None,
        }
    }

    pub fn conditional(values: Vec<String>, rules: Vec<CompatibilityRule>) -> Self {
        Self {
            values,
            rules: Some(rules),
        }
    }

    pub fn applies_to(&self, env: &LaunchEnvironment) -> bool {
        rules_allow(self.rules.as_deref(), env)
    }

    /// Values with `${key}` placeholders replaced, or nothing if the rules
    /// exclude this argument.
    pub fn expand(&self, env: &LaunchEnvironment, vars: &BTreeMap<String, String>) -> Vec<String> {
        if !self.applies_to(env) {
            return Vec::new();
        }
        self.values.iter().map(|v| substitute(v, vars)).collect()
    }
}

/// Replace `${key}` with `vars[key]`, leaving unknown keys untouched.
pub fn substitute(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawArgument {
    Plain(String),
    Conditional {
        value: OneOrMany,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<CompatibilityRule>>,
    },
}

impl From<RawArgument> for Argument {
    fn from(raw: RawArgument) -> Self {
        match raw {
            RawArgument::Plain(value) => Argument::plain(value),
            RawArgument::Conditional { value, rules } => Argument {
                values: match value {
                    OneOrMany::One(v) => vec![v],
                    OneOrMany::Many(vs) => vs,
                },
                rules,
            },
        }
    }
}

impl From<Argument> for RawArgument {
    fn from(arg: Argument) -> Self {
        match (arg.rules, arg.values.len()) {
            (None, 1) => RawArgument::Plain(arg.values.into_iter().next().unwrap_or_default()),
            (rules, 1) => RawArgument::Conditional {
                value: OneOrMany::One(arg.values.into_iter().next().unwrap_or_default()),
                rules,
            },
            (rules, _) => RawArgument::Conditional {
                value: OneOrMany::Many(arg.values),
                rules,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{FeatureSet, OperatingSystem, FEATURE_CUSTOM_RESOLUTION};

    fn env() -> LaunchEnvironment {
        LaunchEnvironment::new(OperatingSystem::Linux, "6.1", "x86_64")
    }

    #[test]
    fn test_parse_mixed_arguments() {
        let json = r#"[
            "--username",
            "${auth_player_name}",
            {"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
             "value": ["--width", "${resolution_width}"]},
            {"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": "-XstartOnFirstThread"}
        ]"#;
        let args: Vec<Argument> = serde_json::from_str(json).unwrap();
        assert_eq!(args.len(), 4);
        assert_eq!(args[0], Argument::plain("--username"));
        assert_eq!(args[2].values, vec!["--width", "${resolution_width}"]);
        assert_eq!(args[3].values, vec!["-XstartOnFirstThread"]);
    }

    #[test]
    fn test_gated_argument_is_omitted() {
        let arg: Argument = serde_json::from_str(
            r#"{"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": "-XstartOnFirstThread"}"#,
        )
        .unwrap();
        assert!(arg.expand(&env(), &BTreeMap::new()).is_empty());
    }

    #[test]
    fn test_feature_gated_argument_expands() {
        let arg: Argument = serde_json::from_str(
            r#"{"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                "value": ["--width", "${resolution_width}"]}"#,
        )
        .unwrap();
        let vars = BTreeMap::from([("resolution_width".to_string(), "854".to_string())]);
        let custom = env().with_features(FeatureSet::new().with(FEATURE_CUSTOM_RESOLUTION, true));
        assert_eq!(arg.expand(&custom, &vars), vec!["--width", "854"]);
    }

    #[test]
    fn test_substitute_leaves_unknown_keys() {
        let vars = BTreeMap::from([("version_name".to_string(), "1.20".to_string())]);
        assert_eq!(substitute("--version ${version_name}", &vars), "--version 1.20");
        assert_eq!(substitute("${missing}-x", &vars), "${missing}-x");
        assert_eq!(substitute("broken ${tail", &vars), "broken ${tail");
    }

    #[test]
    fn test_serialize_keeps_shape() {
        let plain = serde_json::to_string(&Argument::plain("--demo")).unwrap();
        assert_eq!(plain, "\"--demo\"");

        let gated = Argument::conditional(
            vec!["--a".to_string(), "--b".to_string()],
            vec![CompatibilityRule::allow()],
        );
        let json = serde_json::to_value(&gated).unwrap();
        assert_eq!(json["value"][1], "--b");
    }
}
