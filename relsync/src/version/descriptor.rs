//! Release descriptors as listed by catalogs and stored on disk.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::argument::{substitute, Argument, ArgumentKind};
use super::error::{ResolveError, ResolveResult};
use super::library::LibraryRef;
use super::rule::{rules_allow, CompatibilityRule};
use crate::paths::is_safe_name;
use crate::platform::{LaunchEnvironment, FEATURE_CUSTOM_RESOLUTION, FEATURE_DEMO_USER};

/// Host serving asset indexes for releases that predate `assetIndex`.
pub const LEGACY_ASSET_INDEX_BASE: &str = "https://s3.amazonaws.com/Minecraft.Download/indexes/";

/// Asset index id used when a release names none.
pub const LEGACY_ASSET_INDEX_ID: &str = "legacy";

/// Release channel of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReleaseType {
    /// Stable releases.
    #[serde(rename = "release")]
    Stable,
    /// Development previews.
    #[serde(rename = "snapshot")]
    Preview,
    /// Old beta builds.
    #[serde(rename = "old_beta")]
    Experimental,
    /// Old alpha builds kept for internal use.
    #[serde(rename = "old_alpha")]
    DeprecatedInternal,
}

impl ReleaseType {
    pub const ALL: [ReleaseType; 4] = [
        Self::Stable,
        Self::Preview,
        Self::Experimental,
        Self::DeprecatedInternal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Stable => "release",
            Self::Preview => "snapshot",
            Self::Experimental => "old_beta",
            Self::DeprecatedInternal => "old_alpha",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ReleaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown release type '{s}'"))
    }
}

// Unknown type names become `None` so catalogs can skip the release
fn lenient_release_type<'de, D>(deserializer: D) -> Result<Option<ReleaseType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(ReleaseType::from_name))
}

/// Fields every catalog entry has, whether partial or complete.
pub trait ReleaseInfo {
    fn id(&self) -> &str;
    fn release_type(&self) -> Option<ReleaseType>;
    fn updated_time(&self) -> Option<DateTime<Utc>>;
    fn release_time(&self) -> Option<DateTime<Utc>>;
}

/// A remote catalog listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRelease {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_release_type")]
    pub release_type: Option<ReleaseType>,
    #[serde(rename = "time", default)]
    pub updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub release_time: Option<DateTime<Utc>>,
    /// Where the complete descriptor is published.
    pub url: String,
}

impl ReleaseInfo for PartialRelease {
    fn id(&self) -> &str {
        &self.id
    }
    fn release_type(&self) -> Option<ReleaseType> {
        self.release_type
    }
    fn updated_time(&self) -> Option<DateTime<Utc>> {
        self.updated_time
    }
    fn release_time(&self) -> Option<DateTime<Utc>> {
        self.release_time
    }
}

/// `{url, sha1, size}` of a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Reference to the asset manifest a release uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

impl AssetIndexInfo {
    /// Index on the legacy host, with unknown hash and size.
    pub fn legacy(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!("{LEGACY_ASSET_INDEX_BASE}{id}.json"),
            sha1: None,
            size: None,
            total_size: None,
        }
    }
}

/// A complete release descriptor.
///
/// After inheritance resolution the descriptor also carries its authored
/// form, which is what gets written back to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseDescriptor {
    pub id: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient_release_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub release_type: Option<ReleaseType>,
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
    /// Legacy single-string game arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<BTreeMap<ArgumentKind, Vec<Argument>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_launcher_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<LibraryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility_rules: Option<Vec<CompatibilityRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incompatibility_reason: Option<String>,
    /// Legacy asset index id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexInfo>,
    /// Release whose client jar this one runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<BTreeMap<String, DownloadInfo>>,

    #[serde(skip)]
    pub(crate) savable: Option<Box<ReleaseDescriptor>>,
    #[serde(skip)]
    synced: bool,
}

impl ReleaseInfo for ReleaseDescriptor {
    fn id(&self) -> &str {
        &self.id
    }
    fn release_type(&self) -> Option<ReleaseType> {
        self.release_type
    }
    fn updated_time(&self) -> Option<DateTime<Utc>> {
        self.updated_time
    }
    fn release_time(&self) -> Option<DateTime<Utc>> {
        self.release_time
    }
}

impl ReleaseDescriptor {
    /// A bare descriptor with only an id; mostly useful for tests.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            release_type: None,
            updated_time: None,
            release_time: None,
            inherits_from: None,
            minecraft_arguments: None,
            arguments: None,
            minimum_launcher_version: None,
            main_class: None,
            libraries: Vec::new(),
            compatibility_rules: None,
            incompatibility_reason: None,
            assets: None,
            asset_index: None,
            jar: None,
            downloads: None,
            savable: None,
            synced: false,
        }
    }

    /// Parse a descriptor, naming `id_hint` in errors.
    ///
    /// The id, parent id and jar name become directory names, so each must
    /// be a single safe path segment.
    pub fn from_json(json: &str, id_hint: &str) -> ResolveResult<Self> {
        let descriptor: Self = serde_json::from_str(json).map_err(|e| ResolveError::Malformed {
            id: id_hint.to_string(),
            reason: e.to_string(),
        })?;
        let names = [Some(&descriptor.id), descriptor.inherits_from.as_ref(), descriptor.jar.as_ref()];
        if let Some(name) = names.into_iter().flatten().find(|name| !is_safe_name(name)) {
            return Err(ResolveError::Malformed {
                id: id_hint.to_string(),
                reason: format!("'{name}' is not a usable directory name"),
            });
        }
        Ok(descriptor)
    }

    /// Pretty JSON of the authored form.
    pub fn to_savable_json(&self) -> ResolveResult<String> {
        serde_json::to_string_pretty(self.savable_form()).map_err(|e| ResolveError::Malformed {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }

    /// The descriptor as authored, without inherited fields.
    pub fn savable_form(&self) -> &ReleaseDescriptor {
        self.savable.as_deref().unwrap_or(self)
    }

    pub fn is_resolved(&self) -> bool {
        self.inherits_from.is_none()
    }

    /// Whether this descriptor has been persisted since it was pulled.
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
    }

    pub fn jar(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    /// `versions/<jar>/<jar>.jar`, relative to the game directory.
    pub fn jar_path(&self) -> PathBuf {
        let jar = self.jar();
        PathBuf::from("versions").join(jar).join(format!("{jar}.jar"))
    }

    pub fn download(&self, kind: &str) -> Option<&DownloadInfo> {
        self.downloads.as_ref()?.get(kind)
    }

    /// The declared asset index, or the legacy one named by `assets`.
    pub fn asset_index(&self) -> AssetIndexInfo {
        match &self.asset_index {
            Some(info) => info.clone(),
            None => AssetIndexInfo::legacy(self.assets.as_deref().unwrap_or(LEGACY_ASSET_INDEX_ID)),
        }
    }

    pub fn applies_to(&self, env: &LaunchEnvironment) -> bool {
        rules_allow(self.compatibility_rules.as_deref(), env)
    }

    /// Refuse releases that cannot run here or need a newer launcher.
    pub fn check_launchable(&self, env: &LaunchEnvironment, launcher_format_version: u32) -> ResolveResult<()> {
        if let Some(required) = self.minimum_launcher_version {
            if required > launcher_format_version {
                return Err(ResolveError::LauncherTooOld {
                    id: self.id.clone(),
                    required,
                    supported: launcher_format_version,
                });
            }
        }
        if !self.applies_to(env) {
            return Err(ResolveError::Incompatible {
                id: self.id.clone(),
                reason: self
                    .incompatibility_reason
                    .clone()
                    .unwrap_or_else(|| "not supported on this platform".to_string()),
            });
        }
        Ok(())
    }

    pub fn relevant_libraries<'a>(&'a self, env: &'a LaunchEnvironment) -> impl Iterator<Item = &'a LibraryRef> + 'a {
        self.libraries.iter().filter(move |lib| lib.applies_to(env))
    }

    /// Library files this release needs on `env`, relative to the game
    /// directory.
    pub fn required_library_files(&self, env: &LaunchEnvironment) -> ResolveResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for library in self.relevant_libraries(env) {
            if let Some(path) = library.required_artifact_path(env)? {
                files.push(PathBuf::from("libraries").join(path));
            }
        }
        Ok(files)
    }

    /// Every file that must exist before launch: libraries plus client jar.
    pub fn required_files(&self, env: &LaunchEnvironment) -> ResolveResult<Vec<PathBuf>> {
        let mut files = self.required_library_files(env)?;
        files.push(self.jar_path());
        Ok(files)
    }

    /// Class path entries under `game_dir`: non-native libraries, then the jar.
    pub fn classpath(&self, game_dir: &Path, env: &LaunchEnvironment) -> ResolveResult<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for library in self.relevant_libraries(env).filter(|lib| !lib.has_natives()) {
            entries.push(game_dir.join("libraries").join(library.artifact_path(None)?));
        }
        entries.push(game_dir.join(self.jar_path()));
        Ok(entries)
    }

    /// Expand the arguments for one launch phase.
    ///
    /// Rule-gated arguments that do not apply are dropped. Without an
    /// `arguments` block the legacy game argument string is used.
    pub fn launch_arguments(
        &self,
        kind: ArgumentKind,
        env: &LaunchEnvironment,
        vars: &BTreeMap<String, String>,
    ) -> Vec<String> {
        if let Some(arguments) = &self.arguments {
            return arguments
                .get(&kind)
                .map(|args| args.iter().flat_map(|arg| arg.expand(env, vars)).collect())
                .unwrap_or_default();
        }

        match (kind, &self.minecraft_arguments) {
            (ArgumentKind::Game, Some(legacy)) => {
                let mut args: Vec<String> = legacy
                    .split_whitespace()
                    .map(|arg| substitute(arg, vars))
                    .collect();
                if env.features.is_enabled(FEATURE_DEMO_USER) {
                    args.push("--demo".to_string());
                }
                if env.features.is_enabled(FEATURE_CUSTOM_RESOLUTION) {
                    for arg in ["--width", "${resolution_width}", "--height", "${resolution_height}"] {
                        args.push(substitute(arg, vars));
                    }
                }
                args
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{FeatureSet, OperatingSystem};

    const DESCRIPTOR: &str = r#"{
        "id": "1.20.1",
        "type": "release",
        "time": "2023-06-12T13:25:51+00:00",
        "releaseTime": "2023-06-12T13:25:51+00:00",
        "mainClass": "net.minecraft.client.main.Main",
        "minimumLauncherVersion": 21,
        "assetIndex": {"id": "5", "url": "https://h/5.json", "sha1": "aa", "size": 1, "totalSize": 2},
        "downloads": {"client": {"url": "https://h/client.jar", "sha1": "bb", "size": 3},
                      "client_mappings": {"url": "https://h/m.txt"}},
        "arguments": {"game": ["--version", "${version_name}"], "jvm": ["-cp", "${classpath}"]},
        "libraries": [
            {"name": "com.mojang:blocklist:1.0.10"},
            {"name": "org.lwjgl:lwjgl:3.3.1", "rules": [{"action": "allow", "os": {"name": "osx"}}]}
        ],
        "someFutureField": {"ignored": true}
    }"#;

    fn linux() -> LaunchEnvironment {
        LaunchEnvironment::new(OperatingSystem::Linux, "6.1", "x86_64")
    }

    #[test]
    fn test_parse_complete_descriptor() {
        let d = ReleaseDescriptor::from_json(DESCRIPTOR, "1.20.1").unwrap();
        assert_eq!(d.id, "1.20.1");
        assert_eq!(d.release_type, Some(ReleaseType::Stable));
        assert_eq!(d.minimum_launcher_version, Some(21));
        assert_eq!(d.asset_index().id, "5");
        assert_eq!(d.download("client").unwrap().sha1.as_deref(), Some("bb"));
        assert_eq!(d.libraries.len(), 2);
        assert!(d.is_resolved());
    }

    #[test]
    fn test_unknown_type_is_none() {
        let d = ReleaseDescriptor::from_json(r#"{"id": "x", "type": "nightly"}"#, "x").unwrap();
        assert_eq!(d.release_type, None);
    }

    #[test]
    fn test_malformed_descriptor() {
        let err = ReleaseDescriptor::from_json("{not json", "broken").unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn test_unsafe_names_are_malformed() {
        for json in [
            r#"{"id": "../../evil"}"#,
            r#"{"id": "ok", "inheritsFrom": "../base"}"#,
            r#"{"id": "ok", "jar": "/tmp/x"}"#,
        ] {
            assert!(matches!(
                ReleaseDescriptor::from_json(json, "ok"),
                Err(ResolveError::Malformed { .. })
            ));
        }
    }

    #[test]
    fn test_legacy_asset_index() {
        let mut d = ReleaseDescriptor::new("1.6.4");
        assert_eq!(d.asset_index().id, "legacy");
        d.assets = Some("pre-1.6".to_string());
        let index = d.asset_index();
        assert_eq!(index.id, "pre-1.6");
        assert!(index.url.ends_with("/indexes/pre-1.6.json"));
    }

    #[test]
    fn test_required_files_respect_rules() {
        let d = ReleaseDescriptor::from_json(DESCRIPTOR, "1.20.1").unwrap();
        let files = d.required_files(&linux()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("libraries/com/mojang/blocklist/1.0.10/blocklist-1.0.10.jar"),
                PathBuf::from("versions/1.20.1/1.20.1.jar"),
            ]
        );
    }

    #[test]
    fn test_launch_arguments_modern() {
        let d = ReleaseDescriptor::from_json(DESCRIPTOR, "1.20.1").unwrap();
        let vars = BTreeMap::from([("version_name".to_string(), "1.20.1".to_string())]);
        assert_eq!(
            d.launch_arguments(ArgumentKind::Game, &linux(), &vars),
            vec!["--version", "1.20.1"]
        );
    }

    #[test]
    fn test_launch_arguments_legacy() {
        let mut d = ReleaseDescriptor::new("1.7.10");
        d.minecraft_arguments = Some("--username ${auth_player_name} --version 1.7.10".to_string());
        let vars = BTreeMap::from([("auth_player_name".to_string(), "Steve".to_string())]);
        let env = linux().with_features(FeatureSet::new().with(FEATURE_DEMO_USER, true));

        assert_eq!(
            d.launch_arguments(ArgumentKind::Game, &env, &vars),
            vec!["--username", "Steve", "--version", "1.7.10", "--demo"]
        );
        assert!(d.launch_arguments(ArgumentKind::Jvm, &env, &vars).is_empty());
    }

    #[test]
    fn test_check_launchable() {
        let mut d = ReleaseDescriptor::new("future");
        d.minimum_launcher_version = Some(99);
        assert!(matches!(
            d.check_launchable(&linux(), 21),
            Err(ResolveError::LauncherTooOld { required: 99, .. })
        ));

        d.minimum_launcher_version = None;
        d.compatibility_rules = Some(vec![CompatibilityRule::allow().for_os(OperatingSystem::Windows)]);
        d.incompatibility_reason = Some("windows only".to_string());
        match d.check_launchable(&linux(), 21) {
            Err(ResolveError::Incompatible { reason, .. }) => assert_eq!(reason, "windows only"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classpath_skips_natives() {
        let mut d = ReleaseDescriptor::new("1.8");
        d.libraries.push(LibraryRef::new("a.b:c:1"));
        let mut native = LibraryRef::new("a.b:n:1");
        native.natives = Some(BTreeMap::from([(OperatingSystem::Linux, "natives-linux".to_string())]));
        d.libraries.push(native);

        let cp = d.classpath(Path::new("/g"), &linux()).unwrap();
        assert_eq!(
            cp,
            vec![
                PathBuf::from("/g/libraries/a/b/c/1/c-1.jar"),
                PathBuf::from("/g/versions/1.8/1.8.jar"),
            ]
        );
    }

    #[test]
    fn test_savable_json_omits_runtime_state() {
        let d = ReleaseDescriptor::from_json(DESCRIPTOR, "1.20.1").unwrap();
        let json = d.to_savable_json().unwrap();
        assert!(!json.contains("synced"));
        assert!(!json.contains("someFutureField"));
        let reparsed = ReleaseDescriptor::from_json(&json, "1.20.1").unwrap();
        assert_eq!(reparsed.libraries, d.libraries);
    }
}
