//! Library references inside a release descriptor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ResolveError, ResolveResult};
use super::rule::{rules_allow, CompatibilityRule};
use crate::paths::is_safe_relative_path;
use crate::platform::{LaunchEnvironment, OperatingSystem};

/// Placeholder in native classifiers replaced by `64` or `32`.
const ARCH_PLACEHOLDER: &str = "${arch}";

/// Structured download entry with a known hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDownload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Main artifact plus per-classifier artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactDownload>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub classifiers: BTreeMap<String, ArtifactDownload>,
}

impl LibraryDownloads {
    pub fn for_classifier(&self, classifier: Option<&str>) -> Option<&ArtifactDownload> {
        match classifier {
            Some(classifier) => self.classifiers.get(classifier),
            None => self.artifact.as_ref(),
        }
    }
}

/// Paths inside a native bundle that must not be extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ExtractRules {
    pub fn should_extract(&self, path: &str) -> bool {
        !self.exclude.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Where to fetch an artifact from and how it will be verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Catalog-supplied URL with an optional SHA-1 and size.
    Hashed {
        url: String,
        sha1: Option<String>,
        size: Option<u64>,
    },
    /// Conventional URL whose hash is published at `<url>.sha1`.
    Sidecar { url: String },
}

/// The three parts of a `group:artifact:version` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coordinate<'a> {
    pub group: &'a str,
    pub artifact: &'a str,
    pub version: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryRef {
    pub name: String,
    /// Explicit repository base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,
    /// Native classifier per OS, possibly containing `${arch}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natives: Option<BTreeMap<OperatingSystem, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<CompatibilityRule>>,
}

impl LibraryRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            downloads: None,
            natives: None,
            extract: None,
            rules: None,
        }
    }

    pub fn coordinate(&self) -> ResolveResult<Coordinate<'_>> {
        let mut parts = self.name.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(group), Some(artifact), Some(version))
                if !group.is_empty() && !artifact.is_empty() && !version.is_empty() =>
            {
                Ok(Coordinate {
                    group,
                    artifact,
                    version,
                })
            }
            _ => Err(ResolveError::InvalidLibraryName(self.name.clone())),
        }
    }

    pub fn applies_to(&self, env: &LaunchEnvironment) -> bool {
        rules_allow(self.rules.as_deref(), env)
    }

    pub fn has_natives(&self) -> bool {
        self.natives.is_some()
    }

    /// Native classifier for `env`, with `${arch}` substituted.
    pub fn native_classifier(&self, env: &LaunchEnvironment) -> Option<String> {
        self.natives
            .as_ref()?
            .get(&env.os)
            .map(|classifier| classifier.replace(ARCH_PLACEHOLDER, env.arch_bits()))
    }

    /// `group/with/slashes/artifact/version`
    pub fn base_dir(&self) -> ResolveResult<String> {
        let c = self.coordinate()?;
        Ok(format!(
            "{}/{}/{}",
            c.group.replace('.', "/"),
            c.artifact,
            c.version
        ))
    }

    /// `artifact-version[-classifier].jar`
    pub fn file_name(&self, classifier: Option<&str>) -> ResolveResult<String> {
        let c = self.coordinate()?;
        Ok(match classifier {
            Some(classifier) => format!("{}-{}-{}.jar", c.artifact, c.version, classifier),
            None => format!("{}-{}.jar", c.artifact, c.version),
        })
    }

    /// Path relative to the libraries directory.
    ///
    /// Names that would climb out of that directory are refused.
    pub fn artifact_path(&self, classifier: Option<&str>) -> ResolveResult<String> {
        let path = format!("{}/{}", self.base_dir()?, self.file_name(classifier)?);
        if !is_safe_relative_path(&path) {
            return Err(ResolveError::InvalidLibraryName(self.name.clone()));
        }
        Ok(path)
    }

    /// The file this library needs on `env`, if any.
    ///
    /// Native-only libraries with no classifier for the OS need nothing.
    pub fn required_artifact_path(&self, env: &LaunchEnvironment) -> ResolveResult<Option<String>> {
        if self.has_natives() {
            match self.native_classifier(env) {
                Some(classifier) => self.artifact_path(Some(&classifier)).map(Some),
                None => Ok(None),
            }
        } else {
            self.artifact_path(None).map(Some)
        }
    }

    /// Where to download the artifact for `classifier`.
    ///
    /// An explicit base URL or the absence of structured downloads falls back
    /// to a sidecar-verified conventional URL. Structured downloads without
    /// an entry for the classifier yield `None`.
    pub fn artifact_source(
        &self,
        classifier: Option<&str>,
        default_base_url: &str,
    ) -> ResolveResult<Option<ArtifactSource>> {
        if let Some(base) = &self.url {
            return Ok(Some(ArtifactSource::Sidecar {
                url: join_url(base, &self.artifact_path(classifier)?),
            }));
        }

        match &self.downloads {
            None => Ok(Some(ArtifactSource::Sidecar {
                url: join_url(default_base_url, &self.artifact_path(classifier)?),
            })),
            Some(downloads) => Ok(downloads
                .for_classifier(classifier)
                .map(|info| ArtifactSource::Hashed {
                    url: info.url.clone(),
                    sha1: info.sha1.clone(),
                    size: info.size,
                })),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://libraries.example.net/";

    fn linux64() -> LaunchEnvironment {
        LaunchEnvironment::new(OperatingSystem::Linux, "", "x86_64")
    }

    #[test]
    fn test_artifact_path() {
        let lib = LibraryRef::new("org.lwjgl.lwjgl:lwjgl:2.9.0");
        assert_eq!(
            lib.artifact_path(None).unwrap(),
            "org/lwjgl/lwjgl/lwjgl/2.9.0/lwjgl-2.9.0.jar"
        );
        assert_eq!(
            lib.artifact_path(Some("natives-linux")).unwrap(),
            "org/lwjgl/lwjgl/lwjgl/2.9.0/lwjgl-2.9.0-natives-linux.jar"
        );
    }

    #[test]
    fn test_invalid_name() {
        let lib = LibraryRef::new("just-a-name");
        assert!(matches!(
            lib.artifact_path(None),
            Err(ResolveError::InvalidLibraryName(_))
        ));
    }

    #[test]
    fn test_names_that_climb_out_are_invalid() {
        for name in ["..:x:1", "a:..:1", "a:b:..", "a:b:1/../../../../x"] {
            assert!(
                matches!(LibraryRef::new(name).artifact_path(None), Err(ResolveError::InvalidLibraryName(_))),
                "{name}"
            );
        }
        let lib = LibraryRef::new("a:b:1");
        assert!(lib.artifact_path(Some("../../../evil")).is_err());
    }

    #[test]
    fn test_native_classifier_arch_substitution() {
        let mut lib = LibraryRef::new("tv.twitch:twitch-platform:5.16");
        lib.natives = Some(BTreeMap::from([
            (OperatingSystem::Linux, "natives-linux-${arch}".to_string()),
            (OperatingSystem::Windows, "natives-windows-${arch}".to_string()),
        ]));

        assert_eq!(
            lib.native_classifier(&linux64()).as_deref(),
            Some("natives-linux-64")
        );
        assert_eq!(
            lib.required_artifact_path(&linux64()).unwrap().as_deref(),
            Some("tv/twitch/twitch-platform/5.16/twitch-platform-5.16-natives-linux-64.jar")
        );

        let mac = LaunchEnvironment::new(OperatingSystem::Osx, "", "aarch64");
        assert_eq!(lib.required_artifact_path(&mac).unwrap(), None);
    }

    #[test]
    fn test_source_without_downloads_uses_default_host() {
        let lib = LibraryRef::new("com.google.guava:guava:15.0");
        assert_eq!(
            lib.artifact_source(None, BASE).unwrap(),
            Some(ArtifactSource::Sidecar {
                url: "https://libraries.example.net/com/google/guava/guava/15.0/guava-15.0.jar"
                    .to_string()
            })
        );
    }

    #[test]
    fn test_source_explicit_base_url() {
        let mut lib = LibraryRef::new("net.minecraftforge:forge:1.0");
        lib.url = Some("https://maven.example.org".to_string());
        assert_eq!(
            lib.artifact_source(None, BASE).unwrap(),
            Some(ArtifactSource::Sidecar {
                url: "https://maven.example.org/net/minecraftforge/forge/1.0/forge-1.0.jar"
                    .to_string()
            })
        );
    }

    #[test]
    fn test_source_structured_downloads() {
        let json = r#"{
            "name": "org.lwjgl:lwjgl:3.3.1",
            "downloads": {
                "artifact": {"path": "p.jar", "url": "https://h/p.jar", "sha1": "abc", "size": 10},
                "classifiers": {"natives-linux": {"url": "https://h/n.jar", "sha1": "def"}}
            }
        }"#;
        let lib: LibraryRef = serde_json::from_str(json).unwrap();

        assert_eq!(
            lib.artifact_source(None, BASE).unwrap(),
            Some(ArtifactSource::Hashed {
                url: "https://h/p.jar".to_string(),
                sha1: Some("abc".to_string()),
                size: Some(10),
            })
        );
        assert!(matches!(
            lib.artifact_source(Some("natives-linux"), BASE).unwrap(),
            Some(ArtifactSource::Hashed { .. })
        ));
        assert_eq!(lib.artifact_source(Some("natives-osx"), BASE).unwrap(), None);
    }

    #[test]
    fn test_extract_rules() {
        let rules = ExtractRules {
            exclude: vec!["META-INF/".to_string()],
        };
        assert!(!rules.should_extract("META-INF/MANIFEST.MF"));
        assert!(rules.should_extract("liblwjgl.so"));
    }
}
