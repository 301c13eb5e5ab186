//! Platform tagging for native artifacts.
//!
//! Classifiers such as `natives-windows-amd64` restrict which launcher
//! platforms download an artifact. Parsing is plain case-sensitive substring
//! matching; see [`classifier_to_platform_tags`].

use serde::{Deserialize, Serialize};

/// Dependency groups whose classified artifacts are always eligible for
/// platform tagging.
pub const DEFAULT_NATIVE_GROUPS: &[&str] = &["runelite"];

/// An (architecture, OS) pair attached to an artifact record.
///
/// Serialised in the launcher wire format: `{"arch": ..., "name": ...}` with
/// `name` carrying the OS and `arch` omitted when unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformTag {
    /// CPU architecture, or `None` when the classifier does not pin one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    /// Operating system family (`linux`, `windows`, `macos`).
    #[serde(rename = "name")]
    pub os: String,
}

impl PlatformTag {
    fn new(arch: Option<&str>, os: &str) -> Self {
        Self {
            arch: arch.map(str::to_owned),
            os: os.to_owned(),
        }
    }
}

/// Decide whether an artifact belongs to a native-artifact family.
///
/// A group listed in [`DEFAULT_NATIVE_GROUPS`] always matches; otherwise the
/// artifact name must contain one of the configured `native_artifacts`
/// substrings.
#[must_use]
pub fn family_matches(group: &str, name: &str, native_artifacts: &[String]) -> bool {
    DEFAULT_NATIVE_GROUPS.contains(&group)
        || native_artifacts
            .iter()
            .any(|marker| !marker.is_empty() && name.contains(marker.as_str()))
}

/// Translate a classifier into platform tags.
///
/// Returns `None` when the family does not match or the classifier is empty,
/// so the record keeps `platform` unset. Each OS substring found contributes
/// one tag; a matching family whose classifier names no OS yields an empty
/// list.
///
/// # Examples
///
/// ```
/// use bootstrap_publisher::artifact::platform::{classifier_to_platform_tags, PlatformTag};
///
/// let tags = classifier_to_platform_tags("natives-macos-arm64", true).unwrap_or_default();
/// assert_eq!(tags, vec![PlatformTag { arch: Some("aarch64".into()), os: "macos".into() }]);
/// assert!(classifier_to_platform_tags("natives-linux", false).is_none());
/// ```
#[must_use]
pub fn classifier_to_platform_tags(classifier: &str, family_matches: bool) -> Option<Vec<PlatformTag>> {
    if !family_matches || classifier.is_empty() {
        return None;
    }

    let mut tags = Vec::new();
    if classifier.contains("linux") {
        tags.push(PlatformTag::new(None, "linux"));
    }
    if classifier.contains("windows") {
        let arch = if classifier.contains("amd64") { "amd64" } else { "x86" };
        tags.push(PlatformTag::new(Some(arch), "windows"));
    }
    if classifier.contains("macos") {
        let arch = if classifier.contains("x64") {
            Some("x86_64")
        } else if classifier.contains("arm64") {
            Some("aarch64")
        } else {
            None
        };
        tags.push(PlatformTag::new(arch, "macos"));
    }
    Some(tags)
}
