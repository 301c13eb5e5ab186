//! Artifact listing produced by the host build.
//!
//! The build resolves its runtime classpath and hands the result over as a
//! JSON document:
//!
//! ```json
//! {
//!   "classpath": ["libs/patch.jar", "/home/me/.m2/.../gson-2.10.jar"],
//!   "artifacts": [
//!     { "group": "com.google.code.gson", "name": "gson", "version": "2.10",
//!       "file": "/home/me/.m2/.../gson-2.10.jar" }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the project root when loading.

use crate::error::{PublisherError, Result};
use camino::Utf8Path;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One resolved dependency-graph entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDescriptor {
    /// Dependency group, e.g. `net.runelite`.
    pub group: String,
    /// Artifact name.
    pub name: String,
    /// Artifact version.
    pub version: String,
    /// Optional classifier such as `natives-linux`.
    #[serde(default)]
    pub classifier: Option<String>,
    /// Resolved file on disk.
    pub file: PathBuf,
    /// Whether the component is a standard module coordinate.
    #[serde(default = "default_module")]
    pub module: bool,
}

const fn default_module() -> bool {
    true
}

impl ArtifactDescriptor {
    /// The classifier, treating an empty string as absent.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref().filter(|c| !c.is_empty())
    }

    /// File name of the resolved file, used as the record name.
    #[must_use]
    pub fn file_name(&self) -> String {
        file_name_of(&self.file)
    }

    /// Repository-relative path derived from the coordinate:
    /// `group/as/dirs/name/version/name-version.jar`.
    ///
    /// # Examples
    ///
    /// ```
    /// use bootstrap_publisher::artifact::descriptor::ArtifactDescriptor;
    ///
    /// let descriptor = ArtifactDescriptor {
    ///     group: "net.runelite".into(),
    ///     name: "client".into(),
    ///     version: "1.10.0".into(),
    ///     classifier: None,
    ///     file: "client-1.10.0.jar".into(),
    ///     module: true,
    /// };
    /// assert_eq!(
    ///     descriptor.coordinate_path(),
    ///     "net/runelite/client/1.10.0/client-1.10.0.jar"
    /// );
    /// ```
    #[must_use]
    pub fn coordinate_path(&self) -> String {
        format!(
            "{group}/{name}/{version}/{name}-{version}.jar",
            group = self.group.replace('.', "/"),
            name = self.name,
            version = self.version,
        )
    }
}

/// File name component of `path`, lossily converted to UTF-8.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// The full listing handed over by the build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactListing {
    /// Every file on the runtime classpath.
    #[serde(default)]
    pub classpath: Vec<PathBuf>,
    /// Resolved dependency-graph entries.
    #[serde(default)]
    pub artifacts: Vec<ArtifactDescriptor>,
}

impl ArtifactListing {
    /// Read and parse a listing file, resolving relative paths against
    /// `project_root`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidListing`] if the file cannot be read
    /// or is not a valid listing.
    pub fn load(path: &Utf8Path, project_root: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| PublisherError::InvalidListing {
            reason: format!("cannot read {path}: {e}"),
        })?;
        Self::from_json(&json, project_root)
    }

    /// Parse a listing from JSON text, resolving relative paths against
    /// `project_root`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidListing`] if the text is not a valid
    /// listing.
    pub fn from_json(json: &str, project_root: &Path) -> Result<Self> {
        let listing: Self =
            serde_json::from_str(json).map_err(|e| PublisherError::InvalidListing {
                reason: e.to_string(),
            })?;
        Ok(listing.resolved_against(project_root))
    }

    fn resolved_against(self, root: &Path) -> Self {
        let resolve = |path: PathBuf| {
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        };
        Self {
            classpath: self.classpath.into_iter().map(resolve).collect(),
            artifacts: self
                .artifacts
                .into_iter()
                .map(|descriptor| ArtifactDescriptor {
                    file: resolve(descriptor.file),
                    ..descriptor
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn relative_paths_resolve_against_root() {
        let json = r#"{
            "classpath": ["libs/patch.jar", "/abs/dep.jar"],
            "artifacts": [
                { "group": "g", "name": "n", "version": "1", "file": "build/n-1.jar" }
            ]
        }"#;

        let listing = ArtifactListing::from_json(json, Path::new("/project")).expect("parse");

        assert_eq!(
            listing.classpath,
            vec![
                PathBuf::from("/project/libs/patch.jar"),
                PathBuf::from("/abs/dep.jar")
            ]
        );
        let descriptor = listing.artifacts.first().expect("one artifact");
        assert_eq!(descriptor.file, PathBuf::from("/project/build/n-1.jar"));
        assert!(descriptor.module);
    }

    #[rstest]
    fn empty_document_is_an_empty_listing() {
        let listing = ArtifactListing::from_json("{}", Path::new("/p")).expect("parse");
        assert_eq!(listing, ArtifactListing::default());
    }

    #[rstest]
    #[case::not_json("nope")]
    #[case::unknown_field(r#"{"extra": 1}"#)]
    #[case::missing_version(r#"{"artifacts":[{"group":"g","name":"n","file":"f"}]}"#)]
    fn malformed_listing_is_rejected(#[case] json: &str) {
        let err = ArtifactListing::from_json(json, Path::new("/p")).expect_err("must fail");
        assert!(matches!(err, PublisherError::InvalidListing { .. }));
    }

    #[rstest]
    fn missing_listing_file_is_invalid_listing() {
        let err = ArtifactListing::load(Utf8Path::new("/nonexistent/listing.json"), Path::new("/"))
            .expect_err("must fail");
        assert!(matches!(err, PublisherError::InvalidListing { .. }));
    }

    #[rstest]
    #[case::absent(None, None)]
    #[case::empty(Some(""), None)]
    #[case::present(Some("natives-linux"), Some("natives-linux"))]
    fn classifier_treats_empty_as_absent(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        let descriptor = ArtifactDescriptor {
            group: "g".to_owned(),
            name: "n".to_owned(),
            version: "1".to_owned(),
            classifier: raw.map(str::to_owned),
            file: PathBuf::from("/x/n-1.jar"),
            module: true,
        };
        assert_eq!(descriptor.classifier(), expected);
        assert_eq!(descriptor.file_name(), "n-1.jar");
    }
}
