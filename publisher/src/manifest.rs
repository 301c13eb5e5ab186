//! Bootstrap manifest assembly, serialisation, and signing.
//!
//! A manifest starts from a template (a user override or the bundled
//! default), receives the freshly computed artifact records, and is written
//! as pretty-printed JSON next to a detached signature. The template's own
//! `artifacts` and `dependencyHashes` are ignored; both are rebuilt every
//! run.

use crate::artifact::{ArtifactRecord, Sha256Digest};
use crate::error::{PublisherError, Result};
use crate::signing;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

/// File name of the manifest inside the build-type output directory.
pub const MANIFEST_FILE: &str = "bootstrap.json";

/// File name of the manifest signature.
pub const SIGNATURE_FILE: &str = "bootstrap.json.sha256";

/// Template compiled into the binary, used when no override is configured.
pub const BUNDLED_TEMPLATE: &str = include_str!("../resources/bootstrap.template");

/// JVM argument lists copied through unchanged from the template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchArguments {
    /// Arguments for every launcher.
    pub launcher_arguments: Vec<String>,
    /// Launcher arguments on Java 11.
    pub launcher_jvm11_arguments: Vec<String>,
    /// Launcher arguments on Java 11 for Windows.
    pub launcher_jvm11_windows_arguments: Vec<String>,
    /// Launcher arguments on Java 17.
    pub launcher_jvm17_arguments: Vec<String>,
    /// Launcher arguments on Java 17 for macOS.
    pub launcher_jvm17_mac_arguments: Vec<String>,
    /// Launcher arguments on Java 17 for Windows.
    pub launcher_jvm17_windows_arguments: Vec<String>,
    /// Arguments for every client JVM.
    pub client_jvm_arguments: Vec<String>,
    /// Client arguments on Java 9 and later.
    pub client_jvm9_arguments: Vec<String>,
    /// Client arguments on Java 17 for macOS.
    pub client_jvm17_mac_arguments: Vec<String>,
    /// Client arguments on Java 17.
    pub client_jvm17_arguments: Vec<String>,
}

/// A launcher self-update entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Update {
    /// Target architecture.
    pub arch: String,
    /// SHA-256 of the update package.
    pub hash: String,
    /// Oldest launcher version that may apply the update.
    pub minimum_version: String,
    /// Package name.
    pub name: String,
    /// Target operating system.
    pub os: String,
    /// Rollout percentage, `-1` for everyone.
    pub rollout: i32,
    /// Package size in bytes, `-1` when unknown.
    pub size: i64,
    /// Download URL.
    pub url: String,
    /// Launcher version delivered by the update.
    pub version: String,
}

impl Default for Update {
    fn default() -> Self {
        Self {
            arch: String::new(),
            hash: String::new(),
            minimum_version: String::new(),
            name: String::new(),
            os: String::new(),
            rollout: -1,
            size: -1,
            url: String::new(),
            version: String::new(),
        }
    }
}

/// The bootstrap manifest consumed by the launcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// JVM arguments from the template.
    #[serde(flatten)]
    pub arguments: LaunchArguments,
    /// Every artifact of the bundle.
    #[serde(skip_deserializing)]
    pub artifacts: Vec<ArtifactRecord>,
    /// Launcher updates from the template.
    #[serde(default)]
    pub updates: Vec<Update>,
    /// Artifact name to hash, derived from `artifacts`.
    #[serde(skip_deserializing)]
    pub dependency_hashes: BTreeMap<String, Sha256Digest>,
}

impl Manifest {
    /// Parse a template document.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidTemplate`] if `json` does not match
    /// the manifest schema.
    pub fn from_template(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| PublisherError::InvalidTemplate {
            reason: e.to_string(),
        })
    }

    /// Replace the artifact list and rebuild `dependency_hashes` from it.
    #[must_use]
    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactRecord>) -> Self {
        self.dependency_hashes = artifacts
            .iter()
            .map(|record| (record.name.clone(), record.hash.clone()))
            .collect();
        self.artifacts = artifacts;
        self
    }

    /// Serialise as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Json`] if serialisation fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Load the manifest template.
///
/// Uses the file at `override_path` when given, otherwise
/// [`BUNDLED_TEMPLATE`].
///
/// # Errors
///
/// Returns [`PublisherError::TemplateNotFound`] when the override does not
/// exist and [`PublisherError::InvalidTemplate`] when it cannot be parsed.
pub fn load_template(override_path: Option<&Utf8Path>) -> Result<Manifest> {
    let Some(path) = override_path else {
        return Manifest::from_template(BUNDLED_TEMPLATE);
    };
    if !path.is_file() {
        return Err(PublisherError::TemplateNotFound {
            path: path.to_owned(),
        });
    }
    debug!("loading bootstrap template from {path}");
    Manifest::from_template(&fs::read_to_string(path)?)
}

/// Paths of a written manifest and its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFiles {
    /// The manifest JSON.
    pub manifest: Utf8PathBuf,
    /// The detached signature.
    pub signature: Utf8PathBuf,
}

/// Write `manifest` into `output_dir` and sign it with `private_key`.
///
/// # Errors
///
/// Returns an error if the directory or files cannot be written or signing
/// fails.
pub fn write_signed(
    manifest: &Manifest,
    output_dir: &Utf8Path,
    private_key: &Utf8Path,
) -> Result<ManifestFiles> {
    fs::create_dir_all(output_dir)?;
    let files = ManifestFiles {
        manifest: output_dir.join(MANIFEST_FILE),
        signature: output_dir.join(SIGNATURE_FILE),
    };
    fs::write(&files.manifest, manifest.to_pretty_json()?)?;
    signing::sign_file(private_key, &files.manifest, &files.signature)?;
    Ok(files)
}

/// Copy a written manifest and signature into `backup_dir` as
/// `bootstrap-backup-<version>.json[.sha256]`.
///
/// # Errors
///
/// Returns an error if the backup directory or copies cannot be written.
pub fn write_backup(
    files: &ManifestFiles,
    backup_dir: &Utf8Path,
    version: &str,
) -> Result<ManifestFiles> {
    fs::create_dir_all(backup_dir)?;
    let backup = ManifestFiles {
        manifest: backup_dir.join(format!("bootstrap-backup-{version}.json")),
        signature: backup_dir.join(format!("bootstrap-backup-{version}.json.sha256")),
    };
    fs::copy(&files.manifest, &backup.manifest)?;
    fs::copy(&files.signature, &backup.signature)?;
    Ok(backup)
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
