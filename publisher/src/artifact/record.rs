//! The normalised per-artifact output unit.

use super::platform::PlatformTag;
use super::sha256_digest::Sha256Digest;
use serde::{Deserialize, Serialize};

/// One entry of the manifest `artifacts` array.
///
/// `path` is either a full download URL or empty when no repository could
/// serve the artifact. `hash` is the SHA-256 of the exact bytes shipped for
/// `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// SHA-256 of the artifact bytes.
    pub hash: Sha256Digest,
    /// File name of the artifact.
    pub name: String,
    /// Download URL, or empty when unresolved.
    pub path: String,
    /// Size of the artifact in bytes.
    pub size: u64,
    /// Platforms allowed to download this artifact, or `None` for all.
    #[serde(
        rename = "platform",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub platforms: Option<Vec<PlatformTag>>,
}

impl ArtifactRecord {
    /// Whether a repository was found for this artifact.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.path.is_empty()
    }
}
