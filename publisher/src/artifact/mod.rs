//! Artifact model: listing input, classification, platform tags, digests,
//! and the normalised record written into the manifest.

pub mod classifier;
pub mod descriptor;
pub mod platform;
pub mod record;
pub mod sha256_digest;

pub use classifier::{ClassifiedArtifacts, classify};
pub use descriptor::{ArtifactDescriptor, ArtifactListing};
pub use platform::{PlatformTag, classifier_to_platform_tags, family_matches};
pub use record::ArtifactRecord;
pub use sha256_digest::{HashedFile, Sha256Digest, compute_sha256, copy_with_sha256};
