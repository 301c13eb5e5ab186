//! Error types for the bootstrap publisher.
//!
//! Every fatal condition in the pipeline maps onto one variant here. Two
//! failure classes are deliberately absent: an artifact that no repository
//! serves is recorded with an empty path, and a single FTP file transfer
//! failure is logged and counted by the uploader.

use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a generate or publish run.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// Required settings are missing, placeholders, or empty.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of the offending setting.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration file {path}: {reason}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The artifact listing supplied by the build could not be used.
    #[error("invalid artifact listing: {reason}")]
    InvalidListing {
        /// Description of the problem.
        reason: String,
    },

    /// Hashing or copying an artifact failed.
    #[error("failed to process artifact {}: {source}", path.display())]
    Processing {
        /// The artifact file being processed.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Two artifacts would be published under the same file name.
    #[error("duplicate artifact name {name}")]
    DuplicateArtifact {
        /// The shared file name.
        name: String,
    },

    /// A processing task panicked before producing a record.
    #[error("processing task for {artifact} panicked")]
    TaskPanicked {
        /// Name of the artifact whose task crashed.
        artifact: String,
    },

    /// No manifest template exists at the configured location.
    #[error("bootstrap template not found at {path}")]
    TemplateNotFound {
        /// Where the template was expected.
        path: Utf8PathBuf,
    },

    /// The manifest template is not valid JSON for the manifest schema.
    #[error("invalid bootstrap template: {reason}")]
    InvalidTemplate {
        /// Description of the parse failure.
        reason: String,
    },

    /// Key generation, signing, or verification failed.
    #[error("signing failed: {reason}")]
    Signing {
        /// Description of the failure.
        reason: String,
    },

    /// The upload channel could not be reached or refused the session.
    #[error("upload connection failed: {reason}")]
    UploadConnection {
        /// Description of the failure.
        reason: String,
    },

    /// A git operation failed.
    #[error("git {operation} failed: {message}")]
    Git {
        /// The git operation that failed (clone, commit, push, ...).
        operation: &'static str,
        /// Description of the failure, with credentials redacted.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialisation or deserialisation failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Test stub received an unexpected or mismatched invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl PublisherError {
    /// Shorthand for a [`PublisherError::Configuration`] error.
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result type alias using [`PublisherError`].
pub type Result<T> = std::result::Result<T, PublisherError>;
