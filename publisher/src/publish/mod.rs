//! Upload backends for the generated output tree.
//!
//! Both backends consume an [`UploadJob`]: every regular file under the
//! build-type output directory paired with its remote path
//! `<remote_sub_path>/<build_type>/<relative path>`. The backend is chosen
//! from the configured [`PublishTarget`]; at most one can be active.

pub mod ftp;
pub mod git;

use crate::config::{PublishTarget, PublisherConfig};
use crate::error::{PublisherError, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    /// File on the local disk.
    pub local: PathBuf,
    /// Forward-slash path relative to the remote root.
    pub remote: String,
}

/// Every file of an output tree, ordered by remote path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadJob {
    /// Files to upload.
    pub entries: Vec<UploadEntry>,
}

impl UploadJob {
    /// Walk `root` and map each regular file to
    /// `<sub_path>/<build_type>/<relative path>`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Io`] if the directory cannot be walked.
    pub fn from_dir(root: &Path, sub_path: &str, build_type: &str) -> Result<Self> {
        let prefix = [sub_path, build_type]
            .iter()
            .map(|segment| segment.trim_matches('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| PublisherError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let remote = if prefix.is_empty() {
                relative
            } else {
                format!("{prefix}/{relative}")
            };
            entries.push(UploadEntry {
                local: entry.into_path(),
                remote,
            });
        }
        entries.sort_by(|a, b| a.remote.cmp(&b.remote));
        Ok(Self { entries })
    }

    /// Number of files in the job.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the job has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Files were transferred over FTP.
    Uploaded {
        /// Files stored successfully.
        stored: usize,
        /// Files that failed to transfer.
        failed: usize,
    },
    /// A commit was pushed.
    Committed {
        /// Names of the added or modified files.
        files: Vec<String>,
    },
    /// The hosting repository already matched the output tree.
    NoChanges,
    /// No upload method is configured.
    Skipped,
}

/// An upload channel.
pub trait Publisher {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Upload every file in `job`, writing status lines to `stderr`.
    ///
    /// # Errors
    ///
    /// Returns a configuration, connection, or protocol error when the
    /// upload cannot proceed.
    fn publish(&self, job: &UploadJob, stderr: &mut dyn Write) -> Result<PublishOutcome>;
}

/// Build the publisher for the configured upload method, if any.
#[must_use]
pub fn publisher_for(config: &PublisherConfig) -> Option<Box<dyn Publisher>> {
    let commit_version = config
        .is_versioned()
        .then(|| config.project.version.clone());
    match &config.publish {
        Some(PublishTarget::Ftp(settings)) => Some(Box::new(ftp::FtpPublisher::new(
            settings.clone(),
            Box::new(ftp::SuppaFtpConnector),
        ))),
        Some(PublishTarget::Git(settings)) => Some(Box::new(git::GitPublisher::new(
            settings.clone(),
            commit_version,
            Box::new(git::SystemGitExecutor::default()),
        ))),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_file;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn upload_job_maps_files_to_remote_paths() {
        let temp = TempDir::new().expect("temp dir");
        write_file(temp.path(), "bootstrap.json", b"{}");
        write_file(&temp.path().join("repo/1.0"), "client.jar", b"jar");
        std::fs::create_dir_all(temp.path().join("empty")).expect("dir");

        let job = UploadJob::from_dir(temp.path(), "client", "live").expect("walk");

        let remotes: Vec<&str> = job.entries.iter().map(|e| e.remote.as_str()).collect();
        assert_eq!(
            remotes,
            vec!["client/live/bootstrap.json", "client/live/repo/1.0/client.jar"]
        );
        assert!(job.entries.iter().all(|e| e.local.is_file()));
    }

    #[rstest]
    fn empty_sub_path_is_skipped() {
        let temp = TempDir::new().expect("temp dir");
        write_file(temp.path(), "bootstrap.json", b"{}");

        let job = UploadJob::from_dir(temp.path(), "", "beta").expect("walk");

        assert_eq!(
            job.entries.first().map(|e| e.remote.as_str()),
            Some("beta/bootstrap.json")
        );
    }

    #[rstest]
    fn missing_directory_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        assert!(UploadJob::from_dir(&temp.path().join("absent"), "client", "live").is_err());
    }
}
