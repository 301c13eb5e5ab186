//! Concurrent conversion of classified artifacts into manifest records.
//!
//! Every artifact becomes one task on its own scoped thread. Tasks share
//! nothing mutable apart from the progress counter; the run joins all of
//! them and gathers the records in bucket order (local, file, online) so
//! the manifest is identical across runs with identical inputs. The first
//! failed or panicked task aborts the run.

use crate::artifact::descriptor::file_name_of;
use crate::artifact::{
    ArtifactDescriptor, ArtifactRecord, ClassifiedArtifacts, HashedFile, PlatformTag,
    classifier_to_platform_tags, compute_sha256, copy_with_sha256, family_matches,
};
use crate::error::{PublisherError, Result};
use crate::progress::ProgressBar;
use crate::resolver::RepositoryResolver;
use log::{debug, error};
use std::collections::HashSet;
use std::path::Path;
use std::thread;

/// Classifier that never adds a filename suffix.
pub const NO_SUFFIX_CLASSIFIER: &str = "no_aop";

/// Shared, read-only inputs of one processing run.
pub struct ProcessingContext<'a> {
    /// Download URL prefix for copied artifacts, ending in `/`.
    pub base_url: &'a str,
    /// Directory receiving copies of local and file artifacts.
    pub repo_dir: &'a Path,
    /// Artifact-name substrings eligible for platform tagging.
    pub native_artifacts: &'a [String],
    /// Resolver for online artifacts.
    pub resolver: &'a RepositoryResolver<'a>,
    /// Counter advanced once per finished task.
    pub progress: &'a ProgressBar,
}

#[derive(Clone, Copy)]
enum Task<'a> {
    Local(&'a ArtifactDescriptor),
    File(&'a Path),
    Online(&'a ArtifactDescriptor),
}

impl Task<'_> {
    fn label(self) -> String {
        match self {
            Self::Local(descriptor) | Self::Online(descriptor) => descriptor.file_name(),
            Self::File(path) => file_name_of(path),
        }
    }
}

/// Process every classified artifact concurrently.
///
/// Local and file artifacts are copied into `context.repo_dir` and hashed
/// from the copied bytes; online artifacts are hashed in place and resolved
/// to a repository URL.
///
/// # Errors
///
/// Returns [`PublisherError::DuplicateArtifact`] before any task starts when
/// two artifacts share a file name, [`PublisherError::Processing`] when an
/// artifact cannot be read or copied, and [`PublisherError::TaskPanicked`]
/// when a task crashes.
pub fn process_all(
    classified: &ClassifiedArtifacts,
    context: &ProcessingContext<'_>,
) -> Result<Vec<ArtifactRecord>> {
    let tasks: Vec<Task<'_>> = classified
        .local
        .iter()
        .map(Task::Local)
        .chain(classified.files.iter().map(|path| Task::File(path.as_path())))
        .chain(classified.online.iter().map(Task::Online))
        .collect();
    reject_duplicate_names(&tasks)?;

    thread::scope(|scope| {
        let handles: Vec<_> = tasks
            .iter()
            .map(|&task| {
                let handle = scope.spawn(move || {
                    let record = process_one(task, context);
                    context.progress.update();
                    record
                });
                (task, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(task, handle)| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(PublisherError::TaskPanicked {
                        artifact: task.label(),
                    }))
            })
            .collect()
    })
}

fn process_one(task: Task<'_>, context: &ProcessingContext<'_>) -> Result<ArtifactRecord> {
    let record = match task {
        Task::Local(descriptor) => {
            let name = descriptor.file_name();
            let hashed = copy_into_repo(&descriptor.file, &name, context)?;
            ArtifactRecord {
                hash: hashed.digest,
                path: format!("{}{name}", context.base_url),
                name,
                size: hashed.size,
                platforms: platform_tags(descriptor, context.native_artifacts),
            }
        }
        Task::File(path) => {
            let name = file_name_of(path);
            let hashed = copy_into_repo(path, &name, context)?;
            ArtifactRecord {
                hash: hashed.digest,
                path: format!("{}{name}", context.base_url),
                name,
                size: hashed.size,
                platforms: None,
            }
        }
        Task::Online(descriptor) => process_online(descriptor, context)?,
    };
    debug!("processed {} ({} bytes)", record.name, record.size);
    Ok(record)
}

fn reject_duplicate_names(tasks: &[Task<'_>]) -> Result<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        let name = task.label();
        if !seen.insert(name.clone()) {
            error!("{name} appears more than once in the artifact listing");
            return Err(PublisherError::DuplicateArtifact { name });
        }
    }
    Ok(())
}

fn process_online(
    descriptor: &ArtifactDescriptor,
    context: &ProcessingContext<'_>,
) -> Result<ArtifactRecord> {
    let hashed = compute_sha256(&descriptor.file).map_err(|source| PublisherError::Processing {
        path: descriptor.file.clone(),
        source,
    })?;
    let platforms = platform_tags(descriptor, context.native_artifacts);
    let mut path = context
        .resolver
        .resolve(&descriptor.name, &descriptor.coordinate_path())
        .unwrap_or_default();
    if platforms.is_none() {
        if let Some(classifier) = descriptor.classifier() {
            path = apply_classifier_suffix(&path, classifier);
        }
    }
    Ok(ArtifactRecord {
        hash: hashed.digest,
        name: descriptor.file_name(),
        path,
        size: hashed.size,
        platforms,
    })
}

fn copy_into_repo(source: &Path, name: &str, context: &ProcessingContext<'_>) -> Result<HashedFile> {
    copy_with_sha256(source, &context.repo_dir.join(name)).map_err(|err| {
        PublisherError::Processing {
            path: source.to_path_buf(),
            source: err,
        }
    })
}

fn platform_tags(descriptor: &ArtifactDescriptor, native_artifacts: &[String]) -> Option<Vec<PlatformTag>> {
    let family = family_matches(&descriptor.group, &descriptor.name, native_artifacts);
    descriptor
        .classifier()
        .and_then(|classifier| classifier_to_platform_tags(classifier, family))
}

/// Insert `-<classifier>` before the trailing `.jar` of a resolved path.
///
/// Empty paths, paths without a `.jar` suffix, and the
/// [`NO_SUFFIX_CLASSIFIER`] sentinel are returned unchanged.
///
/// # Examples
///
/// ```
/// use bootstrap_publisher::processor::apply_classifier_suffix;
///
/// assert_eq!(
///     apply_classifier_suffix("https://repo/x/libfoo-1.0.jar", "windows-amd64"),
///     "https://repo/x/libfoo-1.0-windows-amd64.jar"
/// );
/// assert_eq!(apply_classifier_suffix("", "windows-amd64"), "");
/// ```
#[must_use]
pub fn apply_classifier_suffix(path: &str, classifier: &str) -> String {
    if classifier.is_empty() || classifier == NO_SUFFIX_CLASSIFIER {
        return path.to_owned();
    }
    match path.strip_suffix(".jar") {
        Some(stem) if !stem.is_empty() => format!("{stem}-{classifier}.jar"),
        _ => path.to_owned(),
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
