//! Generate and publish orchestration.
//!
//! `generate` runs every stage up to a signed manifest on disk: validate the
//! configuration, ensure signing keys, load the template, classify the
//! artifact listing, process every artifact concurrently, then write and
//! sign the manifest (plus a versioned backup when enabled). `publish`
//! follows a successful generate with an upload through the configured
//! [`Publisher`].

use crate::artifact::{ArtifactListing, ArtifactRecord, classify};
use crate::config::PublisherConfig;
use crate::dirs::BaseDirs;
use crate::error::{PublisherError, Result};
use crate::manifest::{ManifestFiles, load_template, write_backup, write_signed};
use crate::output::{write_stderr_line, write_step};
use crate::processor::{ProcessingContext, process_all};
use crate::progress::ProgressBar;
use crate::publish::{PublishOutcome, Publisher, UploadJob, publisher_for};
use crate::resolver::{RepositoryProbe, RepositoryResolver};
use crate::signing::{KeyPair, generate_keys};
use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use std::fs;
use std::io::Write;
use std::time::Instant;

/// Collaborators of a pipeline run.
pub struct PipelineContext<'a> {
    /// Platform directory lookup for the default store location.
    pub dirs: &'a dyn BaseDirs,
    /// Existence checks for online artifact resolution.
    pub probe: &'a dyn RepositoryProbe,
    /// Draw the processing progress bar on the process stderr.
    pub show_progress: bool,
}

/// What a generate run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    /// `<store_location>/<build_type>`, the tree that gets uploaded.
    pub output_dir: Utf8PathBuf,
    /// Directory holding the copied artifacts.
    pub repo_dir: Utf8PathBuf,
    /// The signing key pair used.
    pub keys: KeyPair,
    /// The written manifest and signature.
    pub manifest: ManifestFiles,
    /// Versioned backup copies, when enabled.
    pub backup: Option<ManifestFiles>,
    /// Records in manifest order.
    pub artifacts: Vec<ArtifactRecord>,
}

/// Build, sign, and store the manifest for the artifacts in `listing_path`.
///
/// # Errors
///
/// Returns [`PublisherError::Configuration`] before any work when the
/// configuration is incomplete or the project root does not exist, and
/// propagates listing, processing, template, and signing failures. No
/// manifest is written when any artifact fails to process.
pub fn generate(
    config: &PublisherConfig,
    listing_path: &Utf8Path,
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<GenerateReport> {
    let started = Instant::now();
    config.validate()?;
    let store = config.store_location(context.dirs)?;

    write_step(stderr, 1, "Preparing signing keys.");
    let keys = generate_keys(&store)?;
    if keys.created {
        write_stderr_line(stderr, format!("Generated a new key pair in {store}"));
    }
    let template = load_template(config.template.as_deref())?;

    write_step(stderr, 2, "Classifying artifacts.");
    let project_root = config.project.root.as_std_path().canonicalize().map_err(|e| {
        PublisherError::configuration(format!(
            "project root {} is not accessible: {e}",
            config.project.root
        ))
    })?;
    let listing = ArtifactListing::load(listing_path, &project_root)?;
    let classified = classify(listing, &project_root, &config.local_lib_dirs);
    info!(
        "classified {} local, {} file, {} online artifacts",
        classified.local.len(),
        classified.files.len(),
        classified.online.len()
    );

    let output_dir = store.join(&config.build_type);
    let mut repo_dir = output_dir.join("repo");
    if config.is_versioned() {
        repo_dir.push(&config.project.version);
    }
    fs::create_dir_all(&repo_dir)?;

    write_step(
        stderr,
        3,
        format!("Processing {} artifacts.", classified.len()),
    );
    let base_url = config.artifact_base_url();
    let resolver = RepositoryResolver::new(&config.resolution, context.probe);
    let progress = if context.show_progress {
        ProgressBar::new(classified.len(), Box::new(std::io::stderr()))
    } else {
        ProgressBar::hidden(classified.len())
    };
    let artifacts = process_all(
        &classified,
        &ProcessingContext {
            base_url: &base_url,
            repo_dir: repo_dir.as_std_path(),
            native_artifacts: &config.native_artifacts,
            resolver: &resolver,
            progress: &progress,
        },
    )?;
    progress.finish();

    write_step(stderr, 4, "Writing the signed manifest.");
    let manifest = template.with_artifacts(artifacts.clone());
    let files = write_signed(&manifest, &output_dir, &keys.private_key)?;
    let backup = if config.is_versioned() {
        Some(write_backup(&files, &repo_dir, &config.project.version)?)
    } else {
        None
    };
    write_stderr_line(stderr, format!("Manifest written to {}", files.manifest));
    info!(
        "generated manifest with {} artifacts in {:.2?}",
        artifacts.len(),
        started.elapsed()
    );

    Ok(GenerateReport {
        output_dir,
        repo_dir,
        keys,
        manifest: files,
        backup,
        artifacts,
    })
}

/// Generate the manifest, then upload the output tree with the configured
/// backend.
///
/// # Errors
///
/// Returns [`PublisherError::Configuration`] for empty upload credentials
/// before any generation work, and propagates every [`generate`] failure and
/// fatal upload failures.
pub fn publish(
    config: &PublisherConfig,
    listing_path: &Utf8Path,
    context: &PipelineContext<'_>,
    stderr: &mut dyn Write,
) -> Result<PublishOutcome> {
    config.validate_publish()?;
    let report = generate(config, listing_path, context, stderr)?;
    let publisher = publisher_for(config);
    upload(config, &report.output_dir, publisher.as_deref(), stderr)
}

/// Upload `output_dir` through `publisher`, or skip with a notice when no
/// upload method is configured.
///
/// # Errors
///
/// Returns [`PublisherError::Io`] if the tree cannot be walked and
/// propagates fatal publisher failures.
pub fn upload(
    config: &PublisherConfig,
    output_dir: &Utf8Path,
    publisher: Option<&dyn Publisher>,
    stderr: &mut dyn Write,
) -> Result<PublishOutcome> {
    let Some(publisher) = publisher else {
        write_stderr_line(stderr, "No upload method configured; skipping upload.");
        info!("no upload method configured");
        return Ok(PublishOutcome::Skipped);
    };
    let job = UploadJob::from_dir(
        output_dir.as_std_path(),
        &config.remote_sub_path,
        &config.build_type,
    )?;
    write_stderr_line(
        stderr,
        format!("Uploading {} files via {}.", job.len(), publisher.name()),
    );
    publisher.publish(&job, stderr)
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
