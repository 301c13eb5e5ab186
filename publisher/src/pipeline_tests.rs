//! Unit tests for generate and publish orchestration.

use super::*;
use crate::config::{FtpSettings, GitSettings, PLACEHOLDER_DOWNLOAD_ROOT, PublishTarget};
use crate::dirs::MockBaseDirs;
use crate::publish::git::GitPublisher;
use crate::signing::verify_file;
use crate::test_utils::{
    ExpectedGitCall, ListingBuilder, StaticProbe, StubGitExecutor, sample_config, sha256_hex,
    stdout_output, success_output, utf8_temp_dir, write_file,
};
use rstest::{fixture, rstest};
use serde_json::Value;
use tempfile::TempDir;

const LIBFOO_URL: &str = "https://repo.runelite.net/net/example/libfoo/1.0/libfoo-1.0.jar";

struct Project {
    _temp: TempDir,
    base: Utf8PathBuf,
    listing: Utf8PathBuf,
    config: PublisherConfig,
}

impl Project {
    fn store(&self) -> Utf8PathBuf {
        self.base.join("store")
    }

    fn generate(&self, probe: &StaticProbe) -> Result<GenerateReport> {
        let dirs = MockBaseDirs::new();
        let context = PipelineContext {
            dirs: &dirs,
            probe,
            show_progress: false,
        };
        generate(&self.config, &self.listing, &context, &mut Vec::new())
    }
}

#[fixture]
fn project() -> Project {
    let (temp, base) = utf8_temp_dir();
    let root = base.join("project");
    let cache = base.join("cache");
    write_file(
        root.join("build/libs").as_std_path(),
        "client-1.2.0.jar",
        b"client bytes",
    );
    write_file(root.join("libs").as_std_path(), "extra.jar", b"extra bytes");
    write_file(cache.as_std_path(), "libfoo-1.0.jar", b"libfoo bytes");

    let listing = base.join("listing.json");
    ListingBuilder::new()
        .artifact(
            "net.example:client:1.2.0",
            None,
            "build/libs/client-1.2.0.jar",
        )
        .classpath("libs/extra.jar")
        .artifact(
            "net.example:libfoo:1.0",
            None,
            cache.join("libfoo-1.0.jar").as_str(),
        )
        .write(&listing);

    let config = sample_config(&root, &base.join("store"));
    Project {
        _temp: temp,
        base,
        listing,
        config,
    }
}

fn read_manifest(path: &Utf8Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read manifest")).expect("parse manifest")
}

#[rstest]
fn manifest_hashes_match_copied_bytes(project: Project) {
    let report = project
        .generate(&StaticProbe::serving(&[LIBFOO_URL]))
        .expect("generate");

    let manifest = read_manifest(&report.manifest.manifest);
    let names: Vec<&str> = report.artifacts.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["client-1.2.0.jar", "extra.jar", "libfoo-1.0.jar"]);
    for name in ["client-1.2.0.jar", "extra.jar"] {
        let copied = fs::read(report.repo_dir.join(name)).expect("copied artifact");
        assert_eq!(
            manifest["dependencyHashes"][name].as_str(),
            Some(sha256_hex(&copied).as_str())
        );
    }
    assert_eq!(
        manifest["dependencyHashes"]["libfoo-1.0.jar"].as_str(),
        Some(sha256_hex(b"libfoo bytes").as_str())
    );
}

#[rstest]
fn record_paths_follow_their_bucket(project: Project) {
    let report = project
        .generate(&StaticProbe::serving(&[LIBFOO_URL]))
        .expect("generate");

    let paths: Vec<&str> = report.artifacts.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "https://cdn.example.net/client/live/repo/client-1.2.0.jar",
            "https://cdn.example.net/client/live/repo/extra.jar",
            LIBFOO_URL,
        ]
    );
    assert_eq!(report.output_dir, project.store().join("live"));
    assert!(report.backup.is_none());
}

#[rstest]
fn manifest_signature_verifies(project: Project) {
    let report = project.generate(&StaticProbe::default()).expect("generate");

    verify_file(
        &report.keys.public_key,
        &report.manifest.manifest,
        &report.manifest.signature,
    )
    .expect("signature verifies");
}

#[rstest]
fn unreachable_repositories_leave_an_empty_path(project: Project) {
    let probe = StaticProbe::default();
    let report = project.generate(&probe).expect("generate");

    let libfoo = report.artifacts.last().expect("online record");
    assert_eq!(libfoo.path, "");
    assert!(report.manifest.manifest.is_file());
    assert_eq!(probe.requests().len(), 2);
}

#[rstest]
fn versioned_runs_write_backups(mut project: Project) {
    project.config.store_old_versions = true;

    let report = project.generate(&StaticProbe::default()).expect("generate");

    assert_eq!(report.repo_dir, project.store().join("live/repo/1.2.0"));
    let backup = report.backup.expect("backup written");
    assert_eq!(
        backup.manifest,
        report.repo_dir.join("bootstrap-backup-1.2.0.json")
    );
    assert_eq!(
        fs::read(&backup.manifest).expect("backup"),
        fs::read(&report.manifest.manifest).expect("manifest")
    );
    assert!(backup.signature.is_file());
    assert_eq!(
        report.artifacts.first().map(|r| r.path.as_str()),
        Some("https://cdn.example.net/client/live/repo/1.2.0/client-1.2.0.jar")
    );
}

#[rstest]
fn unspecified_version_disables_backups(mut project: Project) {
    project.config.store_old_versions = true;
    project.config.project.version = crate::config::UNSPECIFIED_VERSION.to_owned();

    let report = project.generate(&StaticProbe::default()).expect("generate");

    assert!(report.backup.is_none());
    assert_eq!(report.repo_dir, project.store().join("live/repo"));
}

#[rstest]
fn repeated_runs_are_byte_identical(project: Project) {
    let probe = StaticProbe::serving(&[LIBFOO_URL]);
    let first = project.generate(&probe).expect("first run");
    let first_bytes = fs::read(&first.manifest.manifest).expect("first manifest");

    let second = project.generate(&probe).expect("second run");

    assert_eq!(
        fs::read(&second.manifest.manifest).expect("second manifest"),
        first_bytes
    );
    assert!(!second.keys.created);
}

#[rstest]
#[case::placeholder(PLACEHOLDER_DOWNLOAD_ROOT)]
#[case::empty("")]
fn missing_download_root_aborts_before_any_output(mut project: Project, #[case] root: &str) {
    project.config.download_root = root.to_owned();

    let err = project
        .generate(&StaticProbe::default())
        .expect_err("must fail");

    assert!(matches!(err, PublisherError::Configuration { ref reason } if reason.contains("download root")));
    assert!(!project.store().exists());
}

#[rstest]
fn missing_project_root_is_a_configuration_error(mut project: Project) {
    project.config.project.root = project.base.join("absent");

    let err = project
        .generate(&StaticProbe::default())
        .expect_err("must fail");

    assert!(matches!(err, PublisherError::Configuration { .. }));
}

#[rstest]
fn unreadable_artifact_aborts_without_a_manifest(project: Project) {
    fs::remove_file(project.base.join("cache/libfoo-1.0.jar")).expect("remove jar");

    let err = project
        .generate(&StaticProbe::default())
        .expect_err("must fail");

    assert!(matches!(err, PublisherError::Processing { .. }));
    assert!(!project.store().join("live/bootstrap.json").exists());
}

#[rstest]
fn upload_without_publisher_is_skipped(project: Project) {
    let mut stderr = Vec::new();

    let outcome = upload(&project.config, &project.base, None, &mut stderr).expect("upload");

    assert_eq!(outcome, PublishOutcome::Skipped);
    assert!(String::from_utf8_lossy(&stderr).contains("No upload method configured"));
}

#[rstest]
fn upload_hands_the_output_tree_to_the_publisher(project: Project) {
    let report = project.generate(&StaticProbe::default()).expect("generate");
    let executor = StubGitExecutor::new(vec![
        ExpectedGitCall {
            operation: "clone",
            result: Ok(success_output()),
        },
        ExpectedGitCall {
            operation: "add",
            result: Ok(success_output()),
        },
        ExpectedGitCall {
            operation: "status",
            result: Ok(stdout_output("")),
        },
    ]);
    let publisher = GitPublisher::new(
        GitSettings {
            token: "token".to_owned(),
            repository_url: "https://git.example.net/hosting.git".to_owned(),
            author_name: "bot".to_owned(),
            author_email: "bot@example.net".to_owned(),
        },
        None,
        Box::new(executor.clone()),
    );
    let mut stderr = Vec::new();

    let outcome = upload(&project.config, &report.output_dir, Some(&publisher), &mut stderr)
        .expect("upload");

    assert_eq!(outcome, PublishOutcome::NoChanges);
    executor.assert_finished();
    assert!(String::from_utf8_lossy(&stderr).contains("via git"));
}

#[rstest]
#[case::ftp_without_password(PublishTarget::Ftp(FtpSettings {
    server: "ftp.example.net".to_owned(),
    port: 21,
    user: "deploy".to_owned(),
    password: String::new(),
}), "password")]
#[case::git_without_token(PublishTarget::Git(GitSettings {
    token: " ".to_owned(),
    repository_url: "https://git.example.net/hosting.git".to_owned(),
    author_name: "bot".to_owned(),
    author_email: "bot@example.net".to_owned(),
}), "token")]
fn publish_with_empty_credentials_stops_before_generating(
    mut project: Project,
    #[case] target: PublishTarget,
    #[case] field: &str,
) {
    project.config.publish = Some(target);
    let probe = StaticProbe::serving(&[LIBFOO_URL]);
    let dirs = MockBaseDirs::new();
    let context = PipelineContext {
        dirs: &dirs,
        probe: &probe,
        show_progress: false,
    };

    let err = publish(&project.config, &project.listing, &context, &mut Vec::new())
        .expect_err("must fail");

    assert!(
        matches!(err, PublisherError::Configuration { ref reason } if reason.contains(field)),
        "unexpected error: {err}"
    );
    assert!(probe.requests().is_empty());
    assert!(!project.store().exists());
}
