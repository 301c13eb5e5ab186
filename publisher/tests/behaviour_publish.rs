//! BDD tests for uploading the output tree.

use bootstrap_publisher::config::{FtpSettings, GitSettings, PublisherConfig};
use bootstrap_publisher::error::PublisherError;
use bootstrap_publisher::pipeline::upload;
use bootstrap_publisher::publish::ftp::{FtpCommandError, FtpConnector, FtpPublisher, FtpSession};
use bootstrap_publisher::publish::git::GitPublisher;
use bootstrap_publisher::publish::{PublishOutcome, Publisher};
use bootstrap_publisher::test_utils::{
    ExpectedGitCall, StubGitExecutor, sample_config, stdout_output, success_output,
    utf8_temp_dir, write_file,
};
use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::Cell;
use std::rc::Rc;

/// Connector counting connection attempts and refusing every one.
struct CountingConnector {
    attempts: Rc<Cell<usize>>,
}

impl FtpConnector for CountingConnector {
    fn connect(
        &self,
        _settings: &FtpSettings,
    ) -> std::result::Result<Box<dyn FtpSession>, FtpCommandError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(FtpCommandError {
            operation: "connect",
            message: "connection refused".to_owned(),
        })
    }
}

fn git_settings() -> GitSettings {
    GitSettings {
        token: "ghp_token".to_owned(),
        repository_url: "https://git.example.net/hosting.git".to_owned(),
        author_name: "bot".to_owned(),
        author_email: "bot@example.net".to_owned(),
    }
}

struct PublishWorld {
    _temp_dir: tempfile::TempDir,
    output_dir: Utf8PathBuf,
    config: PublisherConfig,
    publisher: Option<Box<dyn Publisher>>,
    ftp_attempts: Rc<Cell<usize>>,
    git: StubGitExecutor,
    result: Option<bootstrap_publisher::error::Result<PublishOutcome>>,
}

impl PublishWorld {
    fn outcome(&self) -> &PublishOutcome {
        match &self.result {
            Some(Ok(outcome)) => outcome,
            Some(Err(err)) => panic!("publishing failed: {err}"),
            None => panic!("publishing was not run"),
        }
    }

    fn use_git(&mut self, status: &str, with_commit: bool) {
        let mut calls = vec![
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
                result: Ok(stdout_output(status)),
            },
        ];
        if with_commit {
            for operation in ["commit", "push"] {
                calls.push(ExpectedGitCall {
                    operation,
                    result: Ok(success_output()),
                });
            }
        }
        self.git = StubGitExecutor::new(calls);
        self.publisher = Some(Box::new(GitPublisher::new(
            git_settings(),
            None,
            Box::new(self.git.clone()),
        )));
    }
}

#[fixture]
fn world() -> PublishWorld {
    let (temp_dir, base) = utf8_temp_dir();
    let output_dir = base.join("store/live");
    write_file(output_dir.as_std_path(), "bootstrap.json", b"{}");
    write_file(output_dir.as_std_path(), "bootstrap.json.sha256", b"sig");
    write_file(
        output_dir.join("repo").as_std_path(),
        "client-1.2.0.jar",
        b"client",
    );
    let config = sample_config(&base, &base.join("store"));
    PublishWorld {
        _temp_dir: temp_dir,
        output_dir,
        config,
        publisher: None,
        ftp_attempts: Rc::default(),
        git: StubGitExecutor::default(),
        result: None,
    }
}

#[given("an FTP target with an empty password")]
fn given_ftp_without_password(world: &mut PublishWorld) {
    let settings = FtpSettings {
        server: "ftp.example.net".to_owned(),
        port: 21,
        user: "deploy".to_owned(),
        password: String::new(),
    };
    let connector = CountingConnector {
        attempts: Rc::clone(&world.ftp_attempts),
    };
    world.publisher = Some(Box::new(FtpPublisher::new(settings, Box::new(connector))));
}

#[given("a git target whose clone already matches the output")]
fn given_git_unchanged(world: &mut PublishWorld) {
    world.use_git("", false);
}

#[given("a git target reporting a changed \"{file}\"")]
fn given_git_changed(world: &mut PublishWorld, file: String) {
    world.use_git(&format!("M  client/live/{file}\n"), true);
}

#[given("no upload method is configured")]
fn given_no_upload_method(world: &mut PublishWorld) {
    world.publisher = None;
}

#[when("the output tree is published")]
fn when_published(world: &mut PublishWorld) {
    world.result = Some(upload(
        &world.config,
        &world.output_dir,
        world.publisher.as_deref(),
        &mut Vec::new(),
    ));
}

#[then("publishing fails with a configuration error mentioning \"{keyword}\"")]
fn then_configuration_error(world: &mut PublishWorld, keyword: String) {
    match &world.result {
        Some(Err(PublisherError::Configuration { reason })) => {
            assert!(reason.contains(&keyword), "reason was: {reason}");
        }
        Some(Err(other)) => panic!("unexpected error: {other}"),
        Some(Ok(outcome)) => panic!("unexpected success: {outcome:?}"),
        None => panic!("publishing was not run"),
    }
}

#[then("no FTP connection was attempted")]
fn then_no_ftp_connection(world: &mut PublishWorld) {
    assert_eq!(world.ftp_attempts.get(), 0);
}

#[then("the publish outcome is no changes")]
fn then_no_changes(world: &mut PublishWorld) {
    assert_eq!(world.outcome(), &PublishOutcome::NoChanges);
}

#[then("the publish outcome lists \"{file}\"")]
fn then_outcome_lists(world: &mut PublishWorld, file: String) {
    assert_eq!(
        world.outcome(),
        &PublishOutcome::Committed { files: vec![file] }
    );
}

#[then("git ran \"{operations}\"")]
fn then_git_ran(world: &mut PublishWorld, operations: String) {
    let expected: Vec<&str> = operations.split(", ").collect();
    assert_eq!(world.git.operations(), expected);
    world.git.assert_finished();
}

#[then("the upload is skipped")]
fn then_upload_skipped(world: &mut PublishWorld) {
    assert_eq!(world.outcome(), &PublishOutcome::Skipped);
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "FTP upload with an empty password aborts before connecting"
)]
fn scenario_ftp_empty_password(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Git upload with no changes creates no commit"
)]
fn scenario_git_no_changes(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Git upload with changes commits and pushes"
)]
fn scenario_git_changes(world: PublishWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/publish.feature",
    name = "Missing upload method skips the upload"
)]
fn scenario_no_upload_method(world: PublishWorld) {
    let _ = world;
}
