//! Shared test utilities for the publisher crate.

use crate::config::PublisherConfig;
use crate::error::{PublisherError, Result};
use crate::publish::git::{GitExecutor, GitInvocation};
use crate::resolver::RepositoryProbe;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::rc::Rc;
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code.unsigned_abs())
}

/// Creates a successful command `Output` with empty stdout and stderr.
#[must_use]
pub fn success_output() -> Output {
    stdout_output("")
}

/// Creates a successful command `Output` with the given stdout.
#[must_use]
pub fn stdout_output(stdout: &str) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
#[must_use]
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(128),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// An expected git invocation and the result to hand back.
#[derive(Debug)]
pub struct ExpectedGitCall {
    /// Operation name the publisher should pass (`clone`, `push`, ...).
    pub operation: &'static str,
    /// The result to return when this invocation happens.
    pub result: Result<Output>,
}

/// A [`GitExecutor`] replaying scripted results in order.
///
/// Clones share their script and call log, so a test can keep one handle
/// while the publisher owns another.
#[derive(Debug, Clone, Default)]
pub struct StubGitExecutor {
    expected: Rc<RefCell<VecDeque<ExpectedGitCall>>>,
    calls: Rc<RefCell<Vec<(&'static str, Vec<String>)>>>,
}

impl StubGitExecutor {
    /// Creates a stub that expects `expected` in order.
    #[must_use]
    pub fn new(expected: Vec<ExpectedGitCall>) -> Self {
        Self {
            expected: Rc::new(RefCell::new(expected.into())),
            calls: Rc::default(),
        }
    }

    /// Arguments of every invocation received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .borrow()
            .iter()
            .map(|(_, args)| args.clone())
            .collect()
    }

    /// Operation names of every invocation received so far.
    #[must_use]
    pub fn operations(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|(op, _)| *op).collect()
    }

    /// Asserts that all expected invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining: Vec<_> = self.expected.borrow().iter().map(|c| c.operation).collect();
        assert!(
            remaining.is_empty(),
            "expected further git invocations: {remaining:?}"
        );
    }
}

impl GitExecutor for StubGitExecutor {
    fn run(&self, invocation: &GitInvocation<'_>, _stderr: &mut dyn Write) -> Result<Output> {
        self.calls
            .borrow_mut()
            .push((invocation.operation, invocation.args.to_vec()));
        let Some(call) = self.expected.borrow_mut().pop_front() else {
            return Err(PublisherError::StubMismatch {
                message: format!("unexpected git {}", invocation.operation),
            });
        };
        if call.operation != invocation.operation {
            return Err(PublisherError::StubMismatch {
                message: format!(
                    "expected git {}, got git {}",
                    call.operation, invocation.operation
                ),
            });
        }
        call.result
    }
}

/// A [`RepositoryProbe`] answering from a fixed set of reachable URLs.
#[derive(Debug, Default)]
pub struct StaticProbe {
    reachable: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticProbe {
    /// Probe reporting exactly `urls` as present.
    #[must_use]
    pub fn serving(urls: &[&str]) -> Self {
        Self {
            reachable: urls.iter().map(|url| (*url).to_owned()).collect(),
            requests: Mutex::default(),
        }
    }

    /// Every URL probed so far, sorted.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        requests.sort();
        requests
    }
}

impl RepositoryProbe for StaticProbe {
    fn exists(&self, url: &str) -> bool {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        self.reachable.contains(url)
    }
}

/// Writes `bytes` to `dir/name`, creating `dir` first.
///
/// # Panics
///
/// Panics if the directory or file cannot be written.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    fs::create_dir_all(dir).expect("create test directory");
    let path = dir.join(name);
    fs::write(&path, bytes).expect("write test file");
    path
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// A temporary directory together with its UTF-8 path.
///
/// # Panics
///
/// Panics if the directory cannot be created or its path is not UTF-8.
#[must_use]
pub fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().expect("create temp dir");
    let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("UTF-8 temp path");
    (temp, path)
}

/// Builds artifact listing documents.
#[derive(Debug, Clone, Default)]
pub struct ListingBuilder {
    classpath: Vec<String>,
    artifacts: Vec<Value>,
}

impl ListingBuilder {
    /// An empty listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw classpath entry.
    #[must_use]
    pub fn classpath(mut self, path: impl Into<String>) -> Self {
        self.classpath.push(path.into());
        self
    }

    /// Add a module-coordinate artifact and its classpath entry.
    #[must_use]
    pub fn artifact(
        self,
        coordinate: &str,
        classifier: Option<&str>,
        file: impl Into<String>,
    ) -> Self {
        self.descriptor(coordinate, classifier, file.into(), true)
    }

    /// Add an artifact whose component is not a module coordinate.
    #[must_use]
    pub fn non_module(self, coordinate: &str, file: impl Into<String>) -> Self {
        self.descriptor(coordinate, None, file.into(), false)
    }

    fn descriptor(
        mut self,
        coordinate: &str,
        classifier: Option<&str>,
        file: String,
        module: bool,
    ) -> Self {
        let mut parts = coordinate.splitn(3, ':');
        let group = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        self.classpath.push(file.clone());
        self.artifacts.push(json!({
            "group": group,
            "name": name,
            "version": version,
            "classifier": classifier,
            "file": file,
            "module": module,
        }));
        self
    }

    /// The listing as JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        json!({ "classpath": self.classpath, "artifacts": self.artifacts }).to_string()
    }

    /// Write the listing to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write(&self, path: &Utf8Path) {
        fs::write(path, self.to_json()).expect("write artifact listing");
    }
}

/// A minimal valid configuration for `project_root` storing into `store`.
///
/// # Panics
///
/// Panics if the generated configuration does not parse.
#[must_use]
pub fn sample_config(project_root: &Utf8Path, store: &Utf8Path) -> PublisherConfig {
    let text = format!(
        "download_root = \"https://cdn.example.net/client\"\n\
         store_location = '{store}'\n\
         [project]\n\
         name = \"demo-client\"\n\
         version = \"1.2.0\"\n\
         root = '{project_root}'\n"
    );
    PublisherConfig::from_toml(&text, project_root).expect("sample configuration parses")
}
