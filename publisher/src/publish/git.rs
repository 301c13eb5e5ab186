//! Git hosting upload backend.
//!
//! The hosting repository is cloned into a temporary directory over an
//! HTTPS URL carrying the access token, the output tree is copied under
//! `<remote_sub_path>/<build_type>/`, and any added or modified files are
//! committed and pushed. The temporary clone is removed when the publish
//! step returns, whatever the outcome.

use super::{PublishOutcome, Publisher, UploadJob};
use crate::config::GitSettings;
use crate::error::{PublisherError, Result};
use crate::output::{write_stderr_line, write_step};
use crate::progress::GitProgress;
use log::{debug, info};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Default timeout for git operations (5 minutes).
pub const GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// One git invocation.
#[derive(Debug, Clone, Copy)]
pub struct GitInvocation<'a> {
    /// Operation name used in errors (`clone`, `commit`, ...).
    pub operation: &'static str,
    /// Arguments after `git`.
    pub args: &'a [String],
    /// Working directory, if not the current one.
    pub working_dir: Option<&'a Path>,
    /// Render `--progress` output to the status stream.
    pub show_progress: bool,
}

/// Runs git commands.
pub trait GitExecutor {
    /// Run `git` with the given invocation.
    ///
    /// When `show_progress` is set, progress lines are rendered to `stderr`
    /// and only the remaining lines are returned in the output's stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if git cannot be started or times out. A non-zero
    /// exit status is reported through the returned [`Output`].
    fn run(&self, invocation: &GitInvocation<'_>, stderr: &mut dyn Write) -> Result<Output>;
}

/// [`GitExecutor`] spawning the system `git` binary.
#[derive(Debug, Clone, Copy)]
pub struct SystemGitExecutor {
    timeout: Duration,
}

impl Default for SystemGitExecutor {
    fn default() -> Self {
        Self {
            timeout: GIT_TIMEOUT,
        }
    }
}

impl SystemGitExecutor {
    /// Executor with a custom timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GitExecutor for SystemGitExecutor {
    fn run(&self, invocation: &GitInvocation<'_>, stderr: &mut dyn Write) -> Result<Output> {
        let mut cmd = Command::new("git");
        cmd.args(invocation.args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }

        let deadline = Instant::now() + self.timeout;
        let mut child = cmd.spawn()?;
        let stdout_reader = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut chunk = [0u8; 4096];
                while let Ok(read) = err.read(&mut chunk) {
                    let Some(bytes) = chunk.get(..read).filter(|b| !b.is_empty()) else {
                        break;
                    };
                    if tx.send(bytes.to_vec()).is_err() {
                        break;
                    }
                }
            })
        });

        let mut progress = if invocation.show_progress {
            Some(GitProgress::new(&mut *stderr))
        } else {
            None
        };
        let mut raw_stderr = Vec::new();
        let mut timed_out = false;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(chunk) => match progress.as_mut() {
                    Some(renderer) => renderer.feed(&chunk),
                    None => raw_stderr.extend_from_slice(&chunk),
                },
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
            }
        }
        if let Some(renderer) = progress {
            raw_stderr = renderer.finish().into_bytes();
        }

        let status = if timed_out {
            None
        } else {
            child.wait_timeout(deadline.saturating_duration_since(Instant::now()))?
        };
        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PublisherError::Git {
                operation: invocation.operation,
                message: format!(
                    "operation timed out after {} seconds",
                    self.timeout.as_secs()
                ),
            });
        };

        if let Some(handle) = stderr_reader {
            let _ = handle.join();
        }
        let stdout = stdout_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        Ok(Output {
            status,
            stdout,
            stderr: raw_stderr,
        })
    }
}

/// Commits the output tree to a git hosting repository.
pub struct GitPublisher {
    settings: GitSettings,
    version: Option<String>,
    executor: Box<dyn GitExecutor>,
}

impl GitPublisher {
    /// Create a publisher.
    ///
    /// `version` is mentioned in the commit message when present.
    #[must_use]
    pub fn new(
        settings: GitSettings,
        version: Option<String>,
        executor: Box<dyn GitExecutor>,
    ) -> Self {
        Self {
            settings,
            version,
            executor,
        }
    }

    fn git(
        &self,
        operation: &'static str,
        args: &[String],
        working_dir: &Path,
        show_progress: bool,
        stderr: &mut dyn Write,
    ) -> Result<Output> {
        debug!("git {}", self.redact(&args.join(" ")));
        let invocation = GitInvocation {
            operation,
            args,
            working_dir: Some(working_dir),
            show_progress,
        };
        let output = self
            .executor
            .run(&invocation, stderr)
            .map_err(|err| match err {
                PublisherError::Git { operation, message } => PublisherError::Git {
                    operation,
                    message: self.redact(&message),
                },
                other => other,
            })?;
        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr);
            return Err(PublisherError::Git {
                operation,
                message: self.redact(message.trim()),
            });
        }
        Ok(output)
    }

    fn redact(&self, text: &str) -> String {
        let token = self.settings.token.trim();
        if token.is_empty() {
            text.to_owned()
        } else {
            text.replace(token, "***")
        }
    }

    fn copy_tree(job: &UploadJob, clone_dir: &Path) -> Result<()> {
        for entry in &job.entries {
            let destination = clone_dir.join(&entry.remote);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&entry.local, &destination)?;
        }
        Ok(())
    }
}

impl Publisher for GitPublisher {
    fn name(&self) -> &'static str {
        "git"
    }

    fn publish(&self, job: &UploadJob, stderr: &mut dyn Write) -> Result<PublishOutcome> {
        self.settings.validate()?;
        let remote = authenticated_url(&self.settings.repository_url, self.settings.token.trim())?;
        let clone_dir = tempfile::Builder::new().prefix("bootstrap-git-").tempdir()?;
        let clone_path = clone_dir.path();

        write_step(stderr, 1, "Cloning the hosting repository.");
        let clone_args = vec![
            "clone".to_owned(),
            "--progress".to_owned(),
            remote,
            clone_path.to_string_lossy().into_owned(),
        ];
        self.git("clone", &clone_args, clone_path, true, stderr)?;

        write_step(stderr, 2, "Copying files into the clone.");
        Self::copy_tree(job, clone_path)?;
        self.git("add", &args(&["add", "-A"]), clone_path, false, stderr)?;

        write_step(stderr, 3, "Preparing commit.");
        let status = self.git(
            "status",
            &args(&["status", "--porcelain"]),
            clone_path,
            false,
            stderr,
        )?;
        let files = changed_files(&String::from_utf8_lossy(&status.stdout));
        if files.is_empty() {
            write_stderr_line(stderr, "No changes detected; nothing to commit.");
            info!("hosting repository already up to date");
            return Ok(PublishOutcome::NoChanges);
        }

        write_step(stderr, 4, format!("Committing {} changed files.", files.len()));
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let message = commit_message(&timestamp, self.version.as_deref(), &files);
        let commit_args = vec![
            "-c".to_owned(),
            format!("user.name={}", self.settings.author_name),
            "-c".to_owned(),
            format!("user.email={}", self.settings.author_email),
            "commit".to_owned(),
            "-m".to_owned(),
            message,
        ];
        self.git("commit", &commit_args, clone_path, false, stderr)?;

        write_step(stderr, 5, "Pushing to the hosting repository.");
        self.git(
            "push",
            &args(&["push", "--progress", "origin", "HEAD"]),
            clone_path,
            true,
            stderr,
        )?;
        info!("pushed {} changed files", files.len());
        Ok(PublishOutcome::Committed { files })
    }
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

/// Insert `token` as the user name of an HTTP(S) repository URL.
///
/// # Errors
///
/// Returns [`PublisherError::Configuration`] for URLs that are not HTTP(S).
pub fn authenticated_url(repository_url: &str, token: &str) -> Result<String> {
    let url = repository_url.trim();
    let (scheme, rest) = url.split_once("://").ok_or_else(|| {
        PublisherError::configuration(format!("git repository URL {url} has no scheme"))
    })?;
    if scheme != "https" && scheme != "http" {
        return Err(PublisherError::configuration(format!(
            "git repository URL must use https, got {scheme}"
        )));
    }
    let host_and_path = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    Ok(format!("{scheme}://{token}@{host_and_path}"))
}

/// Names of added or modified files in `git status --porcelain` output.
///
/// Only the index column is considered, matching what `git add -A` staged.
#[must_use]
pub fn changed_files(porcelain: &str) -> Vec<String> {
    porcelain
        .lines()
        .filter(|line| line.starts_with('A') || line.starts_with('M'))
        .filter_map(|line| line.get(3..))
        .map(|path| {
            let path = path.trim().trim_matches('"');
            path.rsplit_once('/')
                .map_or(path, |(_, name)| name)
                .to_owned()
        })
        .collect()
}

/// Build the commit message: a timestamped subject and a body listing the
/// changed file names.
#[must_use]
pub fn commit_message(timestamp: &str, version: Option<&str>, files: &[String]) -> String {
    let mut message = format!("Updated client at {timestamp}");
    if let Some(version) = version {
        message.push_str(&format!(": version {version}"));
    }
    message.push_str("\n\nUpdated files:\n");
    for file in files {
        message.push_str(&format!("- {file}\n"));
    }
    message
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
