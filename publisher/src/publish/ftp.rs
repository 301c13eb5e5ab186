//! FTP upload backend.
//!
//! Session lifecycle: connect (passive mode, login, binary type), NOOP
//! liveness check, then one MKD/STOR pair per file, then QUIT. Connection
//! and login failures abort the upload; a single failed transfer is logged
//! and counted and the batch continues.

use super::{PublishOutcome, Publisher, UploadJob};
use crate::config::FtpSettings;
use crate::error::{PublisherError, Result};
use crate::output::write_stderr_line;
use crate::progress::render_progress;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};

/// A failed FTP command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("FTP {operation} failed: {message}")]
pub struct FtpCommandError {
    /// The command that failed.
    pub operation: &'static str,
    /// Server or transport message.
    pub message: String,
}

impl FtpCommandError {
    fn new(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            operation,
            message: err.to_string(),
        }
    }
}

/// An authenticated FTP session in passive binary mode.
#[cfg_attr(test, mockall::automock)]
pub trait FtpSession {
    /// Liveness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer positively.
    fn noop(&mut self) -> std::result::Result<(), FtpCommandError>;

    /// Create a remote directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses, including when the directory
    /// already exists.
    fn mkdir(&mut self, path: &str) -> std::result::Result<(), FtpCommandError>;

    /// Store the local file at the remote path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the transfer fails.
    fn store(&mut self, remote: &str, local: &Path) -> std::result::Result<(), FtpCommandError>;

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the logout.
    fn quit(&mut self) -> std::result::Result<(), FtpCommandError>;
}

/// Opens FTP sessions.
#[cfg_attr(test, mockall::automock)]
pub trait FtpConnector {
    /// Connect, enter passive mode, log in, and switch to binary transfers.
    ///
    /// # Errors
    ///
    /// Returns an error if any of those steps fails.
    fn connect(
        &self,
        settings: &FtpSettings,
    ) -> std::result::Result<Box<dyn FtpSession>, FtpCommandError>;
}

/// [`FtpConnector`] backed by `suppaftp`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuppaFtpConnector;

impl FtpConnector for SuppaFtpConnector {
    fn connect(
        &self,
        settings: &FtpSettings,
    ) -> std::result::Result<Box<dyn FtpSession>, FtpCommandError> {
        let mut stream = FtpStream::connect((settings.server.as_str(), settings.port))
            .map_err(|e| FtpCommandError::new("connect", e))?;
        stream.set_mode(Mode::Passive);
        stream
            .login(settings.user.as_str(), settings.password.as_str())
            .map_err(|e| FtpCommandError::new("login", e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| FtpCommandError::new("type", e))?;
        Ok(Box::new(SuppaFtpSession { stream }))
    }
}

struct SuppaFtpSession {
    stream: FtpStream,
}

impl FtpSession for SuppaFtpSession {
    fn noop(&mut self) -> std::result::Result<(), FtpCommandError> {
        self.stream.noop().map_err(|e| FtpCommandError::new("noop", e))
    }

    fn mkdir(&mut self, path: &str) -> std::result::Result<(), FtpCommandError> {
        self.stream
            .mkdir(path)
            .map_err(|e| FtpCommandError::new("mkdir", e))
    }

    fn store(&mut self, remote: &str, local: &Path) -> std::result::Result<(), FtpCommandError> {
        let file = File::open(local).map_err(|e| FtpCommandError::new("open", e))?;
        let mut reader = BufReader::new(file);
        self.stream
            .put_file(remote, &mut reader)
            .map(|_| ())
            .map_err(|e| FtpCommandError::new("store", e))
    }

    fn quit(&mut self) -> std::result::Result<(), FtpCommandError> {
        self.stream.quit().map_err(|e| FtpCommandError::new("quit", e))
    }
}

/// Uploads the output tree over FTP.
pub struct FtpPublisher {
    settings: FtpSettings,
    connector: Box<dyn FtpConnector>,
}

impl FtpPublisher {
    /// Create a publisher using `connector` to open sessions.
    #[must_use]
    pub fn new(settings: FtpSettings, connector: Box<dyn FtpConnector>) -> Self {
        Self {
            settings,
            connector,
        }
    }

    fn open_session(&self) -> Result<Box<dyn FtpSession>> {
        let mut session = self.connector.connect(&self.settings).map_err(|e| {
            PublisherError::UploadConnection {
                reason: format!("{}:{}: {e}", self.settings.server, self.settings.port),
            }
        })?;
        session
            .noop()
            .map_err(|e| PublisherError::UploadConnection {
                reason: e.to_string(),
            })?;
        Ok(session)
    }
}

impl Publisher for FtpPublisher {
    fn name(&self) -> &'static str {
        "ftp"
    }

    fn publish(&self, job: &UploadJob, stderr: &mut dyn Write) -> Result<PublishOutcome> {
        self.settings.validate()?;
        write_stderr_line(
            stderr,
            format!(
                "Connecting to {}:{} as {}",
                self.settings.server, self.settings.port, self.settings.user
            ),
        );
        let mut session = self.open_session()?;
        info!("connected to FTP server {}", self.settings.server);

        let mut created = HashSet::new();
        let mut stored = 0;
        let mut failed = 0;
        for (index, entry) in job.entries.iter().enumerate() {
            ensure_parent_dirs(session.as_mut(), &entry.remote, &mut created);
            match session.store(&entry.remote, &entry.local) {
                Ok(()) => {
                    debug!("stored {}", entry.remote);
                    stored += 1;
                }
                Err(err) => {
                    error!("failed to upload {}: {err}", entry.local.display());
                    failed += 1;
                }
            }
            let _ = write!(stderr, "\r{}", render_progress(index + 1, job.len()));
        }
        write_stderr_line(stderr, "");

        if let Err(err) = session.quit() {
            warn!("FTP logout failed: {err}");
        }
        info!("FTP upload finished: {stored} stored, {failed} failed");
        Ok(PublishOutcome::Uploaded { stored, failed })
    }
}

/// Create every missing ancestor directory of `remote`, once per session.
fn ensure_parent_dirs(session: &mut dyn FtpSession, remote: &str, created: &mut HashSet<String>) {
    let Some((parent, _)) = remote.rsplit_once('/') else {
        return;
    };
    let mut path = String::new();
    for segment in parent.split('/').filter(|s| !s.is_empty()) {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(segment);
        if created.insert(path.clone()) {
            if let Err(err) = session.mkdir(&path) {
                debug!("mkdir {path}: {err}");
            }
        }
    }
}

#[cfg(test)]
#[path = "ftp_tests.rs"]
mod tests;
