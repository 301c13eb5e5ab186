//! Publisher configuration loaded from `bootstrap.toml`.
//!
//! ```toml
//! download_root = "https://cdn.example.net/client/"
//! build_type = "live"
//! store_old_versions = true
//!
//! [project]
//! name = "example-client"
//! version = "1.4.2"
//!
//! [publish.git]
//! repository_url = "https://github.com/example/hosting.git"
//! ```
//!
//! Exactly one upload method may be configured: `[publish.ftp]` or
//! `[publish.git]`. Secrets can stay out of the file by setting
//! `BOOTSTRAP_FTP_PASSWORD` or `BOOTSTRAP_GIT_TOKEN`.

use crate::dirs::BaseDirs;
use crate::error::{PublisherError, Result};
use crate::resolver::ResolutionSettings;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fmt;
use std::fs;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "bootstrap.toml";

/// Download root shipped in sample configurations; never valid.
pub const PLACEHOLDER_DOWNLOAD_ROOT: &str = "https://repo.example.com";

/// Project version meaning "no explicit version".
pub const UNSPECIFIED_VERSION: &str = "unspecified";

/// Environment variable overriding the FTP password.
pub const FTP_PASSWORD_ENV: &str = "BOOTSTRAP_FTP_PASSWORD";

/// Environment variable overriding the git token.
pub const GIT_TOKEN_ENV: &str = "BOOTSTRAP_GIT_TOKEN";

/// Top-level publisher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublisherConfig {
    /// The project being published.
    pub project: ProjectSettings,
    /// Public URL under which build types are served.
    #[serde(default)]
    pub download_root: String,
    /// Distribution channel, e.g. `live` or `beta`.
    #[serde(default = "default_build_type")]
    pub build_type: String,
    /// Local output root; defaults to the platform data directory.
    #[serde(default)]
    pub store_location: Option<Utf8PathBuf>,
    /// Keep per-version copies of artifacts and manifests.
    #[serde(default)]
    pub store_old_versions: bool,
    /// Manifest template override.
    #[serde(default)]
    pub template: Option<Utf8PathBuf>,
    /// Project-relative directories holding loose jars.
    #[serde(default = "default_local_lib_dirs")]
    pub local_lib_dirs: Vec<String>,
    /// Artifact-name substrings eligible for platform tagging.
    #[serde(default)]
    pub native_artifacts: Vec<String>,
    /// Remote directory prefix for uploads.
    #[serde(default = "default_remote_sub_path")]
    pub remote_sub_path: String,
    /// Online artifact resolution.
    #[serde(default)]
    pub resolution: ResolutionSettings,
    /// Upload method, if any.
    #[serde(default)]
    pub publish: Option<PublishTarget>,
}

/// The `[project]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    /// Project name, used for the default store location.
    pub name: String,
    /// Project version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Project root directory.
    #[serde(default = "default_root")]
    pub root: Utf8PathBuf,
}

/// The configured upload method.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishTarget {
    /// Upload over FTP.
    Ftp(FtpSettings),
    /// Commit and push to a git hosting repository.
    Git(GitSettings),
}

/// The `[publish.ftp]` table.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FtpSettings {
    /// Server host name.
    #[serde(default)]
    pub server: String,
    /// Control connection port.
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    /// Login user.
    #[serde(default)]
    pub user: String,
    /// Login password.
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for FtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The `[publish.git]` table.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSettings {
    /// Access token used as the HTTPS user name.
    #[serde(default)]
    pub token: String,
    /// HTTPS URL of the hosting repository.
    #[serde(default)]
    pub repository_url: String,
    /// Commit author name.
    #[serde(default = "default_author_name")]
    pub author_name: String,
    /// Commit author e-mail.
    #[serde(default = "default_author_email")]
    pub author_email: String,
}

impl fmt::Debug for GitSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitSettings")
            .field("token", &"<redacted>")
            .field("repository_url", &self.repository_url)
            .field("author_name", &self.author_name)
            .field("author_email", &self.author_email)
            .finish()
    }
}

impl FtpSettings {
    /// Check that the server and login credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Configuration`] naming the first empty
    /// field.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("server", &self.server),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(PublisherError::configuration(format!(
                    "FTP {field} is empty; set `publish.ftp.{field}`"
                )));
            }
        }
        Ok(())
    }
}

impl GitSettings {
    /// Check that the token and repository URL are present.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Configuration`] when either is empty.
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(PublisherError::configuration(
                "git token is empty; set `publish.git.token` or BOOTSTRAP_GIT_TOKEN",
            ));
        }
        if self.repository_url.trim().is_empty() {
            return Err(PublisherError::configuration(
                "git repository URL is empty; set `publish.git.repository_url`, \
                 e.g. https://github.com/example/hosting.git",
            ));
        }
        Ok(())
    }
}

fn default_build_type() -> String {
    "live".to_owned()
}

fn default_version() -> String {
    UNSPECIFIED_VERSION.to_owned()
}

fn default_root() -> Utf8PathBuf {
    Utf8PathBuf::from(".")
}

fn default_local_lib_dirs() -> Vec<String> {
    vec!["libs".to_owned(), "lib".to_owned()]
}

fn default_remote_sub_path() -> String {
    "client".to_owned()
}

const fn default_ftp_port() -> u16 {
    21
}

fn default_author_name() -> String {
    "bootstrap-publisher".to_owned()
}

fn default_author_email() -> String {
    "bootstrap-publisher@users.noreply.github.com".to_owned()
}

impl PublisherConfig {
    /// Read the configuration at `path`.
    ///
    /// Relative paths inside the file are resolved against the file's
    /// directory and secret overrides are taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] if the file cannot be read
    /// or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PublisherError::InvalidConfig {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        let base_dir = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let mut config = Self::from_toml(&text, base_dir).map_err(|e| match e {
            PublisherError::InvalidConfig { reason, .. } => PublisherError::InvalidConfig {
                path: path.to_owned(),
                reason,
            },
            other => other,
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration text, resolving relative paths against
    /// `base_dir`. Environment overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::InvalidConfig`] if the text is not valid.
    pub fn from_toml(text: &str, base_dir: &Utf8Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text).map_err(|e| PublisherError::InvalidConfig {
            path: Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
            reason: e.to_string(),
        })?;
        config.project.root = resolve(base_dir, &config.project.root);
        config.template = config.template.map(|t| resolve(base_dir, &t));
        config.store_location = config.store_location.map(|s| resolve(base_dir, &s));
        Ok(config)
    }

    /// Replace secrets with values from [`FTP_PASSWORD_ENV`] and
    /// [`GIT_TOKEN_ENV`] when those are set.
    pub fn apply_env_overrides(&mut self) {
        match &mut self.publish {
            Some(PublishTarget::Ftp(ftp)) => {
                if let Ok(password) = std::env::var(FTP_PASSWORD_ENV) {
                    ftp.password = password;
                }
            }
            Some(PublishTarget::Git(git)) => {
                if let Ok(token) = std::env::var(GIT_TOKEN_ENV) {
                    git.token = token;
                }
            }
            None => {}
        }
    }

    /// Check the settings needed to generate a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Configuration`] when the download root is
    /// missing or still the placeholder, or when the project name or build
    /// type is empty.
    pub fn validate(&self) -> Result<()> {
        let root = self.download_root.trim();
        if root.is_empty() || root.trim_end_matches('/') == PLACEHOLDER_DOWNLOAD_ROOT {
            return Err(PublisherError::configuration(format!(
                "download root not defined; set `download_root`, for example \
                 https://cdn.example.net/client/ to serve {}/{}",
                self.build_type, crate::manifest::MANIFEST_FILE
            )));
        }
        if self.project.name.trim().is_empty() {
            return Err(PublisherError::configuration("project name is empty"));
        }
        if self.build_type.trim().is_empty() {
            return Err(PublisherError::configuration("build type is empty"));
        }
        Ok(())
    }

    /// Check the configured upload target, if any.
    ///
    /// Runs before generation so that a publish with missing credentials
    /// stops before any key, artifact, or network work.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Configuration`] when the FTP credentials or
    /// the git token and URL are empty.
    pub fn validate_publish(&self) -> Result<()> {
        match &self.publish {
            Some(PublishTarget::Ftp(settings)) => settings.validate(),
            Some(PublishTarget::Git(settings)) => settings.validate(),
            None => Ok(()),
        }
    }

    /// The download root with exactly one trailing `/`.
    #[must_use]
    pub fn download_root(&self) -> String {
        format!("{}/", self.download_root.trim().trim_end_matches('/'))
    }

    /// Whether artifacts and manifests are stored per version.
    #[must_use]
    pub fn is_versioned(&self) -> bool {
        self.store_old_versions && self.project.version != UNSPECIFIED_VERSION
    }

    /// Download URL prefix for copied artifacts:
    /// `<download_root><build_type>/repo[/<version>]/`.
    #[must_use]
    pub fn artifact_base_url(&self) -> String {
        let mut url = format!("{}{}/repo/", self.download_root(), self.build_type);
        if self.is_versioned() {
            url.push_str(&self.project.version);
            url.push('/');
        }
        url
    }

    /// The store location, falling back to `<data_dir>/<project name>`.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Configuration`] when no data directory is
    /// available or it is not valid UTF-8.
    pub fn store_location(&self, dirs: &dyn BaseDirs) -> Result<Utf8PathBuf> {
        if let Some(location) = &self.store_location {
            return Ok(location.clone());
        }
        let data_dir = dirs.data_dir().ok_or_else(|| {
            PublisherError::configuration("could not determine the platform data directory")
        })?;
        let data_dir = Utf8PathBuf::from_path_buf(data_dir).map_err(|path| {
            PublisherError::configuration(format!(
                "platform data directory is not valid UTF-8: {}",
                path.display()
            ))
        })?;
        Ok(data_dir.join(&self.project.name))
    }
}

fn resolve(base_dir: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
