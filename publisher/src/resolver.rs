//! Download URL resolution for online artifacts.
//!
//! Two modes are supported. `probe` issues concurrent HTTP `HEAD` requests
//! against every candidate repository and picks the first one, in list
//! order, that answers with a success status. `static` never touches the
//! network and assumes the first repository serves everything. In both
//! modes an artifact whose name contains a pinned marker (by default
//! `lwjgl`) goes straight to the pinned repository.

use log::{debug, warn};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

/// Maven Central, the well-known public repository.
pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2/";

/// The RuneLite artifact repository.
pub const RUNELITE_REPOSITORY: &str = "https://repo.runelite.net/";

/// Existence check for a remote file.
///
/// Implementations treat every failure (timeout, refused connection,
/// non-success status) as "does not exist".
pub trait RepositoryProbe: Send + Sync {
    /// Whether `url` answers with a success status.
    fn exists(&self, url: &str) -> bool;
}

/// [`RepositoryProbe`] issuing HTTP `HEAD` requests through one shared
/// `ureq` agent.
pub struct HttpProbe {
    agent: ureq::Agent,
}

impl HttpProbe {
    /// Build a probe whose requests give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl RepositoryProbe for HttpProbe {
    fn exists(&self, url: &str) -> bool {
        match self.agent.head(url).call() {
            Ok(_) => true,
            Err(err) => {
                debug!("probe {url} failed: {err}");
                false
            }
        }
    }
}

/// How online artifact URLs are resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Probe candidate repositories concurrently.
    #[default]
    Probe,
    /// Use the first repository without probing.
    Static,
}

/// A repository that serves every artifact whose name contains `marker`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinnedRepository {
    /// Substring of the artifact name.
    pub marker: String,
    /// Repository base URL.
    pub base_url: String,
}

/// The `[resolution]` configuration table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionSettings {
    /// Probing or static resolution.
    #[serde(default)]
    pub mode: ResolutionMode,
    /// Candidate repositories, in priority order.
    #[serde(default = "default_repositories")]
    pub repositories: Vec<String>,
    /// Marker-based shortcuts checked before any probing.
    #[serde(default = "default_pinned")]
    pub pinned: Vec<PinnedRepository>,
    /// Per-request timeout for existence probes.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::default(),
            repositories: default_repositories(),
            pinned: default_pinned(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl ResolutionSettings {
    /// Probe timeout as a [`Duration`].
    #[must_use]
    pub const fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn default_repositories() -> Vec<String> {
    vec![RUNELITE_REPOSITORY.to_owned(), MAVEN_CENTRAL.to_owned()]
}

fn default_pinned() -> Vec<PinnedRepository> {
    vec![PinnedRepository {
        marker: "lwjgl".to_owned(),
        base_url: MAVEN_CENTRAL.to_owned(),
    }]
}

const fn default_probe_timeout_secs() -> u64 {
    10
}

/// Join a repository base URL and a relative path with exactly one `/`.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Resolves coordinate paths to download URLs for one pipeline run.
pub struct RepositoryResolver<'a> {
    settings: &'a ResolutionSettings,
    probe: &'a dyn RepositoryProbe,
}

impl<'a> RepositoryResolver<'a> {
    /// Create a resolver over `settings` using `probe` for existence checks.
    #[must_use]
    pub fn new(settings: &'a ResolutionSettings, probe: &'a dyn RepositoryProbe) -> Self {
        Self { settings, probe }
    }

    /// Resolve the download URL of `coordinate_path` for the artifact
    /// `name`.
    ///
    /// Returns `None` when no candidate repository serves the file. Network
    /// failures never surface as errors.
    #[must_use]
    pub fn resolve(&self, name: &str, coordinate_path: &str) -> Option<String> {
        if let Some(pinned) = self
            .settings
            .pinned
            .iter()
            .find(|pinned| !pinned.marker.is_empty() && name.contains(pinned.marker.as_str()))
        {
            return Some(join_url(&pinned.base_url, coordinate_path));
        }

        let resolved = match self.settings.mode {
            ResolutionMode::Static => self
                .settings
                .repositories
                .first()
                .map(|base| join_url(base, coordinate_path)),
            ResolutionMode::Probe => self.probe_all(coordinate_path),
        };
        if resolved.is_none() {
            warn!("no repository serves {name} ({coordinate_path})");
        }
        resolved
    }

    fn probe_all(&self, coordinate_path: &str) -> Option<String> {
        let candidates: Vec<String> = self
            .settings
            .repositories
            .iter()
            .map(|base| join_url(base, coordinate_path))
            .collect();

        let reachable: Vec<bool> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|url| scope.spawn(move || self.probe.exists(url)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .collect()
        });

        candidates
            .into_iter()
            .zip(reachable)
            .find_map(|(url, ok)| ok.then_some(url))
    }
}
