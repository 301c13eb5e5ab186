//! CLI argument definitions for the bootstrap publisher.
//!
//! Kept apart from the entrypoint so parsing can be tested without running
//! the pipeline.

use crate::config::DEFAULT_CONFIG_FILE;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Default artifact listing written by the build.
pub const DEFAULT_LISTING_FILE: &str = "build/bootstrap-artifacts.json";

/// Build signed launcher bootstrap manifests and publish client bundles.
#[derive(Parser, Debug)]
#[command(name = "bootstrap-publisher")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build signed launcher bootstrap manifests and publish client bundles.\n\n",
    "The publisher reads the artifact listing produced by the build, copies ",
    "local jars into the output repository, resolves external dependencies ",
    "against remote repositories, and writes bootstrap.json together with ",
    "its signature. `publish` then uploads the output tree over FTP or to a ",
    "git hosting repository.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Generate the manifest for the live channel:\n",
    "    $ bootstrap-publisher generate\n\n",
    "  Generate and upload using a custom configuration:\n",
    "    $ bootstrap-publisher --config release.toml publish\n\n",
    "  Create the signing key pair only:\n",
    "    $ bootstrap-publisher generate-keys",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file.
    #[arg(short, long, global = true, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    pub config: Utf8PathBuf,

    /// Artifact listing produced by the build.
    #[arg(short, long, global = true, value_name = "FILE", default_value = DEFAULT_LISTING_FILE)]
    pub artifacts: Utf8PathBuf,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        global = true,
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbosity")]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Build, copy, and sign the manifest without uploading.
    Generate,

    /// Generate, then upload with the configured method.
    Publish,

    /// Create the signing key pair in the store location if absent.
    GenerateKeys,
}

impl Cli {
    /// Log level filter implied by `-v`/`-q`.
    #[must_use]
    pub const fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Warn;
        }
        match self.verbosity {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
