//! Bootstrap manifest publisher library.
//!
//! This crate turns the artifact listing produced by a client build into a
//! signed `bootstrap.json` manifest for auto-updating launchers, copies the
//! local artifacts next to it, and uploads the result over FTP or to a git
//! hosting repository. It is used by the `bootstrap-publisher` CLI binary and
//! can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`artifact`] - Artifact descriptors, classification, records, and hashing
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - TOML configuration loading and validation
//! - [`dirs`] - Directory resolution abstraction for platform-specific paths
//! - [`error`] - Semantic error types
//! - [`manifest`] - Manifest template loading, assembly, and signed output
//! - [`output`] - Status line helpers
//! - [`pipeline`] - Generate and publish orchestration
//! - [`processor`] - Concurrent artifact processing
//! - [`progress`] - Progress bars for processing, uploads, and git transfers
//! - [`publish`] - FTP and git upload backends
//! - [`resolver`] - Repository fallback URL resolution
//! - [`signing`] - Ed25519 key management and manifest signatures

pub mod artifact;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod error;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod publish;
pub mod resolver;
pub mod signing;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
