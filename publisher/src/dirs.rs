//! Platform data directory lookup.
//!
//! The default store location lives under the user's data directory
//! (`%APPDATA%`, `~/Library/Application Support`, or `~/.local/share`).
//! The trait keeps that lookup injectable for tests.

use std::path::PathBuf;

/// Source of platform base directories.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The per-user data directory, if the platform defines one.
    fn data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn data_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf())
    }
}
