//! Directory resolution abstraction for platform-specific paths.
//!
//! Wraps the platform cache-directory lookup behind a trait so that staging
//! logic can be exercised in tests without touching the real user cache.

use std::path::PathBuf;

/// Provides platform base directories used by the wrapper.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// The per-user cache directory, when one can be determined.
    fn cache_dir(&self) -> Option<PathBuf>;
}

/// Resolves directories from the running user's environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn cache_dir(&self) -> Option<PathBuf> {
        directories_next::BaseDirs::new().map(|dirs| dirs.cache_dir().to_path_buf())
    }
}
