//! Staging-directory creation with tamper-checked parents and scoped cleanup.
//!
//! The extracted server binary lives in a uniquely named directory beneath a
//! hardened parent. Creation prefers the user cache directory and falls back
//! to the system temp root; each candidate is validated by [`parent`] before
//! use. Removal is scoped: the [`StagingDir`] guard deletes the directory on
//! drop, but only after re-checking that the parent still matches the state
//! captured at creation time, and intentionally leaks the directory when it
//! does not.

pub mod parent;

use crate::dirs::BaseDirs;
use crate::error::{Result, WrapperError};
use camino::{Utf8Path, Utf8PathBuf};
use log::warn;
use parent::{ParentDirState, ensure_secure_parent, verify_parent_unchanged};

/// Prefix of every staging directory name.
pub const STAGING_DIR_PREFIX: &str = "gh-mcp-server-";

/// Upper bound on random-name collisions before creation is declared
/// exhausted. A policy choice rather than a correctness requirement; any
/// sufficiently large bound would do.
const NAME_ATTEMPTS: u32 = 256;

/// A candidate location for hosting the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentCandidate {
    /// A directory that must pass the full hardening checks before use.
    Verified(Utf8PathBuf),
    /// The system temp root, used as-is with library-managed naming.
    SystemTemp,
}

/// A staging directory scheduled for removal when dropped.
///
/// Created once, deleted at most once. If the process is killed externally
/// the directory leaks, which is an accepted cost rather than a correctness
/// violation.
#[derive(Debug)]
pub struct StagingDir {
    path: Utf8PathBuf,
    /// Captured parent state for pre-deletion re-validation. `None` for the
    /// system-temp arm, where the path was never shared with a hardened
    /// parent.
    parent: Option<ParentDirState>,
}

impl StagingDir {
    /// Path of the staging directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Some(state) = &self.parent {
            // Refuse to delete a path that might now point somewhere else.
            if let Err(err) = verify_parent_unchanged(state) {
                warn!("leaving staging directory {} in place: {err}", self.path);
                return;
            }
        }
        if let Err(err) = std::fs::remove_dir_all(&self.path) {
            warn!("failed to remove staging directory {}: {err}", self.path);
        }
    }
}

/// Ordered staging-parent candidates for this platform.
///
/// The user cache directory (under a `gh-mcp` subdirectory) is preferred;
/// the system temp root is kept as a fallback for environments without one.
#[must_use]
pub fn staging_parent_candidates(dirs: &dyn BaseDirs) -> Vec<ParentCandidate> {
    let mut candidates = Vec::with_capacity(2);

    if let Some(cache_dir) = dirs.cache_dir()
        && let Ok(cache_dir) = Utf8PathBuf::from_path_buf(cache_dir)
    {
        candidates.push(ParentCandidate::Verified(cache_dir.join("gh-mcp")));
    }

    candidates.push(ParentCandidate::SystemTemp);
    candidates
}

/// Create a staging directory in the first candidate that works.
///
/// Candidate failures are not retried against the same path; the next
/// candidate is attempted instead, and all failures are reported together
/// when none succeeds.
///
/// # Errors
///
/// Returns [`WrapperError::TempDirCreationFailed`] carrying every
/// candidate's failure when all candidates fail.
pub fn create_staging_dir_with_fallback(candidates: &[ParentCandidate]) -> Result<StagingDir> {
    if candidates.is_empty() {
        return create_in_candidate(&ParentCandidate::SystemTemp);
    }

    let mut attempts = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match create_in_candidate(candidate) {
            Ok(staging) => return Ok(staging),
            Err(err) => attempts.push(err.to_string()),
        }
    }

    Err(WrapperError::TempDirCreationFailed {
        attempts: attempts.join("; "),
    })
}

fn create_in_candidate(candidate: &ParentCandidate) -> Result<StagingDir> {
    match candidate {
        ParentCandidate::Verified(path) => {
            let state = ensure_secure_parent(path)?;
            let staging_path = create_in_verified_parent(&state)?;
            Ok(StagingDir {
                path: staging_path,
                parent: Some(state),
            })
        }
        ParentCandidate::SystemTemp => {
            let temp = tempfile::Builder::new()
                .prefix(STAGING_DIR_PREFIX)
                .tempdir()?;
            let path = Utf8PathBuf::from_path_buf(temp.keep()).map_err(|path| {
                std::io::Error::other(format!(
                    "system temp directory is not valid UTF-8: {}",
                    path.display()
                ))
            })?;
            Ok(StagingDir { path, parent: None })
        }
    }
}

/// Create a uniquely named directory directly beneath the held parent
/// handle.
///
/// The creation primitive is bound to the handle, so it is immune to the
/// parent path being replaced after validation. After creation the parent
/// identity is re-checked; on mismatch the just-created directory is removed
/// again and the candidate fails.
#[cfg(unix)]
fn create_in_verified_parent(state: &ParentDirState) -> Result<Utf8PathBuf> {
    use std::ffi::CString;
    use std::os::fd::AsRawFd;

    let parent_fd = state.handle().as_raw_fd();

    for _ in 0..NAME_ATTEMPTS {
        let name = random_dir_name();
        let c_name = CString::new(name.clone()).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "NUL in directory name")
        })?;

        // SAFETY: c_name is a valid NUL-terminated string and parent_fd is
        // an open directory descriptor owned by `state`.
        let rc = unsafe { libc::mkdirat(parent_fd, c_name.as_ptr(), 0o700) };
        if rc == 0 {
            if let Err(err) = verify_parent_unchanged(state) {
                // SAFETY: removes the entry just created relative to the
                // same descriptor.
                unsafe {
                    libc::unlinkat(parent_fd, c_name.as_ptr(), libc::AT_REMOVEDIR);
                }
                return Err(err);
            }
            return Ok(state.path().join(name));
        }

        let os_err = std::io::Error::last_os_error();
        if os_err.raw_os_error() == Some(libc::EEXIST) {
            continue;
        }
        return Err(os_err.into());
    }

    Err(WrapperError::StagingExhausted {
        path: state.path().to_owned(),
    })
}

/// Path-based fallback for platforms without directory-relative primitives.
/// Post-creation identity re-validation still runs, but the guarantee is
/// narrower than the fd-bound POSIX variant.
#[cfg(not(unix))]
fn create_in_verified_parent(state: &ParentDirState) -> Result<Utf8PathBuf> {
    let temp = tempfile::Builder::new()
        .prefix(STAGING_DIR_PREFIX)
        .tempdir_in(state.path())?;
    let created = temp.keep();

    if let Err(err) = verify_parent_unchanged(state) {
        let _ = std::fs::remove_dir_all(&created);
        return Err(err);
    }

    Utf8PathBuf::from_path_buf(created).map_err(|path| {
        WrapperError::Io(std::io::Error::other(format!(
            "staging directory path is not valid UTF-8: {}",
            path.display()
        )))
    })
}

#[cfg(unix)]
fn random_dir_name() -> String {
    use std::fmt::Write;

    let suffix: [u8; 8] = rand::random();
    let mut name = String::with_capacity(STAGING_DIR_PREFIX.len() + suffix.len() * 2);
    name.push_str(STAGING_DIR_PREFIX);
    for byte in suffix {
        let _ = write!(name, "{byte:02x}");
    }
    name
}
