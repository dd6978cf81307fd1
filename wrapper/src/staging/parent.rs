//! Hardening of the staging parent directory.
//!
//! The parent of the staging directory lives in a location shared with other
//! local users (a cache directory, or the system temp root), so it is
//! validated before use and its identity is captured so later steps can
//! detect the directory being swapped out underneath the wrapper. On POSIX
//! systems an open directory handle is held for the lifetime of the staging
//! directory; every subsequent create or remove is performed relative to
//! that handle rather than by re-resolving the path, which closes the
//! time-of-check/time-of-use window that path-based operations would reopen.

use crate::error::{Result, WrapperError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File, Metadata};

/// Validated state of the staging parent directory.
///
/// Holds the captured identity and, on POSIX systems, the open handle that
/// directory-relative operations are bound to. Exclusively owned by the
/// staging-directory creation call until handed to the cleanup guard.
#[derive(Debug)]
pub struct ParentDirState {
    path: Utf8PathBuf,
    identity: DirIdentity,
    #[cfg(unix)]
    handle: File,
}

impl ParentDirState {
    /// The parent directory path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    #[cfg(not(unix))]
    pub(crate) fn identity(&self) -> DirIdentity {
        self.identity
    }

    #[cfg(unix)]
    pub(crate) fn handle(&self) -> &File {
        &self.handle
    }
}

/// Filesystem identity of a directory, robust to delete-and-recreate at the
/// same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DirIdentity {
    #[cfg(unix)]
    device: u64,
    #[cfg(unix)]
    inode: u64,
}

impl DirIdentity {
    #[cfg(unix)]
    fn of(metadata: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        Self {
            device: metadata.dev(),
            inode: metadata.ino(),
        }
    }

    // Identity-by-path is all the std library exposes off POSIX; the
    // re-validation steps still run but only confirm the path is a real
    // directory. Documented as a strictly weaker guarantee.
    #[cfg(not(unix))]
    fn of(_metadata: &Metadata) -> Self {
        Self {}
    }
}

/// Validate or harden `path` as the staging parent and capture its state.
///
/// Creates the directory with mode `0700` when absent. On POSIX the full
/// sequence is: `lstat` and reject symlinks and non-directories; open the
/// directory without following a final-component symlink; `fstat` the handle
/// and require the same identity; require the owner to be the effective
/// user; tighten group/other permission bits through the handle; re-`lstat`
/// and confirm the identity one final time.
///
/// # Errors
///
/// Returns [`WrapperError::InsecureParent`] when any check fails. The error
/// is not retryable for this path; callers fall back to another candidate.
pub fn ensure_secure_parent(path: &Utf8Path) -> Result<ParentDirState> {
    create_parent_dir(path)?;

    let lstat = path.as_std_path().symlink_metadata()?;
    validate_parent_metadata(path, &lstat)?;

    establish(path, &lstat)
}

#[cfg(unix)]
fn establish(path: &Utf8Path, lstat: &Metadata) -> Result<ParentDirState> {
    let handle = open_parent_handle(path)?;

    let handle_meta = handle.metadata()?;
    validate_parent_metadata(path, &handle_meta)?;
    if DirIdentity::of(&handle_meta) != DirIdentity::of(lstat) {
        return Err(changed_while_preparing(path));
    }

    let tightened = tighten_permissions(path, &handle, &handle_meta)?;

    // Guard against a race between the chmod and the caller proceeding.
    let final_lstat = path.as_std_path().symlink_metadata()?;
    validate_parent_metadata(path, &final_lstat)?;
    if DirIdentity::of(&final_lstat) != DirIdentity::of(&tightened) {
        return Err(changed_while_preparing(path));
    }

    Ok(ParentDirState {
        path: path.to_owned(),
        identity: DirIdentity::of(&tightened),
        handle,
    })
}

#[cfg(not(unix))]
fn establish(path: &Utf8Path, lstat: &Metadata) -> Result<ParentDirState> {
    Ok(ParentDirState {
        path: path.to_owned(),
        identity: DirIdentity::of(lstat),
    })
}

/// Re-check that the parent still matches the captured state.
///
/// Called after directory-relative creation and again before cleanup
/// deletion; a mismatch means the parent was swapped and nothing beneath the
/// recorded path can be trusted.
///
/// # Errors
///
/// Returns [`WrapperError::InsecureParent`] when the path no longer resolves
/// to the directory the state was captured from.
pub fn verify_parent_unchanged(state: &ParentDirState) -> Result<()> {
    let current = state.path.as_std_path().symlink_metadata()?;
    validate_parent_metadata(&state.path, &current)?;

    let baseline = baseline_identity(state)?;
    if DirIdentity::of(&current) != baseline {
        return Err(WrapperError::InsecureParent {
            path: state.path.clone(),
            reason: "directory changed while the staging directory was in use".to_owned(),
        });
    }

    Ok(())
}

#[cfg(unix)]
fn baseline_identity(state: &ParentDirState) -> Result<DirIdentity> {
    // Prefer the live handle: it cannot be swapped, unlike the recorded
    // identity of a path.
    Ok(DirIdentity::of(&state.handle.metadata()?))
}

#[cfg(not(unix))]
fn baseline_identity(state: &ParentDirState) -> Result<DirIdentity> {
    Ok(state.identity())
}

fn validate_parent_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<()> {
    if metadata.file_type().is_symlink() {
        return Err(WrapperError::InsecureParent {
            path: path.to_owned(),
            reason: "must not be a symbolic link".to_owned(),
        });
    }
    if !metadata.is_dir() {
        return Err(WrapperError::InsecureParent {
            path: path.to_owned(),
            reason: "not a directory".to_owned(),
        });
    }

    Ok(())
}

fn changed_while_preparing(path: &Utf8Path) -> WrapperError {
    WrapperError::InsecureParent {
        path: path.to_owned(),
        reason: "directory changed while preparing the staging directory".to_owned(),
    }
}

#[cfg(unix)]
fn create_parent_dir(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(path)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_parent_dir(path: &Utf8Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

#[cfg(unix)]
fn open_parent_handle(path: &Utf8Path) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let handle = fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECTORY | libc::O_NOFOLLOW)
        .open(path)?;
    Ok(handle)
}

#[cfg(unix)]
fn tighten_permissions(path: &Utf8Path, handle: &File, handle_meta: &Metadata) -> Result<Metadata> {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};

    // SAFETY: geteuid has no failure modes and touches no shared state.
    let euid = unsafe { libc::geteuid() };
    if handle_meta.uid() != euid {
        return Err(WrapperError::InsecureParent {
            path: path.to_owned(),
            reason: "must be owned by the current user".to_owned(),
        });
    }

    if handle_meta.mode() & 0o077 == 0 {
        return Ok(handle.metadata()?);
    }

    // Chmod through the handle, not the path, so a swapped path cannot
    // redirect the permission change.
    handle.set_permissions(fs::Permissions::from_mode(0o700))?;

    let tightened = handle.metadata()?;
    validate_parent_metadata(path, &tightened)?;
    if tightened.mode() & 0o077 != 0 {
        return Err(WrapperError::InsecureParent {
            path: path.to_owned(),
            reason: format!("permissions are too broad ({:o})", tightened.mode() & 0o777),
        });
    }

    Ok(tightened)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).expect("utf-8 temp path")
    }

    #[test]
    fn creates_missing_parent_with_restrictive_mode() {
        let root = tempfile::tempdir().expect("temp dir");
        let parent = utf8(&root.path().join("gh-mcp"));

        let state = ensure_secure_parent(&parent).expect("establish parent");
        assert_eq!(state.path(), parent);

        let mode = fs::metadata(&parent)
            .expect("stat parent")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn tightens_group_and_other_bits() {
        let root = tempfile::tempdir().expect("temp dir");
        let parent = utf8(&root.path().join("gh-mcp"));
        fs::create_dir(&parent).expect("create parent");
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o770))
            .expect("loosen permissions");

        ensure_secure_parent(&parent).expect("establish parent");

        let mode = fs::metadata(&parent)
            .expect("stat parent")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn rejects_symlinked_parent() {
        let root = tempfile::tempdir().expect("temp dir");
        let target = root.path().join("real");
        fs::create_dir(&target).expect("create target");
        let link = root.path().join("gh-mcp");
        std::os::unix::fs::symlink(&target, &link).expect("create symlink");

        let err = ensure_secure_parent(&utf8(&link)).expect_err("symlink parent");
        assert!(matches!(
            err,
            WrapperError::InsecureParent { ref reason, .. } if reason.contains("symbolic link")
        ));
    }

    #[test]
    fn rejects_regular_file_parent() {
        let root = tempfile::tempdir().expect("temp dir");
        let file_path = root.path().join("gh-mcp");
        fs::write(&file_path, b"not a directory").expect("create file");

        let err = ensure_secure_parent(&utf8(&file_path)).expect_err("file parent");
        // DirBuilder fails with AlreadyExists before the lstat check runs.
        assert!(matches!(
            err,
            WrapperError::Io(_) | WrapperError::InsecureParent { .. }
        ));
    }

    #[test]
    fn verify_detects_replaced_parent() {
        let root = tempfile::tempdir().expect("temp dir");
        let parent = utf8(&root.path().join("gh-mcp"));
        let state = ensure_secure_parent(&parent).expect("establish parent");

        let moved = root.path().join("gh-mcp-moved");
        fs::rename(&parent, &moved).expect("move parent aside");
        fs::create_dir(&parent).expect("recreate parent");

        let err = verify_parent_unchanged(&state).expect_err("replaced parent");
        assert!(matches!(err, WrapperError::InsecureParent { .. }));
    }

    #[test]
    fn verify_accepts_untouched_parent() {
        let root = tempfile::tempdir().expect("temp dir");
        let parent = utf8(&root.path().join("gh-mcp"));
        let state = ensure_secure_parent(&parent).expect("establish parent");

        verify_parent_unchanged(&state).expect("parent unchanged");
    }
}
