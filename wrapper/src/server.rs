//! Materializing and running the bundled server.
//!
//! This is the orchestration layer: verify the embedded archive against its
//! pinned digest, stage a hardened directory, extract the executable into
//! it, then hand the process to the supervisor. The staging directory is
//! held by a guard so every exit path, including errors and cancellation,
//! runs the same cleanup.

use crate::bundle::{BUNDLED_SERVER_VERSION, BundledAsset};
use crate::checksum::verify_archive_checksum;
use crate::child_env::build_child_env;
use crate::dirs::BaseDirs;
use crate::error::{Result, WrapperError};
use crate::extract::extract_executable;
use crate::shutdown::ShutdownToken;
use crate::staging::{StagingDir, create_staging_dir_with_fallback, staging_parent_candidates};
use crate::supervisor::{spawn_server, supervise};
use camino::Utf8Path;
use log::{debug, info};

/// An extracted server executable together with the guard that removes its
/// staging directory on drop.
#[derive(Debug)]
pub struct MaterializedServer {
    executable: camino::Utf8PathBuf,
    // Held for its Drop impl.
    _staging: StagingDir,
}

impl MaterializedServer {
    /// Path of the extracted executable.
    #[must_use]
    pub fn executable(&self) -> &Utf8Path {
        &self.executable
    }
}

/// Verify, stage, and extract the bundled server executable.
///
/// # Errors
///
/// Propagates checksum, staging, and extraction failures; see
/// [`WrapperError`] for the taxonomy.
pub fn materialize_bundled_server(
    asset: &BundledAsset,
    dirs: &dyn BaseDirs,
) -> Result<MaterializedServer> {
    verify_archive_checksum(asset.bytes, asset.archive_name, asset.sha256)?;
    let format = asset.format()?;

    let candidates = staging_parent_candidates(dirs);
    let staging = create_staging_dir_with_fallback(&candidates)?;
    debug!("staging bundled server in {}", staging.path());

    let executable = staging.path().join(asset.executable_name);
    extract_executable(
        asset.bytes,
        format,
        asset.archive_name,
        asset.executable_name,
        &executable,
    )?;
    mark_executable(&executable)?;

    Ok(MaterializedServer {
        executable,
        _staging: staging,
    })
}

/// Materialize and supervise the server bundled for this platform.
///
/// `required_env` carries the credential and passthrough variables; the
/// full child environment additionally includes the allow-listed parent
/// variables. Cancellation before the child starts is honoured without
/// spawning.
///
/// # Errors
///
/// Returns [`WrapperError::NoBundledServer`] when this build carries no
/// archive for the platform, and otherwise propagates materialization,
/// spawn, and supervision failures.
pub fn run_bundled_server(
    required_env: &[(String, String)],
    token: &ShutdownToken,
    dirs: &dyn BaseDirs,
) -> Result<()> {
    let asset = BundledAsset::current().ok_or(WrapperError::NoBundledServer {
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
    })?;

    run_server_from_asset(asset, required_env, token, dirs)
}

fn run_server_from_asset(
    asset: &BundledAsset,
    required_env: &[(String, String)],
    token: &ShutdownToken,
    dirs: &dyn BaseDirs,
) -> Result<()> {
    let server = materialize_bundled_server(asset, dirs)?;

    // Shutdown may have been requested while extraction ran.
    if token.is_cancelled() {
        return Ok(());
    }

    info!(
        "starting bundled {} {}",
        asset.executable_name, BUNDLED_SERVER_VERSION
    );
    let env = build_child_env(required_env);
    let child = spawn_server(server.executable(), &env)?;
    supervise(child, token)
}

#[cfg(unix)]
fn mark_executable(path: &Utf8Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path.as_std_path(), std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn mark_executable(_path: &Utf8Path) -> Result<()> {
    Ok(())
}
