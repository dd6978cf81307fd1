//! Error types for the gh-mcp wrapper.
//!
//! This module defines semantic error variants for every way the wrapper can
//! fail, from bundled-archive integrity problems through staging-directory
//! tampering to child-process exit failures. Each variant carries enough
//! context (asset name, path, expected/actual digest or size) to produce an
//! actionable message without re-deriving it.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing and running the bundled server.
#[derive(Debug, Error)]
pub enum WrapperError {
    /// The bundled archive's SHA-256 digest did not match the pinned value.
    #[error("bundled archive checksum mismatch: archive={archive} expected={expected} actual={actual}")]
    ChecksumMismatch {
        /// Name of the bundled archive.
        archive: &'static str,
        /// The digest pinned at package time.
        expected: String,
        /// The digest computed over the embedded bytes.
        actual: String,
    },

    /// No bundled server archive exists for the current platform.
    #[error("no bundled github-mcp-server for platform: os={os} arch={arch}")]
    NoBundledServer {
        /// The compile-time target operating system.
        os: &'static str,
        /// The compile-time target architecture.
        arch: &'static str,
    },

    /// The bundled archive name has an unrecognized extension.
    #[error("unsupported bundled archive format: archive={archive}")]
    UnsupportedArchiveFormat {
        /// Name of the bundled archive.
        archive: &'static str,
    },

    /// The staging parent directory failed a safety check.
    ///
    /// Non-retryable for the same path; callers fall back to a different
    /// parent candidate instead.
    #[error("staging parent directory {path} is insecure: {reason}")]
    InsecureParent {
        /// The rejected parent directory.
        path: Utf8PathBuf,
        /// Which safety check failed.
        reason: String,
    },

    /// Random staging-directory name attempts were exhausted.
    #[error("staging directory name attempts exhausted in {path}")]
    StagingExhausted {
        /// The parent directory in which creation was attempted.
        path: Utf8PathBuf,
    },

    /// Every staging-parent candidate failed.
    #[error("failed to create staging directory: {attempts}")]
    TempDirCreationFailed {
        /// Joined failure descriptions, one per attempted candidate.
        attempts: String,
    },

    /// The bundled archive container could not be parsed.
    #[error("corrupt bundled archive {archive}: {reason}")]
    CorruptArchive {
        /// Name of the bundled archive.
        archive: &'static str,
        /// Description of the parse failure.
        reason: String,
    },

    /// The named executable was not present in the bundled archive.
    #[error("bundled executable not found in archive: executable={executable} archive={archive}")]
    ExecutableNotFound {
        /// Base name the extractor searched for.
        executable: String,
        /// Name of the bundled archive.
        archive: &'static str,
    },

    /// Archive metadata declared an executable size outside the allowed range.
    #[error("bundled executable has invalid size: executable={executable} size={size} allowed=0-{limit}")]
    InvalidSize {
        /// Base name of the offending entry.
        executable: String,
        /// The declared size.
        size: u64,
        /// The extraction ceiling in bytes.
        limit: u64,
    },

    /// The streamed entry exceeded the extraction ceiling.
    #[error("bundled executable exceeds extraction size limit: executable={executable} limit={limit}")]
    TooLarge {
        /// Base name of the offending entry.
        executable: String,
        /// The extraction ceiling in bytes.
        limit: u64,
    },

    /// An environment value contained bytes that could forge extra entries.
    #[error("environment value for {key} contains a NUL byte or line break")]
    InvalidEnvValue {
        /// The variable whose value was rejected.
        key: String,
    },

    /// No GitHub token is available for the resolved host.
    #[error("not logged in to {host}; set GH_TOKEN or GITHUB_TOKEN")]
    NotLoggedIn {
        /// The host a token was looked up for.
        host: String,
    },

    /// No GitHub host could be resolved.
    #[error("no GitHub host configured")]
    NoHost,

    /// The extracted server binary failed to start.
    #[error("failed to start bundled github-mcp-server: {reason}")]
    ProcessStart {
        /// Description of the spawn failure.
        reason: String,
    },

    /// The server exited with a non-zero status and was not cancelled.
    #[error("server exited with non-zero status: {code}")]
    NonZeroExit {
        /// The child's exit code (128+signal for signal deaths).
        code: i32,
    },

    /// Waiting on the server process failed.
    #[error("failed waiting for github-mcp-server process: {reason}")]
    WaitFailed {
        /// Description of the wait failure.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`WrapperError`].
pub type Result<T> = std::result::Result<T, WrapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_mismatch_names_archive_and_digests() {
        let err = WrapperError::ChecksumMismatch {
            archive: "server_Linux_x86_64.tar.gz",
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let msg = err.to_string();
        assert!(msg.contains("server_Linux_x86_64.tar.gz"));
        assert!(msg.contains(&"aa".repeat(32)));
        assert!(msg.contains(&"bb".repeat(32)));
    }

    #[test]
    fn insecure_parent_includes_path_and_reason() {
        let err = WrapperError::InsecureParent {
            path: Utf8PathBuf::from("/tmp/gh-mcp"),
            reason: "must not be a symbolic link".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/gh-mcp"));
        assert!(msg.contains("symbolic link"));
    }

    #[test]
    fn non_zero_exit_embeds_code() {
        let err = WrapperError::NonZeroExit { code: 9 };
        assert!(err.to_string().contains('9'));
    }

    #[test]
    fn invalid_env_value_names_key() {
        let err = WrapperError::InvalidEnvValue {
            key: "GITHUB_HOST".to_owned(),
        };
        assert!(err.to_string().contains("GITHUB_HOST"));
    }
}
