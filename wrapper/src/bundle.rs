//! Platform selection for the bundled server archive.
//!
//! Release packaging embeds exactly one compressed archive per build target.
//! This module exposes the asset chosen for the running platform, or `None`
//! when the target has no bundled server, which is an expected condition
//! rather than a bug. The archive bytes are only embedded when the `bundled`
//! feature is enabled; plain builds carry no payload and report the missing
//! asset at runtime.

use crate::error::{Result, WrapperError};

/// The bundled server version the pinned checksums correspond to.
pub const BUNDLED_SERVER_VERSION: &str = "v0.30.3";

/// An embedded, checksummed release archive for one build target.
///
/// Invariant: `bytes` is non-empty and `sha256` is a 64-character hex string
/// whenever an asset exists for the platform.
#[derive(Debug, Clone, Copy)]
pub struct BundledAsset {
    /// File name of the release archive, used in messages and for format
    /// detection.
    pub archive_name: &'static str,
    /// Pinned hex SHA-256 digest of `bytes`.
    pub sha256: &'static str,
    /// Base name of the server executable inside the archive.
    pub executable_name: &'static str,
    /// The embedded archive contents.
    pub bytes: &'static [u8],
}

impl BundledAsset {
    /// Return the asset bundled for the current platform, if any.
    #[must_use]
    pub fn current() -> Option<&'static Self> {
        bundled_asset()
    }

    /// Determine the container format from the archive name.
    ///
    /// # Errors
    ///
    /// Returns [`WrapperError::UnsupportedArchiveFormat`] when the name ends
    /// in neither `.tar.gz` nor `.zip`.
    pub fn format(&self) -> Result<ArchiveFormat> {
        ArchiveFormat::from_archive_name(self.archive_name)
    }
}

/// Container format of a bundled archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// A gzip-compressed tar archive (`.tar.gz`).
    TarGz,
    /// A zip archive (`.zip`).
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from an archive file name.
    ///
    /// # Errors
    ///
    /// Returns [`WrapperError::UnsupportedArchiveFormat`] for any name that
    /// does not end in `.tar.gz` or `.zip`.
    pub fn from_archive_name(archive_name: &'static str) -> Result<Self> {
        if archive_name.ends_with(".tar.gz") {
            Ok(Self::TarGz)
        } else if archive_name.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(WrapperError::UnsupportedArchiveFormat {
                archive: archive_name,
            })
        }
    }
}

#[cfg(all(feature = "bundled", target_os = "linux", target_arch = "x86_64"))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    static ASSET: BundledAsset = BundledAsset {
        archive_name: "github-mcp-server_Linux_x86_64.tar.gz",
        sha256: "05b2aae64fa08b03b4956f162dc4ce6e8c69f12fb4119c95e87452f647cb918a",
        executable_name: "github-mcp-server",
        bytes: include_bytes!("../bundled/github-mcp-server_Linux_x86_64.tar.gz"),
    };
    Some(&ASSET)
}

#[cfg(all(feature = "bundled", target_os = "linux", target_arch = "aarch64"))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    static ASSET: BundledAsset = BundledAsset {
        archive_name: "github-mcp-server_Linux_arm64.tar.gz",
        sha256: "42b8ffc305aaa8a1956b8de107e21af2514c9c71181688dba21ffda859bbeff7",
        executable_name: "github-mcp-server",
        bytes: include_bytes!("../bundled/github-mcp-server_Linux_arm64.tar.gz"),
    };
    Some(&ASSET)
}

#[cfg(all(feature = "bundled", target_os = "macos", target_arch = "x86_64"))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    static ASSET: BundledAsset = BundledAsset {
        archive_name: "github-mcp-server_Darwin_x86_64.tar.gz",
        sha256: "3b5dcf0458600b06f03401166fe0f6b815bf6e380bdfba157d0d960ff63e16ed",
        executable_name: "github-mcp-server",
        bytes: include_bytes!("../bundled/github-mcp-server_Darwin_x86_64.tar.gz"),
    };
    Some(&ASSET)
}

#[cfg(all(feature = "bundled", target_os = "macos", target_arch = "aarch64"))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    static ASSET: BundledAsset = BundledAsset {
        archive_name: "github-mcp-server_Darwin_arm64.tar.gz",
        sha256: "6a9b0a548962b1fb78bdb46deb2001ecdbaa8fe9c1a0a2f2f4bc44af2b03a426",
        executable_name: "github-mcp-server",
        bytes: include_bytes!("../bundled/github-mcp-server_Darwin_arm64.tar.gz"),
    };
    Some(&ASSET)
}

#[cfg(all(feature = "bundled", target_os = "windows", target_arch = "x86_64"))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    static ASSET: BundledAsset = BundledAsset {
        archive_name: "github-mcp-server_Windows_x86_64.zip",
        sha256: "e79e653c85cd171d6fbe0e1e368e0e555e2c0a0d6edb07a5ab4b9e15826ff0f1",
        executable_name: "github-mcp-server.exe",
        bytes: include_bytes!("../bundled/github-mcp-server_Windows_x86_64.zip"),
    };
    Some(&ASSET)
}

#[cfg(not(all(
    feature = "bundled",
    any(
        all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")),
        all(target_os = "macos", any(target_arch = "x86_64", target_arch = "aarch64")),
        all(target_os = "windows", target_arch = "x86_64"),
    )
)))]
fn bundled_asset() -> Option<&'static BundledAsset> {
    None
}
