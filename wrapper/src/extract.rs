//! Bounded extraction of the server executable from the bundled archive.
//!
//! The archive is treated as adversarial input even though its checksum was
//! verified: a valid digest only proves the bytes are what the publisher
//! shipped, not that the publisher's build pipeline was flawless. Entry sizes
//! are validated from metadata before any copy, and the streaming copy
//! enforces the same ceiling independently because tar and zip headers can
//! under-report.

use crate::bundle::ArchiveFormat;
use crate::error::{Result, WrapperError};
use camino::Utf8Path;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Cursor, Read};

/// Ceiling on the decompressed executable size (64 MiB).
pub const MAX_EXECUTABLE_BYTES: u64 = 64 << 20;

/// Extract the first regular entry whose base name equals `executable_name`
/// into `output_path`, truncating any existing content.
///
/// Entry names are matched ignoring directory components; archive paths may
/// use either separator convention. Scanning stops at the first match.
///
/// # Errors
///
/// Returns [`WrapperError::CorruptArchive`] for malformed containers,
/// [`WrapperError::InvalidSize`] when metadata declares an entry over the
/// ceiling, [`WrapperError::TooLarge`] when the streamed bytes exceed it,
/// and [`WrapperError::ExecutableNotFound`] when no entry matches.
pub fn extract_executable(
    archive: &[u8],
    format: ArchiveFormat,
    archive_name: &'static str,
    executable_name: &str,
    output_path: &Utf8Path,
) -> Result<()> {
    match format {
        ArchiveFormat::TarGz => {
            extract_tar_gz(archive, archive_name, executable_name, output_path)
        }
        ArchiveFormat::Zip => extract_zip(archive, archive_name, executable_name, output_path),
    }
}

fn extract_tar_gz(
    archive: &[u8],
    archive_name: &'static str,
    executable_name: &str,
    output_path: &Utf8Path,
) -> Result<()> {
    let decoder = GzDecoder::new(Cursor::new(archive));
    let mut container = tar::Archive::new(decoder);

    let entries = container
        .entries()
        .map_err(|e| corrupt(archive_name, &e))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| corrupt(archive_name, &e))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        if base_name(&name) != executable_name {
            continue;
        }

        let size = entry
            .header()
            .size()
            .map_err(|e| corrupt(archive_name, &e))?;
        validate_declared_size(size, executable_name)?;

        let mut output = create_output_file(output_path)?;
        copy_limited(
            &mut entry,
            &mut output,
            MAX_EXECUTABLE_BYTES,
            executable_name,
            output_path,
        )?;

        return Ok(());
    }

    Err(WrapperError::ExecutableNotFound {
        executable: executable_name.to_owned(),
        archive: archive_name,
    })
}

fn extract_zip(
    archive: &[u8],
    archive_name: &'static str,
    executable_name: &str,
    output_path: &Utf8Path,
) -> Result<()> {
    let mut container = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| corrupt(archive_name, &e))?;

    for index in 0..container.len() {
        let mut entry = container
            .by_index(index)
            .map_err(|e| corrupt(archive_name, &e))?;

        if !entry.is_file() {
            continue;
        }
        if base_name(entry.name()) != executable_name {
            continue;
        }

        validate_declared_size(entry.size(), executable_name)?;

        let mut output = create_output_file(output_path)?;
        copy_limited(
            &mut entry,
            &mut output,
            MAX_EXECUTABLE_BYTES,
            executable_name,
            output_path,
        )?;

        return Ok(());
    }

    Err(WrapperError::ExecutableNotFound {
        executable: executable_name.to_owned(),
        archive: archive_name,
    })
}

/// Reject declared sizes over the extraction ceiling before any copy work.
fn validate_declared_size(size: u64, executable_name: &str) -> Result<()> {
    if size > MAX_EXECUTABLE_BYTES {
        return Err(WrapperError::InvalidSize {
            executable: executable_name.to_owned(),
            size,
            limit: MAX_EXECUTABLE_BYTES,
        });
    }

    Ok(())
}

/// Copy at most `limit + 1` bytes from `src` into `dst`.
///
/// Copying one byte past the limit distinguishes "exactly at the ceiling"
/// from "over it" without reading an unbounded stream. When the copied count
/// exceeds `limit` the partial output file is removed so a failure never
/// leaves a truncated file that could be mistaken for a valid executable.
fn copy_limited(
    src: &mut dyn Read,
    dst: &mut File,
    limit: u64,
    executable_name: &str,
    output_path: &Utf8Path,
) -> Result<()> {
    let mut bounded = src.take(limit.saturating_add(1));
    let copied = io::copy(&mut bounded, dst)?;

    if copied > limit {
        let _ = std::fs::remove_file(output_path);
        return Err(WrapperError::TooLarge {
            executable: executable_name.to_owned(),
            limit,
        });
    }

    Ok(())
}

/// Base name of an archive entry path, splitting on both separator
/// conventions.
fn base_name(entry_path: &str) -> &str {
    entry_path
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(entry_path)
}

#[cfg(unix)]
fn create_output_file(output_path: &Utf8Path) -> Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .mode(0o700)
        .open(output_path)?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_output_file(output_path: &Utf8Path) -> Result<File> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(output_path)?;
    Ok(file)
}

fn corrupt(archive_name: &'static str, error: &dyn std::fmt::Display) -> WrapperError {
    WrapperError::CorruptArchive {
        archive: archive_name,
        reason: error.to_string(),
    }
}
