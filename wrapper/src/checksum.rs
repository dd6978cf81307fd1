//! Integrity verification for the bundled archive.
//!
//! The embedded archive is hashed in full and compared against the digest
//! pinned at package time before any extraction work begins. A matching
//! digest proves the bytes are what the publisher shipped; it does not make
//! the archive contents trustworthy, which is why the extractor still treats
//! them as adversarial input.

use crate::error::{Result, WrapperError};
use sha2::{Digest, Sha256};

/// Verify the SHA-256 digest of `archive` against `expected_hex`.
///
/// The comparison is case-insensitive on `expected_hex`. This is a pure
/// function with no I/O.
///
/// # Errors
///
/// Returns [`WrapperError::ChecksumMismatch`] when the computed digest does
/// not match, carrying both digests for the user-facing message.
pub fn verify_archive_checksum(
    archive: &[u8],
    archive_name: &'static str,
    expected_hex: &str,
) -> Result<()> {
    let actual = hex_digest(archive);

    if !actual.eq_ignore_ascii_case(expected_hex) {
        return Err(WrapperError::ChecksumMismatch {
            archive: archive_name,
            expected: expected_hex.to_owned(),
            actual,
        });
    }

    Ok(())
}

/// Compute the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
