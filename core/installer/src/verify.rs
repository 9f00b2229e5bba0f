//! SHA-256 integrity checks for release artifacts.
//!
//! The digest is computed over the raw archive bytes as they arrive from the
//! network, never over extracted files. The expected value is the trimmed
//! text body of `<artifact url>.sha256` and is compared byte for byte with
//! the lowercase hex digest.

use std::io::{Read, Write};
use std::path::Path;

use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::errors::{InstallerError, Result};
use crate::transport::HttpTransport;

/// Incremental SHA-256 accumulator fed with artifact chunks.
#[derive(Debug, Clone, Default)]
pub struct DigestSink {
    hasher: Sha256,
    bytes: u64,
}

impl DigestSink {
    /// Feeds a chunk into the digest.
    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes
    }
}

impl Write for DigestSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Starts a new digest.
#[must_use]
pub fn start_digest() -> DigestSink {
    DigestSink::default()
}

/// Consumes the sink and returns the lowercase hex digest.
#[must_use]
pub fn finalize(sink: DigestSink) -> String {
    debug!("digest finalized over {} bytes", sink.bytes);
    hex::encode(sink.hasher.finalize())
}

/// Fetches the published digest and trims surrounding whitespace.
///
/// # Errors
///
/// Returns [`InstallerError::Transport`] if the checksum file cannot be fetched.
pub async fn fetch_expected_digest(transport: &HttpTransport, checksum_url: &str) -> Result<String> {
    let text = transport.fetch_text(checksum_url).await?;
    Ok(text.trim().to_string())
}

/// Compares `actual` against `expected`.
///
/// The comparison is exact and case-sensitive. On mismatch the file at
/// `binary_path` is removed (if present) so that no unverified binary stays
/// usable.
///
/// # Errors
///
/// - [`InstallerError::ChecksumMismatch`] when the digests differ
/// - [`InstallerError::Io`] when the binary exists but cannot be removed
pub fn check_digest(
    actual: &str,
    expected: &str,
    checksum_url: &str,
    binary_path: &Path,
) -> Result<()> {
    if actual == expected {
        return Ok(());
    }

    if binary_path.exists() {
        warn!(
            "checksum mismatch, removing {}",
            binary_path.display()
        );
        std::fs::remove_file(binary_path).map_err(|e| {
            InstallerError::io(
                format!("failed to remove unverified binary {}", binary_path.display()),
                e,
            )
        })?;
    }

    Err(InstallerError::checksum_mismatch(checksum_url, expected, actual))
}

/// Fetches the published digest for `checksum_url` and checks `actual`
/// against it, removing `binary_path` on mismatch.
///
/// # Errors
///
/// See [`fetch_expected_digest`] and [`check_digest`].
pub async fn verify(
    transport: &HttpTransport,
    actual: &str,
    checksum_url: &str,
    binary_path: &Path,
) -> Result<()> {
    let expected = fetch_expected_digest(transport, checksum_url).await?;
    check_digest(actual, &expected, checksum_url, binary_path)
}

/// Computes the SHA-256 of a file on disk as lowercase hex.
///
/// # Errors
///
/// Returns [`InstallerError::Io`] if the file cannot be opened or read.
pub fn compute_sha256(file_path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(file_path).map_err(|e| {
        InstallerError::io(
            format!("failed to open file for checksum: {}", file_path.display()),
            e,
        )
    })?;

    let mut sink = start_digest();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| {
            InstallerError::io(
                format!("failed to read file for checksum: {}", file_path.display()),
                e,
            )
        })?;

        if bytes_read == 0 {
            break;
        }

        sink.update(&buffer[..bytes_read]);
    }

    Ok(finalize(sink))
}
