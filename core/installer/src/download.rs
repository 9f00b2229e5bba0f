//! Streaming artifact download into a spool file.
//!
//! The body of the artifact response is consumed chunk by chunk. Each chunk
//! is written to the spool file and fed to a [`DigestSink`](crate::verify::DigestSink) in the same loop
//! iteration, so the digest always covers exactly the bytes received.
//!
//! There is no retry: a failed download fails the install and the caller
//! decides whether to run it again.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use log::debug;
use tokio::io::AsyncWriteExt;

use crate::errors::{InstallerError, Result, TransportError};
use crate::transport::HttpTransport;
use crate::verify;

/// Progress event emitted while the artifact is downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The artifact response arrived.
    Started {
        /// Final URL of the artifact.
        url: String,
        /// Total size in bytes, `0` when the server sent no `Content-Length`.
        total: u64,
    },
    /// More bytes were received.
    Progress {
        /// Bytes received so far.
        downloaded: u64,
        /// Average speed in bytes per second.
        speed: u64,
    },
    /// The whole body was received.
    Completed,
}

/// Callback type for receiving download progress.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Minimum interval between progress callback invocations in milliseconds.
const PROGRESS_CALLBACK_INTERVAL_MS: u128 = 100;

/// Result of a completed spool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpooledArtifact {
    /// Where the raw archive bytes were written.
    pub path: PathBuf,
    /// Number of bytes received.
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the received bytes.
    pub digest: String,
}

/// Path of the spool file for `artifact_file_name` inside `target_dir`.
#[must_use]
pub fn spool_path(target_dir: &Path, artifact_file_name: &str) -> PathBuf {
    target_dir.join(format!(".{artifact_file_name}.download"))
}

/// Downloads `url` into `dest`, hashing every chunk on the way.
///
/// `dest` is created or truncated. On error the partially written file is
/// left for the caller to remove.
///
/// # Errors
///
/// - [`InstallerError::Transport`] if the request or a body read fails
/// - [`InstallerError::Io`] if the spool file cannot be written
pub async fn spool_artifact(
    transport: &HttpTransport,
    url: &str,
    dest: &Path,
    callback: Option<&ProgressCallback>,
) -> Result<SpooledArtifact> {
    let response = transport.fetch(url).await?;
    let total_size = response.content_length().unwrap_or(0);

    if let Some(cb) = callback {
        cb(ProgressEvent::Started {
            url: response.url().to_string(),
            total: total_size,
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| InstallerError::io(format!("failed to create {}", dest.display()), e))?;

    let mut sink = verify::start_digest();
    let mut stream = response.bytes_stream();
    let start_time = Instant::now();
    let mut last_callback_time = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransportError::from_reqwest(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| InstallerError::io(format!("failed to write {}", dest.display()), e))?;
        sink.update(&chunk);

        if let Some(cb) = callback {
            let now = Instant::now();
            if now.duration_since(last_callback_time).as_millis() >= PROGRESS_CALLBACK_INTERVAL_MS {
                cb(ProgressEvent::Progress {
                    downloaded: sink.bytes_consumed(),
                    speed: average_speed(sink.bytes_consumed(), start_time),
                });
                last_callback_time = now;
            }
        }
    }

    file.flush()
        .await
        .map_err(|e| InstallerError::io(format!("failed to flush {}", dest.display()), e))?;

    let bytes = sink.bytes_consumed();
    if let Some(cb) = callback {
        cb(ProgressEvent::Progress {
            downloaded: bytes,
            speed: average_speed(bytes, start_time),
        });
        cb(ProgressEvent::Completed);
    }

    debug!("spooled {bytes} bytes from {url} to {}", dest.display());

    Ok(SpooledArtifact {
        path: dest.to_path_buf(),
        bytes,
        digest: verify::finalize(sink),
    })
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn average_speed(downloaded: u64, start_time: Instant) -> u64 {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    if elapsed_secs > 0.0 {
        (downloaded as f64 / elapsed_secs) as u64
    } else {
        0
    }
}

/// Formats bytes into a human-readable string (KB, MB, GB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a speed in bytes per second.
#[must_use]
pub fn format_speed(speed: u64) -> String {
    format!("{}/s", format_bytes(speed))
}
