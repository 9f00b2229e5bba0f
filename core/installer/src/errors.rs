//! Error types for the release installer.
//!
//! `InstallerError` is what every public operation returns. Transport
//! failures get their own enum so callers can tell a refused connection
//! apart from an HTTP status without parsing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Failure while talking to the release host.
#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, TLS, connection or body read failure.
    #[error("network error while fetching {url}: {source}")]
    Network {
        /// URL that was being fetched.
        url: String,
        /// The underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The request did not finish within the configured timeout.
    #[error("request timed out while fetching {url}")]
    Timeout {
        /// URL that was being fetched.
        url: String,
    },

    /// The server answered with a status that is neither success nor a
    /// followable redirect.
    #[error("HTTP {status} while fetching {url}")]
    Status {
        /// URL that produced the status.
        url: String,
        /// Numeric HTTP status code.
        status: u16,
    },

    /// More redirects than `limit` were chained.
    #[error("too many redirects (limit {limit}) while fetching {url}")]
    TooManyRedirects {
        /// URL that started the chain.
        url: String,
        /// Configured hop limit.
        limit: usize,
    },

    /// A URL or `Location` header could not be parsed.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parser message.
        message: String,
    },
}

impl TransportError {
    /// Maps a client error for `url` onto `Timeout` or `Network`.
    #[must_use]
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }
}

/// Consolidated error type for install and run operations.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// No artifact exists for this OS/architecture combination.
    #[error(
        "Sorry, {package} is not available for your platform: {os}/{arch}. \
         Supported platforms are linux, windows (and macos via Homebrew) on amd64 and arm64"
    )]
    UnsupportedPlatform {
        /// Package being installed.
        package: String,
        /// Raw OS identifier as reported by the environment.
        os: String,
        /// Raw architecture identifier as reported by the environment.
        arch: String,
    },

    /// macOS is not served through the package download channel.
    #[error(
        "{package} release archives are not distributed for macOS through this package. \
         Install it with Homebrew instead: brew install {package}"
    )]
    MacosNotDistributed {
        /// Package being installed.
        package: String,
    },

    /// Fetching the artifact or its checksum failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The artifact digest does not match the published checksum.
    #[error("bad checksum for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum URL the expected value came from.
        url: String,
        /// Published digest (trimmed).
        expected: String,
        /// Digest of the received bytes.
        actual: String,
    },

    /// The archive is malformed, unsupported or lacks the binary.
    #[error("extraction failed for {archive}: {message}")]
    Extraction {
        /// Archive name or path.
        archive: String,
        /// What went wrong.
        message: String,
    },

    /// `run` was called before a successful install.
    #[error("{package} is not installed at {}. Please install it first: release-shim install", path.display())]
    NotInstalled {
        /// Package that is missing.
        package: String,
        /// Where the binary was expected.
        path: PathBuf,
    },

    /// The installed binary could not be started.
    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        /// Binary that failed to start.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid package identity, descriptor or settings.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// Local filesystem failure.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl InstallerError {
    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub fn unsupported_platform(
        package: impl Into<String>,
        os: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self::UnsupportedPlatform {
            package: package.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Creates a new `MacosNotDistributed` error.
    #[must_use]
    pub fn macos_not_distributed(package: impl Into<String>) -> Self {
        Self::MacosNotDistributed {
            package: package.into(),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(
        url: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            url: url.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `Extraction` error.
    #[must_use]
    pub fn extraction(archive: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: message.into(),
        }
    }

    /// Creates a new `NotInstalled` error.
    #[must_use]
    pub fn not_installed(package: impl Into<String>, path: PathBuf) -> Self {
        Self::NotInstalled {
            package: package.into(),
            path,
        }
    }

    /// Creates a new `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns whether re-running the whole install may succeed.
    ///
    /// Only transport failures are worth retrying; everything else needs a
    /// change on the caller's side first.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result alias used throughout the installer.
pub type Result<T> = std::result::Result<T, InstallerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_platform_names_the_combination() {
        let err = InstallerError::unsupported_platform("couper", "SunOS", "sparc");
        let msg = err.to_string();
        assert!(msg.contains("couper"));
        assert!(msg.contains("SunOS/sparc"));
    }

    #[test]
    fn macos_message_points_to_homebrew() {
        let err = InstallerError::macos_not_distributed("couper");
        let msg = err.to_string();
        assert!(msg.contains("brew install couper"));
        assert!(!msg.contains("not available for your platform"));
    }

    #[test]
    fn checksum_mismatch_displays_url_and_both_values() {
        let err = InstallerError::checksum_mismatch("https://h/a.tar.gz.sha256", "abc", "def");
        assert_eq!(
            err.to_string(),
            "bad checksum for https://h/a.tar.gz.sha256: expected abc, got def"
        );
    }

    #[test]
    fn not_installed_tells_the_caller_to_install() {
        let err = InstallerError::not_installed("couper", PathBuf::from("/opt/bin/couper"));
        let msg = err.to_string();
        assert!(msg.contains("/opt/bin/couper"));
        assert!(msg.contains("install it first"));
    }

    #[test]
    fn transport_status_is_transparent() {
        let err: InstallerError = TransportError::Status {
            url: "https://h/x".to_string(),
            status: 404,
        }
        .into();
        assert_eq!(err.to_string(), "HTTP 404 while fetching https://h/x");
        assert!(err.is_retryable());
    }

    #[test]
    fn only_transport_errors_are_retryable() {
        assert!(!InstallerError::config("bad").is_retryable());
        assert!(!InstallerError::checksum_mismatch("u", "a", "b").is_retryable());
        assert!(!InstallerError::extraction("a.zip", "broken").is_retryable());
    }

    #[test]
    fn too_many_redirects_displays_limit() {
        let err = TransportError::TooManyRedirects {
            url: "https://h/start".to_string(),
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "too many redirects (limit 10) while fetching https://h/start"
        );
    }
}
