//! Installer configuration.
//!
//! Everything the orchestrator needs is passed in once through
//! [`InstallerConfig`]; nothing is re-read during an install. Environment
//! variables can override the release host, owner, target directory and
//! request timeout, which is how mirrors and local test servers are used.
//!
//! ## Environment Variables
//!
//! - `RELEASE_SHIM_HOST` - release host base URL
//! - `RELEASE_SHIM_OWNER` - repository owner path segment
//! - `RELEASE_SHIM_DIR` - target directory for the binary
//! - `RELEASE_SHIM_TIMEOUT_SECS` - request timeout in seconds
//!
//! Empty or whitespace-only values are ignored.

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::{InstallerError, Result};
use crate::package::PackageIdentity;
use crate::platform::DistributionChannel;

/// Environment variable overriding the release host.
pub const HOST_ENV: &str = "RELEASE_SHIM_HOST";

/// Environment variable overriding the repository owner.
pub const OWNER_ENV: &str = "RELEASE_SHIM_OWNER";

/// Environment variable overriding the target directory.
pub const DIR_ENV: &str = "RELEASE_SHIM_DIR";

/// Environment variable overriding the request timeout (seconds).
pub const TIMEOUT_ENV: &str = "RELEASE_SHIM_TIMEOUT_SECS";

/// Default release host.
pub const DEFAULT_RELEASE_HOST: &str = "https://github.com";

/// Default repository owner.
pub const DEFAULT_OWNER: &str = "coupergateway";

/// Default overall request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_mins(5);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default redirect hop limit.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Settings for one installer instance.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Package to install.
    pub package: PackageIdentity,
    /// Base URL of the release host.
    pub release_host: String,
    /// Repository owner on the release host.
    pub owner: String,
    /// Directory that receives the binary.
    pub target_dir: PathBuf,
    /// Distribution channel used for platform resolution.
    pub channel: DistributionChannel,
    /// Overall timeout for each request, body included.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Maximum number of redirects followed per fetch.
    pub max_redirects: usize,
}

impl InstallerConfig {
    /// Creates a configuration with defaults for everything but the package
    /// and the target directory.
    #[must_use]
    pub fn new(package: PackageIdentity, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            package,
            release_host: DEFAULT_RELEASE_HOST.to_string(),
            owner: DEFAULT_OWNER.to_string(),
            target_dir: target_dir.into(),
            channel: DistributionChannel::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Sets the release host base URL.
    #[must_use]
    pub fn with_release_host(mut self, host: impl Into<String>) -> Self {
        self.release_host = host.into();
        self
    }

    /// Sets the repository owner.
    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Sets the target directory.
    #[must_use]
    pub fn with_target_dir(mut self, target_dir: impl Into<PathBuf>) -> Self {
        self.target_dir = target_dir.into();
        self
    }

    /// Sets the distribution channel.
    #[must_use]
    pub fn with_channel(mut self, channel: DistributionChannel) -> Self {
        self.channel = channel;
        self
    }

    /// Sets the overall request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the redirect hop limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Applies the `RELEASE_SHIM_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] if `RELEASE_SHIM_TIMEOUT_SECS` is
    /// set but not a positive integer.
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(host) = env_override(HOST_ENV) {
            self.release_host = host;
        }
        if let Some(owner) = env_override(OWNER_ENV) {
            self.owner = owner;
        }
        if let Some(dir) = env_override(DIR_ENV) {
            self.target_dir = PathBuf::from(dir);
        }
        if let Some(secs) = env_override(TIMEOUT_ENV) {
            self.request_timeout = parse_timeout_secs(&secs)?;
        }
        Ok(self)
    }

    /// Path the binary is installed to, given its file name.
    #[must_use]
    pub fn binary_path(&self, binary_filename: &str) -> PathBuf {
        self.target_dir.join(binary_filename)
    }
}

/// Reads a non-blank environment variable.
#[must_use]
pub fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses a timeout given in whole seconds.
///
/// # Errors
///
/// Returns [`InstallerError::Config`] for zero or non-numeric input.
pub fn parse_timeout_secs(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(InstallerError::config(format!(
            "timeout must be a positive number of seconds, got '{raw}'"
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InstallerConfig {
        let package = PackageIdentity::new("couper", "1.2.3").expect("Should parse");
        InstallerConfig::new(package, "/tmp/couper-bin")
    }

    fn clear_env() {
        for key in [HOST_ENV, OWNER_ENV, DIR_ENV, TIMEOUT_ENV] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn defaults_match_public_release_host() {
        let cfg = config();
        assert_eq!(cfg.release_host, "https://github.com");
        assert_eq!(cfg.owner, "coupergateway");
        assert_eq!(cfg.max_redirects, 10);
        assert_eq!(cfg.request_timeout, Duration::from_mins(5));
        assert_eq!(cfg.channel, DistributionChannel::Package);
    }

    #[test]
    fn binary_path_joins_target_dir() {
        let cfg = config();
        assert_eq!(cfg.binary_path("couper"), PathBuf::from("/tmp/couper-bin/couper"));
    }

    #[test]
    fn parse_timeout_rejects_zero_and_garbage() {
        assert!(parse_timeout_secs("0").is_err());
        assert!(parse_timeout_secs("soon").is_err());
        assert_eq!(
            parse_timeout_secs(" 45 ").expect("Should parse"),
            Duration::from_secs(45)
        );
    }

    #[test]
    #[serial_test::serial]
    fn apply_env_keeps_defaults_when_unset() {
        clear_env();
        let cfg = config().apply_env().expect("Should apply");
        assert_eq!(cfg.release_host, DEFAULT_RELEASE_HOST);
        assert_eq!(cfg.target_dir, PathBuf::from("/tmp/couper-bin"));
    }

    #[test]
    #[serial_test::serial]
    fn apply_env_overrides_host_owner_dir_and_timeout() {
        clear_env();
        unsafe {
            std::env::set_var(HOST_ENV, "http://localhost:8080");
            std::env::set_var(OWNER_ENV, "mirror");
            std::env::set_var(DIR_ENV, "/opt/couper");
            std::env::set_var(TIMEOUT_ENV, "12");
        }

        let cfg = config().apply_env().expect("Should apply");
        clear_env();

        assert_eq!(cfg.release_host, "http://localhost:8080");
        assert_eq!(cfg.owner, "mirror");
        assert_eq!(cfg.target_dir, PathBuf::from("/opt/couper"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(12));
    }

    #[test]
    #[serial_test::serial]
    fn apply_env_ignores_whitespace_only_values() {
        clear_env();
        unsafe { std::env::set_var(HOST_ENV, "   ") };
        let cfg = config().apply_env().expect("Should apply");
        clear_env();
        assert_eq!(cfg.release_host, DEFAULT_RELEASE_HOST);
    }

    #[test]
    #[serial_test::serial]
    fn apply_env_rejects_bad_timeout() {
        clear_env();
        unsafe { std::env::set_var(TIMEOUT_ENV, "-1") };
        let result = config().apply_env();
        clear_env();
        assert!(result.is_err());
    }
}
