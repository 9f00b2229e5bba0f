//! Package identity and release URL derivation.
//!
//! The identity comes either from explicit values or from an npm-style
//! `package.json` descriptor. Release URLs are derived from the identity and
//! the resolved platform by plain string concatenation:
//!
//! ```text
//! <host>/<owner>/<name>/releases/download/v<version>/<name>-v<version>-<os>-<arch>.<ext>
//! <artifact url>.sha256
//! ```

use std::path::Path;

use semver::Version;
use serde::Deserialize;

use crate::errors::{InstallerError, Result};
use crate::platform::PlatformTarget;

/// Name and version of the package whose release is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    /// Package (and binary) name.
    pub name: String,
    /// Release version.
    pub version: Version,
}

/// Fields read from a `package.json` descriptor; everything else is ignored.
#[derive(Debug, Deserialize)]
struct PackageDescriptor {
    name: String,
    version: String,
}

impl PackageIdentity {
    /// Creates an identity, validating `version` as semantic version.
    ///
    /// A leading `v` is accepted (`v1.2.3` and `1.2.3` are the same release).
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] for an empty name or an invalid version.
    pub fn new(name: impl Into<String>, version: &str) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InstallerError::config("package name must not be empty"));
        }

        let raw = version.trim();
        let raw = raw.strip_prefix('v').unwrap_or(raw);
        let version = Version::parse(raw).map_err(|e| {
            InstallerError::config(format!("invalid version '{version}' for {name}: {e}"))
        })?;

        Ok(Self { name, version })
    }

    /// Reads `name` and `version` from a `package.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] if the file cannot be read, is not
    /// valid JSON, lacks either field, or carries an invalid version.
    pub fn from_descriptor(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            InstallerError::config(format!(
                "failed to read package descriptor {}: {e}",
                path.display()
            ))
        })?;

        let descriptor: PackageDescriptor = serde_json::from_str(&content).map_err(|e| {
            InstallerError::config(format!(
                "failed to parse package descriptor {}: {e}",
                path.display()
            ))
        })?;

        Self::new(descriptor.name, &descriptor.version)
    }

    /// Release tag, e.g. `v1.2.3`.
    #[must_use]
    pub fn tag(&self) -> String {
        format!("v{}", self.version)
    }
}

/// Download locations of one release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLocation {
    /// URL of the archive.
    pub artifact_url: String,
    /// URL of the plain-text SHA-256 digest of the archive.
    pub checksum_url: String,
}

impl ReleaseLocation {
    /// Derives the artifact and checksum URLs.
    #[must_use]
    pub fn new(host: &str, owner: &str, package: &PackageIdentity, target: &PlatformTarget) -> Self {
        let host = host.trim_end_matches('/');
        let name = &package.name;
        let tag = package.tag();

        let artifact_url = format!(
            "{host}/{owner}/{name}/releases/download/{tag}/{name}-{tag}-{os}-{arch}.{ext}",
            os = target.os,
            arch = target.arch,
            ext = target.archive_format.extension(),
        );
        let checksum_url = format!("{artifact_url}.sha256");

        Self {
            artifact_url,
            checksum_url,
        }
    }

    /// Last path segment of the artifact URL.
    #[must_use]
    pub fn artifact_file_name(&self) -> &str {
        self.artifact_url
            .rsplit('/')
            .next()
            .unwrap_or(&self.artifact_url)
    }
}
