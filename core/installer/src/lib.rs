#![warn(clippy::pedantic)]

//! # Release Installer
//!
//! Fetches the platform release archive of a package from a GitHub-style
//! release host, checks it against the published SHA-256, unpacks the binary
//! and runs it with the caller's arguments and standard streams.
//!
//! ## Modules
//!
//! - [`platform`] - OS/architecture resolution to a release target
//! - [`package`] - Package identity and release URL derivation
//! - [`config`] - Installer settings and environment overrides
//! - [`transport`] - HTTP GET with explicit redirect handling
//! - [`download`] - Streaming artifact spool with progress events
//! - [`verify`] - SHA-256 digest and checksum comparison
//! - [`archive`] - tar.gz and zip extraction, permissions, launcher
//! - [`installer`] - Install pipeline and binary execution
//! - [`errors`] - Error types
//!
//! ## Example
//!
//! ```no_run
//! use release_installer::{Installer, InstallerConfig, PackageIdentity};
//!
//! # async fn install() -> release_installer::Result<()> {
//! let package = PackageIdentity::new("couper", "1.2.3")?;
//! let config = InstallerConfig::new(package, "bin").apply_env()?;
//! let mut installer = Installer::new(config)?;
//! installer.install().await?;
//! let code = installer.run(["version"])?;
//! # let _ = code;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod download;
pub mod errors;
pub mod installer;
pub mod package;
pub mod platform;
pub mod transport;
pub mod verify;

pub use config::InstallerConfig;
pub use download::{ProgressCallback, ProgressEvent};
pub use errors::{InstallerError, Result, TransportError};
pub use installer::{InstallPhase, InstallState, InstalledBinary, Installer};
pub use package::{PackageIdentity, ReleaseLocation};
pub use platform::{Arch, ArchiveFormat, DistributionChannel, Os, PlatformTarget};
