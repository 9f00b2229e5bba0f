//! Install and run orchestration.
//!
//! ## Install Pipeline
//!
//! 1. **Prepare** - Create the target directory
//! 2. **Download** - Stream the artifact into a spool file, hashing each chunk
//! 3. **Verify** - Fetch `<artifact>.sha256` and compare; a mismatch removes
//!    any binary already at the install path
//! 4. **Extract** - Unpack the verified spool into the target directory
//! 5. **Finish** - Restore the executable bit and, on Windows, add the launcher
//!
//! The spool is removed whatever the outcome. Nothing is extracted before
//! the digest has been checked, so a failed or mismatching checksum never
//! leaves a fresh unverified binary behind. If extraction or the finish
//! step fails, the binary and launcher written so far are removed again.
//!
//! Running two installs against the same target directory at the same time
//! is unsupported.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info, warn};

use crate::archive;
use crate::config::InstallerConfig;
use crate::download::{self, ProgressCallback};
use crate::errors::{InstallerError, Result};
use crate::package::ReleaseLocation;
use crate::platform::{DistributionChannel, PlatformTarget};
use crate::transport::HttpTransport;
use crate::verify;

/// Where an install currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// `install` has not been called.
    NotStarted,
    /// The artifact is being streamed and hashed.
    Downloading,
    /// The published checksum is being fetched and compared.
    Verifying,
    /// The verified archive is being unpacked.
    Extracting,
    /// The binary is in place and executable.
    Installed,
    /// The last install attempt failed.
    Failed,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Extracting => "extracting",
            Self::Installed => "installed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Filesystem side of an install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallState {
    /// Directory receiving the binary.
    pub target_dir: PathBuf,
    /// Full path of the binary.
    pub binary_path: PathBuf,
    /// Set only after verification, extraction and the permission fix-up.
    pub installed: bool,
}

/// A binary expected at a fixed path, installed or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    package: String,
    path: PathBuf,
}

impl InstalledBinary {
    /// Locates the binary of `package` in `target_dir` for the running
    /// platform.
    ///
    /// Only the binary file name matters here, so every platform the release
    /// host publishes for is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] if the running
    /// platform has no release artifacts at all.
    pub fn locate(package: &str, target_dir: &Path) -> Result<Self> {
        let target = PlatformTarget::detect(package, DistributionChannel::Direct)?;
        Ok(Self::new(package, target_dir.join(&target.binary_filename)))
    }

    /// Wraps an explicit binary path.
    #[must_use]
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            package: package.into(),
            path: path.into(),
        }
    }

    /// Path of the binary.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns whether the binary exists on disk.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.path.is_file()
    }

    /// Runs the binary with `args`, inheriting stdio and the working
    /// directory, and waits for it.
    ///
    /// Returns the child's exit code. A child killed by a signal has no exit
    /// code and reports `1`.
    ///
    /// # Errors
    ///
    /// - [`InstallerError::NotInstalled`] if the binary does not exist
    /// - [`InstallerError::Spawn`] if the process cannot be started
    pub fn run<I, S>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if !self.is_installed() {
            return Err(InstallerError::not_installed(
                self.package.clone(),
                self.path.clone(),
            ));
        }

        debug!("spawning {}", self.path.display());

        let status = Command::new(&self.path)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| InstallerError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        let code = status.code().unwrap_or(1);
        debug!("{} exited with {code}", self.path.display());
        Ok(code)
    }
}

/// Downloads, verifies and unpacks one release artifact.
pub struct Installer {
    config: InstallerConfig,
    target: PlatformTarget,
    location: ReleaseLocation,
    transport: HttpTransport,
    progress: Option<ProgressCallback>,
    phase: InstallPhase,
    state: InstallState,
}

impl Installer {
    /// Creates an installer for the running platform.
    ///
    /// # Errors
    ///
    /// - [`InstallerError::UnsupportedPlatform`] or
    ///   [`InstallerError::MacosNotDistributed`] if no artifact is published
    ///   for this platform on the configured channel
    /// - [`InstallerError::Transport`] if the HTTP client cannot be built
    pub fn new(config: InstallerConfig) -> Result<Self> {
        let target = PlatformTarget::detect(&config.package.name, config.channel)?;
        Self::with_target(config, target)
    }

    /// Creates an installer for an explicit platform target.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Transport`] if the HTTP client cannot be built.
    pub fn with_target(config: InstallerConfig, target: PlatformTarget) -> Result<Self> {
        let location =
            ReleaseLocation::new(&config.release_host, &config.owner, &config.package, &target);
        let transport = HttpTransport::from_config(&config)?;
        let state = InstallState {
            target_dir: config.target_dir.clone(),
            binary_path: config.binary_path(&target.binary_filename),
            installed: false,
        };

        Ok(Self {
            config,
            target,
            location,
            transport,
            progress: None,
            phase: InstallPhase::NotStarted,
            state,
        })
    }

    /// Registers a download progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Resolved platform target.
    #[must_use]
    pub fn target(&self) -> &PlatformTarget {
        &self.target
    }

    /// Artifact and checksum URLs.
    #[must_use]
    pub fn location(&self) -> &ReleaseLocation {
        &self.location
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> InstallPhase {
        self.phase
    }

    /// Filesystem state.
    #[must_use]
    pub fn state(&self) -> &InstallState {
        &self.state
    }

    /// Path the binary is (or will be) installed to.
    #[must_use]
    pub fn binary_path(&self) -> &Path {
        &self.state.binary_path
    }

    /// Returns whether the binary exists on disk.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.binary().is_installed()
    }

    /// Installs the release artifact and returns the binary path.
    ///
    /// Re-running overwrites the files of a previous install.
    ///
    /// # Errors
    ///
    /// - [`InstallerError::Transport`] if the artifact or checksum cannot be fetched
    /// - [`InstallerError::ChecksumMismatch`] if the digests differ; any
    ///   binary at the install path has been removed by then
    /// - [`InstallerError::Extraction`] if the archive cannot be unpacked
    /// - [`InstallerError::Io`] for local filesystem failures
    pub async fn install(&mut self) -> Result<PathBuf> {
        info!(
            "installing {} {} for {}",
            self.config.package.name, self.config.package.version, self.target
        );

        match self.prepare_and_install().await {
            Ok(binary) => {
                self.set_phase(InstallPhase::Installed);
                info!("{} installed: {}", self.config.package.name, binary.display());
                Ok(binary)
            }
            Err(e) => {
                self.state.installed = false;
                self.set_phase(InstallPhase::Failed);
                Err(e)
            }
        }
    }

    async fn prepare_and_install(&mut self) -> Result<PathBuf> {
        let target_dir = self.state.target_dir.clone();
        std::fs::create_dir_all(&target_dir).map_err(|e| {
            InstallerError::io(format!("failed to create {}", target_dir.display()), e)
        })?;

        let spool = download::spool_path(&target_dir, self.location.artifact_file_name());
        let result = self.install_from_spool(&spool).await;

        if spool.exists()
            && let Err(e) = std::fs::remove_file(&spool)
        {
            warn!("failed to remove {}: {e}", spool.display());
        }

        result
    }

    async fn install_from_spool(&mut self, spool: &Path) -> Result<PathBuf> {
        self.set_phase(InstallPhase::Downloading);
        info!("downloading release from {}", self.location.artifact_url);
        let spooled = download::spool_artifact(
            &self.transport,
            &self.location.artifact_url,
            spool,
            self.progress.as_ref(),
        )
        .await?;

        self.set_phase(InstallPhase::Verifying);
        verify::verify(
            &self.transport,
            &spooled.digest,
            &self.location.checksum_url,
            &self.state.binary_path,
        )
        .await?;

        self.set_phase(InstallPhase::Extracting);
        let binary = match self.unpack(spool) {
            Ok(binary) => binary,
            Err(e) => {
                self.remove_partial_install();
                return Err(e);
            }
        };

        self.state.installed = true;
        Ok(binary)
    }

    fn unpack(&self, spool: &Path) -> Result<PathBuf> {
        let binary = archive::extract(
            spool,
            self.target.archive_format,
            &self.state.target_dir,
            &self.target,
        )?;
        archive::set_executable_permissions(&binary)?;

        if let Some(launcher) = archive::install_launcher(&self.state.target_dir, &self.target)? {
            debug!("launcher written to {}", launcher.display());
        }

        Ok(binary)
    }

    /// Removes the binary and launcher left by an unpack that failed midway.
    fn remove_partial_install(&self) {
        let launcher = archive::launcher_path(&self.state.target_dir, &self.target);
        for path in std::iter::once(self.state.binary_path.clone()).chain(launcher) {
            if !path.is_file() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => warn!("removed partially installed {}", path.display()),
                Err(e) => warn!("failed to remove {}: {e}", path.display()),
            }
        }
    }

    /// Runs the installed binary; see [`InstalledBinary::run`].
    ///
    /// # Errors
    ///
    /// - [`InstallerError::NotInstalled`] if the binary does not exist
    /// - [`InstallerError::Spawn`] if the process cannot be started
    pub fn run<I, S>(&self, args: I) -> Result<i32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.binary().run(args)
    }

    fn binary(&self) -> InstalledBinary {
        InstalledBinary::new(
            self.config.package.name.clone(),
            self.state.binary_path.clone(),
        )
    }

    fn set_phase(&mut self, phase: InstallPhase) {
        info!("install phase: {} -> {phase}", self.phase);
        self.phase = phase;
    }
}
