//! Error types for the release-shim CLI.
//!
//! Library failures travel as [`release_installer::InstallerError`] inside
//! `anyhow::Error`; the variants here cover what only the CLI can get wrong.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the CLI layer itself.
#[derive(Debug, Error)]
pub enum ShimError {
    /// The location of the running executable could not be determined.
    #[error("cannot determine the directory of release-shim: {source}")]
    ExecutableDir {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Neither `--name` nor a readable package descriptor was given.
    #[error(
        "no package given: pass --name (and --version for install) or place a package.json at {}",
        descriptor.display()
    )]
    MissingPackage {
        /// Descriptor path that was tried.
        descriptor: PathBuf,
    },

    /// Subprocess exited with non-zero code.
    ///
    /// The exit code is propagated without printing an additional message,
    /// the child already reported whatever went wrong.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the subprocess.
        code: i32,
    },
}

impl ShimError {
    /// Creates a new `MissingPackage` error.
    #[must_use]
    pub fn missing_package(descriptor: PathBuf) -> Self {
        Self::MissingPackage { descriptor }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
