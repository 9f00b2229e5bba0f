//! Command implementations for the release-shim CLI.
//!
//! Each submodule exposes an `Args` struct and an `execute` function. The
//! helpers here resolve what all commands share: the package name and the
//! target directory, layered as flag, then environment, then the defaults
//! next to the running executable.

pub mod install;
pub mod path;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::Result;
use release_installer::PackageIdentity;
use release_installer::config::{DIR_ENV, env_override};

use crate::errors::ShimError;

/// Directory containing the running executable.
fn executable_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|source| ShimError::ExecutableDir { source })?;
    Ok(exe
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf))
}

/// Default package descriptor: `<exe dir>/package.json`.
pub(crate) fn default_descriptor() -> Result<PathBuf> {
    Ok(executable_dir()?.join("package.json"))
}

/// Target directory from `--dir`, `RELEASE_SHIM_DIR` or `<exe dir>/bin`.
pub(crate) fn resolve_target_dir(flag: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env_override(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    Ok(executable_dir()?.join("bin"))
}

/// Reads the descriptor at `path`, mapping an unreadable file to
/// [`ShimError::MissingPackage`].
pub(crate) fn read_descriptor(path: &Path) -> Result<PackageIdentity> {
    if !path.is_file() {
        return Err(ShimError::missing_package(path.to_path_buf()).into());
    }
    Ok(PackageIdentity::from_descriptor(path)?)
}

/// Package name from `--name` or the default descriptor.
pub(crate) fn resolve_name(flag: Option<&str>) -> Result<String> {
    if let Some(name) = flag {
        return Ok(name.to_string());
    }
    Ok(read_descriptor(&default_descriptor()?)?.name)
}
