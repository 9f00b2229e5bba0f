//! Path command for the release-shim CLI.

use anyhow::Result;
use clap::Args;
use release_installer::InstalledBinary;
use std::path::PathBuf;

use super::{resolve_name, resolve_target_dir};
use crate::errors::ShimError;

/// Arguments for the path command.
#[derive(Args)]
pub struct PathArgs {
    /// Package name, defaults to the descriptor's.
    #[clap(long)]
    pub name: Option<String>,

    /// Directory holding the installed binary.
    #[clap(long)]
    pub dir: Option<PathBuf>,
}

/// Prints the binary path; fails with exit code 1 when it is missing.
///
/// # Errors
///
/// Returns `ShimError::ProcessExitCode(1)` if nothing is installed there,
/// or an error if the package name cannot be resolved.
pub fn execute(args: &PathArgs) -> Result<()> {
    let name = resolve_name(args.name.as_deref())?;
    let dir = resolve_target_dir(args.dir.as_deref())?;
    let binary = InstalledBinary::locate(&name, &dir)?;

    println!("{}", binary.path().display());

    if binary.is_installed() {
        Ok(())
    } else {
        log::warn!("{name} is not installed at {}", binary.path().display());
        Err(ShimError::process_exit_code(1).into())
    }
}
