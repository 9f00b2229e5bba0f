//! Run command for the release-shim CLI.
//!
//! Spawns the installed binary with the remaining arguments, the current
//! working directory and inherited standard streams, then exits with the
//! child's exit code. Nothing is installed on demand.
//!
//! ```bash
//! release-shim run --name couper -- run -f couper.hcl
//! ```

use anyhow::Result;
use clap::Args;
use release_installer::InstalledBinary;
use std::path::PathBuf;

use super::{resolve_name, resolve_target_dir};
use crate::errors::ShimError;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Package name, defaults to the descriptor's.
    #[clap(long)]
    pub name: Option<String>,

    /// Directory holding the installed binary.
    #[clap(long)]
    pub dir: Option<PathBuf>,

    /// Arguments passed to the binary unchanged.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the run command.
///
/// ## Exit Codes
///
/// - Returns `Ok(())` if the binary exits with code 0
/// - Returns `Err(ShimError::ProcessExitCode)` for any other exit code
///
/// # Errors
///
/// Returns an error if the binary is not installed or cannot be started.
pub fn execute(args: &RunArgs) -> Result<()> {
    let name = resolve_name(args.name.as_deref())?;
    let dir = resolve_target_dir(args.dir.as_deref())?;
    let binary = InstalledBinary::locate(&name, &dir)?;

    match binary.run(&args.args)? {
        0 => Ok(()),
        code => Err(ShimError::process_exit_code(code).into()),
    }
}
