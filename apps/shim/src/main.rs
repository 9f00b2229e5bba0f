#![warn(clippy::pedantic)]

//! # release-shim
//!
//! Command-line front end of the release installer. A package manager hook
//! calls `release-shim install` once; afterwards every invocation of the
//! wrapped program goes through `release-shim run`, which forwards the
//! arguments, the standard streams and the exit code.
//!
//! ## Subcommands
//!
//! - `install` - Download, verify and unpack the release binary
//! - `run` - Run the installed binary with the remaining arguments
//! - `path` - Print where the binary is expected
//!
//! ## Examples
//!
//! ```bash
//! release-shim install --name couper --version 1.12.0
//! release-shim run --name couper -- run -f couper.hcl
//! ```

mod commands;
mod errors;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use commands::{install, path, run};
use errors::ShimError;
use log::LevelFilter;
use release_installer::InstallerError;

/// Installs a release binary and forwards invocations to it.
#[derive(Parser)]
#[command(
    name = "release-shim",
    author,
    version,
    about = "Installs a release binary on first use and forwards every invocation to it",
    after_help = "\
PACKAGE RESOLUTION:
    Name and version come from --name/--version, falling back to the
    package.json next to the release-shim executable.

ENVIRONMENT VARIABLES:
    RELEASE_SHIM_HOST           Release host base URL (default: https://github.com)
    RELEASE_SHIM_OWNER          Repository owner (default: coupergateway)
    RELEASE_SHIM_DIR            Target directory (default: <exe dir>/bin)
    RELEASE_SHIM_TIMEOUT_SECS   Request timeout in seconds (default: 300)
    RUST_LOG                    Log filter, overrides -v"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[clap(short = 'v', long = "verbose", global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Download, verify and unpack the release binary.
    ///
    /// Re-running overwrites a previous install.
    Install(install::InstallArgs),

    /// Run the installed binary.
    ///
    /// All arguments after the options are passed through unchanged; use
    /// `--` before arguments that look like release-shim options.
    Run(run::RunArgs),

    /// Print the path of the installed binary.
    ///
    /// Exits with 1 when the binary is not installed.
    Path(path::PathArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = dispatch().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing an error message. For all other errors, prints the error and
/// returns exit code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(ShimError::ProcessExitCode { code }) = e.downcast_ref::<ShimError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    if is_transient(e) {
        eprintln!("The download failed on the network side; running the install again may succeed.");
    }
    1
}

fn is_transient(e: &anyhow::Error) -> bool {
    e.downcast_ref::<InstallerError>()
        .is_some_and(InstallerError::is_retryable)
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn dispatch() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::Run(args) => run::execute(&args),
        Commands::Path(args) => path::execute(&args),
    }
}
