//! Install command for the release-shim CLI.
//!
//! ## Usage
//!
//! ```bash
//! release-shim install                                  # name and version from package.json
//! release-shim install --name couper --version 1.12.0
//! release-shim install --channel direct --dir /opt/couper/bin
//! ```

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use release_installer::config::parse_timeout_secs;
use release_installer::download::{format_bytes, format_speed};
use release_installer::{
    DistributionChannel, Installer, InstallerConfig, PackageIdentity, ProgressCallback,
    ProgressEvent,
};

use super::{default_descriptor, read_descriptor, resolve_target_dir};

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Package name, overrides the descriptor.
    #[clap(long)]
    pub name: Option<String>,

    /// Release version, overrides the descriptor (e.g. "1.12.0" or "v1.12.0").
    #[clap(long)]
    pub version: Option<String>,

    /// Package descriptor to read name and version from.
    ///
    /// Defaults to package.json next to the release-shim executable.
    #[clap(long)]
    pub descriptor: Option<PathBuf>,

    /// Directory that receives the binary.
    #[clap(long)]
    pub dir: Option<PathBuf>,

    /// Release host base URL.
    #[clap(long)]
    pub host: Option<String>,

    /// Repository owner on the release host.
    #[clap(long)]
    pub owner: Option<String>,

    /// Distribution channel: "package" refuses macOS, "direct" allows it.
    #[clap(long, default_value = "package", value_parser = parse_channel)]
    pub channel: DistributionChannel,

    /// Request timeout in seconds.
    #[clap(long, value_parser = parse_timeout_secs)]
    pub timeout: Option<Duration>,

    /// Maximum redirect hops per request.
    #[clap(long)]
    pub max_redirects: Option<usize>,
}

fn parse_channel(raw: &str) -> std::result::Result<DistributionChannel, String> {
    DistributionChannel::from_name(raw)
        .ok_or_else(|| format!("unknown channel '{raw}', expected 'package' or 'direct'"))
}

/// Executes the install command.
///
/// # Process
///
/// 1. Resolve name and version from flags and the descriptor
/// 2. Build the configuration (flags over environment over defaults)
/// 3. Download, verify and unpack the artifact
/// 4. Print the installed path
///
/// # Errors
///
/// Returns an error if the package cannot be resolved, the platform has no
/// release artifact, or any install step fails.
pub async fn execute(args: &InstallArgs) -> Result<()> {
    let package = resolve_package(args)?;
    let config = build_config(args, package)?;

    let mut installer = Installer::new(config)?;
    if std::io::stderr().is_terminal() {
        installer = installer.with_progress(progress_printer());
    }

    eprintln!(
        "Downloading release from {}...",
        installer.location().artifact_url
    );
    let binary = installer
        .install()
        .await
        .context("Error installing release")?;

    eprintln!(
        "{} successfully installed: {}",
        installer.target().binary_filename,
        binary.display()
    );
    println!("{}", binary.display());

    Ok(())
}

fn resolve_package(args: &InstallArgs) -> Result<PackageIdentity> {
    if let (Some(name), Some(version)) = (&args.name, &args.version) {
        return Ok(PackageIdentity::new(name.as_str(), version)?);
    }

    let descriptor = match &args.descriptor {
        Some(path) => path.clone(),
        None => default_descriptor()?,
    };
    let from_file = read_descriptor(&descriptor)?;

    let name = args.name.clone().unwrap_or(from_file.name);
    match &args.version {
        Some(version) => Ok(PackageIdentity::new(name, version)?),
        None => Ok(PackageIdentity {
            name,
            version: from_file.version,
        }),
    }
}

fn build_config(args: &InstallArgs, package: PackageIdentity) -> Result<InstallerConfig> {
    let default_dir = resolve_target_dir(None)?;
    let mut config = InstallerConfig::new(package, default_dir)
        .with_channel(args.channel)
        .apply_env()?;

    if let Some(dir) = &args.dir {
        config = config.with_target_dir(dir);
    }
    if let Some(host) = &args.host {
        config = config.with_release_host(host);
    }
    if let Some(owner) = &args.owner {
        config = config.with_owner(owner);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_request_timeout(timeout);
    }
    if let Some(max_redirects) = args.max_redirects {
        config = config.with_max_redirects(max_redirects);
    }

    Ok(config)
}

fn progress_printer() -> ProgressCallback {
    Arc::new(|event| match event {
        ProgressEvent::Started { total, .. } => {
            log::debug!("artifact size: {}", format_bytes(total));
        }
        ProgressEvent::Progress { downloaded, speed } => {
            eprint!(
                "\r{} {}     ",
                format_bytes(downloaded),
                format_speed(speed)
            );
            let _ = std::io::stderr().flush();
        }
        ProgressEvent::Completed => {
            eprintln!();
            eprintln!("Verifying checksum...");
        }
    })
}
