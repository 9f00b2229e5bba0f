//! Platform resolution for release artifacts.
//!
//! Maps raw OS and architecture identifiers onto the closed set of targets
//! that release archives are published for. Resolution is a pure function of
//! the two input strings; [`PlatformTarget::detect`] feeds it the values of
//! the running process.
//!
//! ## Supported Targets
//!
//! | OS      | Arch          | Archive  | Binary        |
//! |---------|---------------|----------|---------------|
//! | linux   | amd64, arm64  | `tar.gz` | `<name>`      |
//! | windows | amd64, arm64  | `zip`    | `<name>.exe`  |
//! | macos   | amd64, arm64  | `zip`    | `<name>`      |
//!
//! macOS is only resolvable on the [`DistributionChannel::Direct`] channel.

use std::fmt;

use crate::errors::{InstallerError, Result};

/// Operating system a release artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux
    Linux,
    /// macOS
    Macos,
    /// Windows
    Windows,
}

impl Os {
    /// Parses a raw OS identifier.
    ///
    /// Accepts the names reported by the Node.js runtime (`Linux`, `Darwin`,
    /// `Windows_NT`) as well as `std::env::consts::OS` values.
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "Linux" | "linux" => Some(Self::Linux),
            "Darwin" | "macos" => Some(Self::Macos),
            "Windows_NT" | "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Token used in artifact file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture a release artifact is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// `x86_64`
    Amd64,
    /// `aarch64`
    Arm64,
}

impl Arch {
    /// Parses a raw architecture identifier (`x64`, `x86_64`, `amd64`,
    /// `arm64`, `aarch64`).
    #[must_use]
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "x64" | "x86_64" | "amd64" => Some(Self::Amd64),
            "arm64" | "aarch64" => Some(Self::Arm64),
            _ => None,
        }
    }

    /// Token used in artifact file names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive container of a release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// gzip-compressed tarball
    TarGz,
    /// zip file
    Zip,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where the installer is being run from.
///
/// The package channel (npm and friends) has no macOS archives; those users
/// are sent to Homebrew. The direct channel downloads whatever the release
/// host publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistributionChannel {
    /// Package-manager download path; macOS is refused.
    #[default]
    Package,
    /// Direct download from the release host; every OS is allowed.
    Direct,
}

impl DistributionChannel {
    /// Parses `package` or `direct`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "package" => Some(Self::Package),
            "direct" => Some(Self::Direct),
            _ => None,
        }
    }
}

/// A fully resolved release target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformTarget {
    /// Operating system.
    pub os: Os,
    /// CPU architecture.
    pub arch: Arch,
    /// Archive format used for this OS.
    pub archive_format: ArchiveFormat,
    /// Name of the binary inside the archive.
    pub binary_filename: String,
}

impl PlatformTarget {
    /// Resolves a raw OS/arch pair for package `name` on `channel`.
    ///
    /// # Errors
    ///
    /// - [`InstallerError::MacosNotDistributed`] for macOS on the package channel
    /// - [`InstallerError::UnsupportedPlatform`] for any pair outside the table
    pub fn resolve(
        raw_os: &str,
        raw_arch: &str,
        name: &str,
        channel: DistributionChannel,
    ) -> Result<Self> {
        let (Some(os), Some(arch)) = (Os::from_raw(raw_os), Arch::from_raw(raw_arch)) else {
            return Err(InstallerError::unsupported_platform(name, raw_os, raw_arch));
        };

        if os == Os::Macos && channel == DistributionChannel::Package {
            return Err(InstallerError::macos_not_distributed(name));
        }

        let archive_format = match os {
            Os::Linux => ArchiveFormat::TarGz,
            Os::Macos | Os::Windows => ArchiveFormat::Zip,
        };

        let binary_filename = match os {
            Os::Windows => format!("{name}.exe"),
            Os::Linux | Os::Macos => name.to_string(),
        };

        Ok(Self {
            os,
            arch,
            archive_format,
            binary_filename,
        })
    }

    /// Resolves the target of the running process.
    ///
    /// # Errors
    ///
    /// Same as [`PlatformTarget::resolve`].
    pub fn detect(name: &str, channel: DistributionChannel) -> Result<Self> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH, name, channel)
    }

    /// Returns whether this target is Windows.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const RAW_OS: [&str; 6] = ["Linux", "linux", "Darwin", "macos", "Windows_NT", "windows"];
    const RAW_ARCH: [&str; 5] = ["x64", "x86_64", "amd64", "arm64", "aarch64"];

    #[test]
    fn linux_amd64_uses_tar_gz_and_plain_binary() {
        let target = PlatformTarget::resolve("Linux", "x64", "couper", DistributionChannel::Package)
            .expect("Should resolve");
        assert_eq!(target.os, Os::Linux);
        assert_eq!(target.arch, Arch::Amd64);
        assert_eq!(target.archive_format, ArchiveFormat::TarGz);
        assert_eq!(target.binary_filename, "couper");
        assert_eq!(target.to_string(), "linux-amd64");
    }

    #[test]
    fn windows_uses_zip_and_exe_suffix() {
        let target =
            PlatformTarget::resolve("Windows_NT", "arm64", "couper", DistributionChannel::Package)
                .expect("Should resolve");
        assert_eq!(target.archive_format, ArchiveFormat::Zip);
        assert_eq!(target.binary_filename, "couper.exe");
        assert!(target.is_windows());
    }

    #[test]
    fn darwin_on_package_channel_points_to_homebrew() {
        for arch in RAW_ARCH {
            let err = PlatformTarget::resolve("Darwin", arch, "couper", DistributionChannel::Package)
                .expect_err("macOS must be refused");
            assert!(
                matches!(err, InstallerError::MacosNotDistributed { .. }),
                "unexpected error for {arch}: {err}"
            );
        }
    }

    #[test]
    fn darwin_on_direct_channel_resolves_to_zip() {
        let target =
            PlatformTarget::resolve("Darwin", "aarch64", "couper", DistributionChannel::Direct)
                .expect("Should resolve");
        assert_eq!(target.os, Os::Macos);
        assert_eq!(target.arch, Arch::Arm64);
        assert_eq!(target.archive_format, ArchiveFormat::Zip);
        assert_eq!(target.binary_filename, "couper");
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = PlatformTarget::resolve("FreeBSD", "x64", "couper", DistributionChannel::Direct)
            .expect_err("FreeBSD is not published");
        match err {
            InstallerError::UnsupportedPlatform { os, arch, .. } => {
                assert_eq!(os, "FreeBSD");
                assert_eq!(arch, "x64");
            }
            other => panic!("Expected UnsupportedPlatform, got {other:?}"),
        }
    }

    #[test]
    fn unknown_arch_is_unsupported_even_on_darwin() {
        let err = PlatformTarget::resolve("Darwin", "ia32", "couper", DistributionChannel::Package)
            .expect_err("ia32 is not published");
        assert!(matches!(err, InstallerError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn raw_identifiers_are_case_sensitive() {
        assert!(Os::from_raw("LINUX").is_none());
        assert!(Arch::from_raw("X64").is_none());
    }

    #[test]
    fn every_supported_pair_yields_a_distinct_target() {
        let mut seen = HashSet::new();
        for os in RAW_OS {
            for arch in RAW_ARCH {
                let target =
                    PlatformTarget::resolve(os, arch, "couper", DistributionChannel::Direct)
                        .expect("Should resolve every listed pair");
                seen.insert(target);
            }
        }
        assert_eq!(seen.len(), 6, "3 operating systems times 2 architectures");
    }

    #[test]
    fn channel_names_parse() {
        assert_eq!(
            DistributionChannel::from_name("package"),
            Some(DistributionChannel::Package)
        );
        assert_eq!(
            DistributionChannel::from_name("direct"),
            Some(DistributionChannel::Direct)
        );
        assert_eq!(DistributionChannel::from_name("brew"), None);
        assert_eq!(DistributionChannel::default(), DistributionChannel::Package);
    }

    #[test]
    fn detect_matches_resolve_for_current_process() {
        let detected = PlatformTarget::detect("couper", DistributionChannel::Direct);
        let resolved = PlatformTarget::resolve(
            std::env::consts::OS,
            std::env::consts::ARCH,
            "couper",
            DistributionChannel::Direct,
        );
        assert_eq!(detected.ok(), resolved.ok());
    }
}
