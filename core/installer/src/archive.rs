//! Archive extraction for release artifacts.
//!
//! Release archives are flat: the binary sits at the archive root next to
//! license and readme files. Every entry is unpacked into the target
//! directory as-is, and the binary named by the [`PlatformTarget`] must be
//! among them.

use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use log::debug;
use tar::Archive;

use crate::errors::{InstallerError, Result};
use crate::platform::{ArchiveFormat, PlatformTarget};

/// Launcher script installed next to Windows binaries.
const LAUNCHER_TEMPLATE: &str = include_str!("../assets/launcher.sh");

/// Extracts `archive_path` into `target_dir` and returns the path of the
/// binary.
///
/// # Errors
///
/// Returns [`InstallerError::Extraction`] if the archive is malformed,
/// contains an unsafe entry path, or does not contain
/// `target.binary_filename`.
pub fn extract(
    archive_path: &Path,
    format: ArchiveFormat,
    target_dir: &Path,
    target: &PlatformTarget,
) -> Result<PathBuf> {
    match format {
        ArchiveFormat::TarGz => extract_tar_gz(archive_path, target_dir)?,
        ArchiveFormat::Zip => extract_zip(archive_path, target_dir)?,
    }

    let binary_path = target_dir.join(&target.binary_filename);
    if !binary_path.is_file() {
        return Err(InstallerError::extraction(
            archive_name(archive_path),
            format!("archive does not contain {}", target.binary_filename),
        ));
    }

    Ok(binary_path)
}

/// Extracts a tar.gz archive into `dest_dir`.
///
/// # Errors
///
/// Returns [`InstallerError::Extraction`] on malformed input, an entry
/// with an absolute path or `..` component, or a symlink or hard link
/// entry.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let name = archive_name(archive_path);
    let fail = |message: String| InstallerError::extraction(name.clone(), message);

    std::fs::create_dir_all(dest_dir)
        .map_err(|e| fail(format!("failed to create {}: {e}", dest_dir.display())))?;

    let file = std::fs::File::open(archive_path).map_err(|e| fail(format!("failed to open: {e}")))?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let entries = archive
        .entries()
        .map_err(|e| fail(format!("failed to read tar entries: {e}")))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| fail(format!("failed to read tar entry: {e}")))?;
        let entry_path = entry
            .path()
            .map_err(|e| fail(format!("invalid entry path: {e}")))?
            .into_owned();

        ensure_relative(&entry_path).map_err(fail)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            return Err(fail(format!(
                "refusing to extract link entry: {}",
                entry_path.display()
            )));
        }

        let output_path = dest_dir.join(&entry_path);
        if entry_type.is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(|e| fail(format!("failed to create {}: {e}", output_path.display())))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| fail(format!("failed to create {}: {e}", parent.display())))?;
        }

        entry
            .unpack(&output_path)
            .map_err(|e| fail(format!("failed to extract {}: {e}", entry_path.display())))?;
        debug!("extracted {}", output_path.display());
    }

    Ok(())
}

/// Extracts a zip archive into `dest_dir`.
///
/// # Errors
///
/// Returns [`InstallerError::Extraction`] on malformed input or an entry
/// with an absolute path or `..` component.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let name = archive_name(archive_path);
    let fail = |message: String| InstallerError::extraction(name.clone(), message);

    let file = std::fs::File::open(archive_path).map_err(|e| fail(format!("failed to open: {e}")))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| fail(format!("not a valid zip archive: {e}")))?;

    std::fs::create_dir_all(dest_dir)
        .map_err(|e| fail(format!("failed to create {}: {e}", dest_dir.display())))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| fail(format!("failed to read entry {i}: {e}")))?;

        // enclosed_name is None for absolute and escaping paths
        let Some(entry_path) = entry.enclosed_name() else {
            return Err(fail(format!(
                "refusing to extract unsafe path: {}",
                entry.name()
            )));
        };
        ensure_relative(&entry_path).map_err(fail)?;

        let output_path = dest_dir.join(&entry_path);
        if entry.is_dir() {
            std::fs::create_dir_all(&output_path)
                .map_err(|e| fail(format!("failed to create {}: {e}", output_path.display())))?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| fail(format!("failed to create {}: {e}", parent.display())))?;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .map_err(|e| fail(format!("failed to create {}: {e}", output_path.display())))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|e| fail(format!("failed to extract {}: {e}", entry_path.display())))?;
        debug!("extracted {}", output_path.display());
    }

    Ok(())
}

fn ensure_relative(path: &Path) -> std::result::Result<(), String> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if path.is_absolute() || escapes {
        return Err(format!(
            "refusing to extract path with parent directory or absolute reference: {}",
            path.display()
        ));
    }
    Ok(())
}

fn archive_name(archive_path: &Path) -> String {
    archive_path
        .file_name()
        .map_or_else(|| archive_path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Marks `path` as executable (`0o755`).
///
/// # Errors
///
/// Returns [`InstallerError::Io`] if the permissions cannot be read or set.
#[cfg(unix)]
pub fn set_executable_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(|e| InstallerError::io(format!("failed to get metadata: {}", path.display()), e))?
        .permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(|e| {
        InstallerError::io(format!("failed to set permissions: {}", path.display()), e)
    })
}

/// Sets executable permissions (no-op on Windows).
#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
pub fn set_executable_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Installs the extensionless launcher for Windows targets.
///
/// Shells that resolve commands without `.exe` (Git Bash, MSYS) find the
/// launcher at `<target_dir>/<name>`, which execs the real binary. Returns
/// `None` for other targets.
///
/// # Errors
///
/// Returns [`InstallerError::Io`] if the launcher cannot be written.
pub fn install_launcher(target_dir: &Path, target: &PlatformTarget) -> Result<Option<PathBuf>> {
    let Some(launcher_path) = launcher_path(target_dir, target) else {
        return Ok(None);
    };
    let script = LAUNCHER_TEMPLATE.replace("{binary}", &target.binary_filename);

    std::fs::write(&launcher_path, script).map_err(|e| {
        InstallerError::io(
            format!("failed to write launcher: {}", launcher_path.display()),
            e,
        )
    })?;
    set_executable_permissions(&launcher_path)?;

    Ok(Some(launcher_path))
}

/// Where [`install_launcher`] puts the launcher, or `None` for targets
/// without one.
#[must_use]
pub fn launcher_path(target_dir: &Path, target: &PlatformTarget) -> Option<PathBuf> {
    if !target.is_windows() {
        return None;
    }
    let name = target
        .binary_filename
        .strip_suffix(".exe")
        .unwrap_or(&target.binary_filename);
    Some(target_dir.join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DistributionChannel;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::Builder;

    fn target(os: &str) -> PlatformTarget {
        PlatformTarget::resolve(os, "x64", "couper", DistributionChannel::Direct)
            .expect("Should resolve")
    }

    fn create_tar_gz(archive_path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = Builder::new(encoder);

        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, data.as_bytes())
                .expect("Should append");
        }

        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gzip");
    }

    fn create_zip(archive_path: &Path, files: &[(&str, &str)]) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        for (name, data) in files {
            zip.start_file(*name, options).expect("Should start file");
            zip.write_all(data.as_bytes()).expect("Should write");
        }

        zip.finish().expect("Should finish");
    }

    #[test]
    fn tar_gz_binary_lands_in_target_dir() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("couper-v1.2.3-linux-amd64.tar.gz");
        create_tar_gz(
            &archive,
            &[("couper", "#!/bin/sh\necho hi\n"), ("LICENSE", "MIT")],
        );

        let bin = dir.path().join("bin");
        let binary = extract(&archive, ArchiveFormat::TarGz, &bin, &target("Linux"))
            .expect("Should extract");

        assert_eq!(binary, bin.join("couper"));
        assert_eq!(
            std::fs::read(&binary).expect("Should read binary"),
            b"#!/bin/sh\necho hi\n"
        );
        assert!(bin.join("LICENSE").exists());
    }

    #[test]
    fn zip_binary_lands_in_target_dir() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("couper-v1.2.3-windows-amd64.zip");
        create_zip(&archive, &[("couper.exe", "MZ"), ("README.md", "docs")]);

        let bin = dir.path().join("bin");
        let binary = extract(&archive, ArchiveFormat::Zip, &bin, &target("Windows_NT"))
            .expect("Should extract");

        assert_eq!(binary, bin.join("couper.exe"));
        assert!(bin.join("README.md").exists());
    }

    #[test]
    fn missing_binary_is_an_extraction_error() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("a.tar.gz");
        create_tar_gz(&archive, &[("LICENSE", "MIT")]);

        let err = extract(&archive, ArchiveFormat::TarGz, dir.path(), &target("Linux"))
            .expect_err("Should fail");
        match err {
            InstallerError::Extraction { archive, message } => {
                assert_eq!(archive, "a.tar.gz");
                assert!(message.contains("couper"));
            }
            other => panic!("Expected Extraction, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_an_extraction_error_for_both_formats() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("broken");
        std::fs::write(&archive, b"definitely not an archive").expect("Should write");

        for format in [ArchiveFormat::TarGz, ArchiveFormat::Zip] {
            let err = extract(&archive, format, &dir.path().join("out"), &target("Linux"))
                .expect_err("Should fail");
            assert!(matches!(err, InstallerError::Extraction { .. }), "{format}: {err}");
        }
    }

    #[test]
    fn tar_entry_escaping_target_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("evil.tar.gz");

        {
            let file = std::fs::File::create(&archive).expect("Should create file");
            let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
            let data = b"owned";
            let mut header = tar::Header::new_old();
            let name = b"../escaped";
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append(&header, &data[..]).expect("Should append");
            builder
                .into_inner()
                .expect("Should finish tar")
                .finish()
                .expect("Should finish gzip");
        }

        let out = dir.path().join("out");
        let err = extract_tar_gz(&archive, &out).expect_err("Should refuse");
        assert!(err.to_string().contains("refusing to extract"));
        assert!(!dir.path().join("escaped").exists());
    }

    #[cfg(unix)]
    #[test]
    fn tar_symlink_entry_is_rejected() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).expect("Should create dir");
        let archive = dir.path().join("evil.tar.gz");

        {
            let file = std::fs::File::create(&archive).expect("Should create file");
            let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));

            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_mode(0o777);
            builder
                .append_link(&mut link, "link", &outside)
                .expect("Should append link");

            let data = b"owned";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, "link/escaped.txt", &data[..])
                .expect("Should append");

            builder
                .into_inner()
                .expect("Should finish tar")
                .finish()
                .expect("Should finish gzip");
        }

        let out = dir.path().join("out");
        let err = extract_tar_gz(&archive, &out).expect_err("Should refuse");
        assert!(err.to_string().contains("link entry"), "{err}");
        assert!(!outside.join("escaped.txt").exists());
        assert!(std::fs::symlink_metadata(out.join("link")).is_err());
    }

    #[test]
    fn zip_entry_escaping_target_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let archive = dir.path().join("evil.zip");
        create_zip(&archive, &[("../escaped", "owned")]);

        let out = dir.path().join("out");
        let err = extract_zip(&archive, &out).expect_err("Should refuse");
        assert!(matches!(err, InstallerError::Extraction { .. }));
        assert!(!dir.path().join("escaped").exists());
    }

    #[test]
    fn launcher_only_for_windows() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        assert_eq!(
            install_launcher(dir.path(), &target("Linux")).expect("Should succeed"),
            None
        );

        let launcher = install_launcher(dir.path(), &target("Windows_NT"))
            .expect("Should write launcher")
            .expect("Windows gets a launcher");
        assert_eq!(launcher, dir.path().join("couper"));

        let script = std::fs::read_to_string(&launcher).expect("Should read launcher");
        assert!(script.starts_with("#!/bin/sh"));
        assert!(script.contains("/couper.exe\" \"$@\""));
        assert!(!script.contains("{binary}"));
    }

    #[cfg(unix)]
    #[test]
    fn set_executable_permissions_sets_755() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("couper");
        std::fs::write(&path, b"bin").expect("Should write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .expect("Should set permissions");

        set_executable_permissions(&path).expect("Should set permissions");

        let mode = std::fs::metadata(&path)
            .expect("Should get metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn set_executable_permissions_fails_for_missing_file() {
        assert!(set_executable_permissions(Path::new("/nonexistent/couper")).is_err());
    }
}
