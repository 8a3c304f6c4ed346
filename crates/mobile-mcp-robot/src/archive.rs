//! Zipped `.app` bundles for simulator installs
//!
//! Entry names are checked before a single byte is written. Extraction goes to
//! a private temp dir that lives exactly as long as the returned
//! [`ExtractedApp`].

use crate::error::{Result, RobotError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

const NO_APP_BUNDLE: &str = "No .app bundle found in the .zip file, please visit wiki at https://github.com/mobile-next/mobile-mcp/wiki for assistance.";

/// Whether a zip entry name would land outside the extraction directory
pub(crate) fn is_unsafe_entry(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }
    let mut chars = name.chars();
    if let (Some(drive), Some(':')) = (chars.next(), chars.next()) {
        if drive.is_ascii_alphabetic() {
            return true;
        }
    }
    name.split(['/', '\\']).any(|segment| segment == "..")
}

/// Reject the archive if any entry escapes the extraction directory
pub(crate) fn validate_archive(archive: &ZipArchive<File>) -> Result<()> {
    match archive.file_names().find(|name| is_unsafe_entry(name)) {
        Some(name) => Err(RobotError::actionable(format!(
            "Security violation: File path '{}' contains invalid characters",
            name
        ))),
        None => Ok(()),
    }
}

/// An `.app` bundle unpacked into a temp dir; the dir is removed on drop
#[derive(Debug)]
pub(crate) struct ExtractedApp {
    dir: TempDir,
    app_path: PathBuf,
}

impl ExtractedApp {
    pub fn app_path(&self) -> &Path {
        &self.app_path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// First `*.app` directory directly under `dir`, by name
fn find_app_bundle(dir: &Path) -> Result<Option<PathBuf>> {
    let mut bundles = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_app = entry.file_name().to_string_lossy().ends_with(".app");
        if is_app && entry.file_type()?.is_dir() {
            bundles.push(entry.path());
        }
    }
    bundles.sort();
    Ok(bundles.into_iter().next())
}

/// Validate and unpack a zipped app bundle. Blocking.
pub(crate) fn extract_app_bundle(zip_path: &Path) -> Result<ExtractedApp> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    validate_archive(&archive)?;

    let dir = tempfile::Builder::new().prefix("ios-app-").tempdir()?;
    archive
        .extract(dir.path())
        .map_err(|e| RobotError::actionable(format!("Failed to unzip file: {}", e)))?;

    let app_path = find_app_bundle(dir.path())?
        .ok_or_else(|| RobotError::actionable(NO_APP_BUNDLE))?;
    tracing::debug!("Found .app bundle at {}", app_path.display());
    Ok(ExtractedApp { dir, app_path })
}

/// Whether a path names a zip archive, by extension
pub(crate) fn is_zip(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;

    /// Write a stored zip with the given entries; names ending in `/` are dirs
    pub fn write_zip(path: &Path, entries: &[&str]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for name in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(b"payload").unwrap();
            }
        }
        writer.finish().unwrap();
    }
}
