use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use symbolpack_core::{artifact_file_name, Requirement, ARTIFACT_EXTENSION, DESCRIPTOR_EXTENSION};
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::descriptor::NuspecDocument;

/// Outcome of reading an archive's dependency descriptor. A missing or
/// unreadable descriptor leaves `dependencies` empty and sets `warning`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyScan {
    pub dependencies: Vec<Requirement>,
    pub warning: Option<String>,
}

impl DependencyScan {
    pub fn from_descriptor(text: &str) -> Self {
        match NuspecDocument::parse(text) {
            Ok(document) => Self {
                dependencies: document.requirements(),
                warning: None,
            },
            Err(err) => Self::missing(format!("unreadable dependency descriptor: {err:#}")),
        }
    }

    fn missing(reason: String) -> Self {
        Self {
            dependencies: Vec::new(),
            warning: Some(reason),
        }
    }
}

fn open_archive(archive_path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive {}", archive_path.display()))?;
    ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", archive_path.display()))
}

fn find_entry(archive: &mut ZipArchive<File>, extension: &str) -> Result<Option<usize>> {
    let suffix = format!(".{extension}");
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.is_dir() && entry.name().to_ascii_lowercase().ends_with(&suffix) {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Copies the archive's payload artifact into `output_dir` under its cache
/// file name. Returns `Ok(None)` when the archive carries no artifact.
pub fn extract_artifact(
    archive_path: &Path,
    package_id: &str,
    version: &str,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let mut archive = open_archive(archive_path)?;
    let Some(index) = find_entry(&mut archive, ARTIFACT_EXTENSION)? else {
        debug!(package = package_id, "archive carries no artifact");
        return Ok(None);
    };

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create cache dir: {}", output_dir.display()))?;
    let target = output_dir.join(artifact_file_name(package_id, version));
    let part_path = target.with_file_name(format!(
        "{}.part",
        target
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("artifact")
    ));

    let mut entry = archive.by_index(index)?;
    let mut out = File::create(&part_path)
        .with_context(|| format!("failed to create {}", part_path.display()))?;
    if let Err(err) = io::copy(&mut entry, &mut out) {
        drop(out);
        let _ = fs::remove_file(&part_path);
        return Err(err).with_context(|| {
            format!(
                "failed extracting '{}' from {}",
                entry.name(),
                archive_path.display()
            )
        });
    }
    drop(out);

    fs::rename(&part_path, &target)
        .with_context(|| format!("failed to move artifact into cache: {}", target.display()))?;
    Ok(Some(target))
}

/// Reads the dependency list from the archive's `.nuspec` descriptor.
pub fn read_dependencies(archive_path: &Path) -> DependencyScan {
    match read_descriptor_text(archive_path) {
        Ok(Some(text)) => {
            let scan = DependencyScan::from_descriptor(&text);
            if let Some(warning) = &scan.warning {
                warn!(archive = %archive_path.display(), "{warning}");
            }
            scan
        }
        Ok(None) => {
            let reason = format!(
                "no dependency descriptor in {}",
                archive_path.display()
            );
            warn!("{reason}");
            DependencyScan::missing(reason)
        }
        Err(err) => {
            let reason = format!("{err:#}");
            warn!("{reason}");
            DependencyScan::missing(reason)
        }
    }
}

fn read_descriptor_text(archive_path: &Path) -> Result<Option<String>> {
    let mut archive = open_archive(archive_path)?;
    let Some(index) = find_entry(&mut archive, DESCRIPTOR_EXTENSION)? else {
        return Ok(None);
    };
    let mut entry = archive.by_index(index)?;
    let mut text = String::new();
    entry.read_to_string(&mut text).with_context(|| {
        format!(
            "failed reading descriptor '{}' from {}",
            entry.name(),
            archive_path.display()
        )
    })?;
    Ok(Some(text))
}
