//! Family scanners
//!
//! Each family root is turned into a list of unnumbered [`ImageRecord`]s.
//! Directory entries are always visited in file-name order, which makes the
//! discovery order (and therefore the tie-break between equal names)
//! reproducible from run to run.
//!
//! - IOL and Dynamips: one file, one image ([`scan_flat`])
//! - QEMU: one directory or one archive per image (see [`super::qemu`])

use super::checksum::{relative_key, ChecksumMode, ChecksumSource};
use super::config::RemoteConfig;
use super::error::{CatalogError, Result};
use super::types::{human_size, FileEntry, FileType, Family, ImageRecord};
use super::{dynamips, iol, qemu};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Archive suffixes, longest first so `.tar.gz` wins over a bare `.gz`
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".zip"];

/// Progress update emitted after each record
#[derive(Debug, Clone)]
pub struct ScanProgress {
    pub family: Family,
    pub records: usize,
    pub current: String,
}

/// Settings shared by every scanner in a run
pub struct ScanContext<'a> {
    pub remote: &'a RemoteConfig,
    pub checksums: ChecksumMode,
    pub progress: Option<&'a dyn Fn(ScanProgress)>,
}

impl<'a> ScanContext<'a> {
    pub fn new(remote: &'a RemoteConfig, checksums: ChecksumMode) -> Self {
        Self {
            remote,
            checksums,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Fn(ScanProgress)) -> Self {
        self.progress = Some(progress);
        self
    }

    pub(crate) fn report(&self, family: Family, records: usize, current: &str) {
        if let Some(progress) = self.progress {
            progress(ScanProgress {
                family,
                records,
                current: current.to_string(),
            });
        }
    }
}

/// Scan one family root.
///
/// `limit` stops the scan after that many records. The root must exist.
pub fn scan_family(
    family: Family,
    root: &Path,
    ctx: &ScanContext<'_>,
    limit: Option<usize>,
) -> Result<Vec<ImageRecord>> {
    let start = Instant::now();
    info!(family = %family, root = %root.display(), "Scanning family root");

    if !root.is_dir() {
        return Err(CatalogError::RootNotFound(root.to_path_buf()));
    }

    let records = match family {
        Family::Qemu => qemu::scan(root, ctx, limit)?,
        Family::Iol => iol::scan(root, ctx, limit)?,
        Family::Dynamips => dynamips::scan(root, ctx, limit)?,
    };

    info!(
        family = %family,
        root = %root.display(),
        records = records.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Family scan complete"
    );
    Ok(records)
}

/// One image per file with the given extension, directly in `root`.
pub(crate) fn scan_flat(
    family: Family,
    extension: &str,
    root: &Path,
    ctx: &ScanContext<'_>,
    limit: Option<usize>,
) -> Result<Vec<ImageRecord>> {
    let sums = ChecksumSource::load(root, ctx.checksums)?;
    let mut records = Vec::new();

    for path in list_files(root)? {
        if limit.is_some_and(|max| records.len() >= max) {
            debug!(family = %family, "Stopped at truncation limit");
            break;
        }
        let name = file_name(&path);
        if !name.ends_with(extension) {
            continue;
        }

        let entry = build_file_entry(ctx.remote, &sums, family, root, &path, Some(FileType::Firmware))?;
        let download_path = ctx.remote.download_path(family, &name);
        if let Some(record) = ImageRecord::new(name.clone(), family, vec![entry], download_path) {
            debug!(family = %family, name = %record.name, size = record.metadata.total_size, "Added image");
            records.push(record);
            ctx.report(family, records.len(), &name);
        }
    }

    Ok(records)
}

/// Regular, non-hidden files directly in `dir`, sorted by name.
pub(crate) fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CatalogError::io(dir, e))? {
        let entry = entry.map_err(|e| CatalogError::io(dir, e))?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        // fs::metadata follows symlinks, so linked images are indexed too
        let metadata = fs::metadata(&path).map_err(|e| CatalogError::io(&path, e))?;
        if metadata.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Build the catalog entry for one file.
///
/// `file_type` overrides the extension-based classification.
pub(crate) fn build_file_entry(
    remote: &RemoteConfig,
    sums: &ChecksumSource,
    family: Family,
    root: &Path,
    path: &Path,
    file_type: Option<FileType>,
) -> Result<FileEntry> {
    let name = file_name(path);
    let extension = file_extension(&name);
    let size = fs::metadata(path)
        .map_err(|e| CatalogError::io(path, e))?
        .len();

    let relative_dir = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(relative_key)
        .unwrap_or_default();

    Ok(FileEntry {
        url: remote.file_url(family, &relative_dir, &name),
        size,
        human_size: human_size(size),
        file_type: file_type.unwrap_or_else(|| FileType::from_extension(&extension)),
        checksum: sums.checksum(path)?,
        extension,
    })
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension with its leading dot; `.tar.gz` is kept whole.
pub fn file_extension(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".tar.gz") && lower.len() > ".tar.gz".len() {
        return name[name.len() - ".tar.gz".len()..].to_string();
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_string(),
        _ => String::new(),
    }
}

/// Matching archive suffix of a file name, if any
pub fn archive_extension(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| lower.ends_with(ext) && lower.len() > ext.len())
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
