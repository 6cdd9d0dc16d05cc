//! Core types for the catalog
//!
//! An [`ImageRecord`] is one downloadable image: a name, its family, and the
//! files a lab host has to fetch. Records are rebuilt from the filesystem on
//! every run, so nothing here is persisted between runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Families
// ============================================================================

/// Image family, each with its own on-disk layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Qemu,
    Iol,
    Dynamips,
}

impl Family {
    /// All families, in merged-catalog key order
    pub const ALL: [Family; 3] = [Family::Qemu, Family::Iol, Family::Dynamips];

    /// Lower-case tag used in records and file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Qemu => "qemu",
            Family::Iol => "iol",
            Family::Dynamips => "dynamips",
        }
    }

    /// Key used in the merged catalog
    pub fn merged_key(&self) -> &'static str {
        match self {
            Family::Qemu => "QEMU",
            Family::Iol => "IOL",
            Family::Dynamips => "DYNAMIPS",
        }
    }

    /// Subtree below `addons/`, shared by the mirror tree and the install root
    pub fn addon_path(&self) -> &'static str {
        match self {
            Family::Qemu => "qemu",
            Family::Iol => "iol/bin",
            Family::Dynamips => "dynamips",
        }
    }

    pub fn from_merged_key(key: &str) -> Option<Family> {
        Family::ALL.into_iter().find(|f| f.merged_key() == key)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qemu" => Ok(Family::Qemu),
            "iol" => Ok(Family::Iol),
            "dynamips" => Ok(Family::Dynamips),
            other => Err(format!("unknown image family: '{}'", other)),
        }
    }
}

// ============================================================================
// File entries
// ============================================================================

/// Coarse classification of a file inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Disk,
    Template,
    Document,
    Archive,
    Script,
    Image,
    Firmware,
    Other,
}

impl FileType {
    /// Classify by extension (with leading dot, any case)
    pub fn from_extension(ext: &str) -> FileType {
        match ext.to_ascii_lowercase().as_str() {
            ".qcow2" | ".img" | ".vmdk" | ".iso" => FileType::Disk,
            ".yml" | ".yaml" => FileType::Template,
            ".txt" | ".md" => FileType::Document,
            ".tar.gz" | ".tgz" | ".zip" => FileType::Archive,
            ".py" | ".sh" => FileType::Script,
            ".png" => FileType::Image,
            _ => FileType::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub md5: String,
    pub sha1: String,
}

/// One downloadable file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub url: String,
    pub size: u64,
    pub human_size: String,
    pub file_type: FileType,
    pub extension: String,
    pub checksum: Checksum,
}

// ============================================================================
// Image records
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Where the lab host installs the files
    pub download_path: String,
    pub total_size: u64,
    pub total_human_size: String,
}

/// A catalog entry
///
/// `id` is zero until the aggregator numbers the family list; it is always
/// serialized first so catalog diffs stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub family: Family,
    pub files: Vec<FileEntry>,
    pub metadata: ImageMetadata,
}

impl ImageRecord {
    /// Build an unnumbered record, totalling the file sizes.
    ///
    /// Returns `None` for an empty file list: a record always carries files.
    pub fn new(
        name: impl Into<String>,
        family: Family,
        files: Vec<FileEntry>,
        download_path: impl Into<String>,
    ) -> Option<Self> {
        if files.is_empty() {
            return None;
        }
        let total_size: u64 = files.iter().map(|f| f.size).sum();
        Some(Self {
            id: 0,
            name: name.into(),
            family,
            files,
            metadata: ImageMetadata {
                download_path: download_path.into(),
                total_size,
                total_human_size: human_size(total_size),
            },
        })
    }
}

/// Format a byte count with binary units, e.g. `512.0 B`, `1.5 GiB`.
///
/// This is the format the catalog browser already parses; it differs from
/// the CLI's table formatting on purpose.
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

    let mut num = bytes as f64;
    for unit in UNITS {
        if num.abs() < 1024.0 {
            return format!("{:.1} {}B", num, unit);
        }
        num /= 1024.0;
    }
    format!("{:.1} YiB", num)
}
