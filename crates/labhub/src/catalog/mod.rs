//! Catalog - image discovery and JSON index generation
//!
//! Scans mounted LabHub mirror trees for QEMU, IOL and Dynamips images and
//! produces the numbered, per-family and merged catalogs served to the
//! catalog browser.

pub mod aggregate;
pub mod checksum;
pub mod config;
pub mod dupes;
pub mod dynamips;
pub mod error;
pub mod iol;
pub mod qemu;
pub mod renumber;
pub mod scanner;
pub mod types;
pub mod writer;

// Re-exports for CLI usage
pub use aggregate::{collect, sort_and_number, Catalog};
pub use checksum::{ChecksumMode, ChecksumSource};
pub use config::{IndexConfig, MirrorConfig, RemoteConfig, SourceConfig};
pub use dupes::{find_duplicates, FamilyDuplicates};
pub use error::{CatalogError, Result};
pub use renumber::{renumber_file, RenumberOutcome};
pub use scanner::{scan_family, ScanContext, ScanProgress};
pub use types::{human_size, Checksum, FileEntry, FileType, Family, ImageMetadata, ImageRecord};
pub use writer::{family_file_name, merged_file_name, read_merged, write_catalog};
