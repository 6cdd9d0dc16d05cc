//! Aggregation: run every scanner, sort, number
//!
//! Records of a family are collected from all sources first, then sorted by
//! name and numbered 1..N. The sort is stable, so two images sharing a name
//! keep their discovery order (source order, then walk order).

use super::config::{IndexConfig, MirrorConfig};
use super::error::Result;
use super::scanner::{scan_family, ScanContext};
use super::types::{Family, ImageRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All records of a run, keyed by family.
///
/// Field order is the key order of the merged catalog file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "QEMU", default)]
    pub qemu: Vec<ImageRecord>,
    #[serde(rename = "IOL", default)]
    pub iol: Vec<ImageRecord>,
    #[serde(rename = "DYNAMIPS", default)]
    pub dynamips: Vec<ImageRecord>,
}

impl Catalog {
    pub fn family(&self, family: Family) -> &[ImageRecord] {
        match family {
            Family::Qemu => &self.qemu,
            Family::Iol => &self.iol,
            Family::Dynamips => &self.dynamips,
        }
    }

    pub fn family_mut(&mut self, family: Family) -> &mut Vec<ImageRecord> {
        match family {
            Family::Qemu => &mut self.qemu,
            Family::Iol => &mut self.iol,
            Family::Dynamips => &mut self.dynamips,
        }
    }

    pub fn total_records(&self) -> usize {
        Family::ALL.iter().map(|f| self.family(*f).len()).sum()
    }

    /// Copy of the catalog with every file URL rewritten for a mirror
    pub fn with_mirror(&self, mirror: &MirrorConfig) -> Catalog {
        let mut mirrored = self.clone();
        for family in Family::ALL {
            for record in mirrored.family_mut(family) {
                for file in &mut record.files {
                    file.url = mirror.rewrite(&file.url);
                }
            }
        }
        mirrored
    }
}

/// Sort records by name (stable) and assign ids 1..N.
pub fn sort_and_number(records: &mut [ImageRecord]) {
    records.sort_by(|a, b| a.name.cmp(&b.name));
    for (idx, record) in records.iter_mut().enumerate() {
        record.id = idx as u32 + 1;
    }
}

/// Scan every configured source and build the numbered catalog.
///
/// Any scanner error aborts the whole collection.
pub fn collect(config: &IndexConfig, ctx: &ScanContext<'_>) -> Result<Catalog> {
    let mut catalog = Catalog::default();

    for family in Family::ALL {
        let records = catalog.family_mut(family);
        for source in config.sources.iter().filter(|s| s.families.contains(&family)) {
            let remaining = match config.truncate {
                Some(max) if records.len() >= max => break,
                Some(max) => Some(max - records.len()),
                None => None,
            };
            let root = source.family_root(family);
            records.extend(scan_family(family, &root, ctx, remaining)?);
        }

        if records.is_empty() {
            warn!(family = %family, "No images found");
        }
        sort_and_number(records);
        info!(family = %family, records = records.len(), "Family catalog ready");
    }

    Ok(catalog)
}
