//! Duplicate detection over a merged catalog
//!
//! Two records with the same name, or two files with the same hash, usually
//! mean an image was uploaded twice under different directories.

use super::aggregate::Catalog;
use super::types::Family;
use serde::Serialize;
use std::collections::BTreeMap;

/// Duplicates found in one family; values are occurrence counts (> 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyDuplicates {
    pub family: Family,
    pub names: BTreeMap<String, usize>,
    pub md5: BTreeMap<String, usize>,
    pub sha1: BTreeMap<String, usize>,
}

impl FamilyDuplicates {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.md5.is_empty() && self.sha1.is_empty()
    }
}

/// Report for every family, in merged-catalog order
pub fn find_duplicates(catalog: &Catalog) -> Vec<FamilyDuplicates> {
    Family::ALL
        .into_iter()
        .map(|family| {
            let records = catalog.family(family);
            let mut names = BTreeMap::new();
            let mut md5 = BTreeMap::new();
            let mut sha1 = BTreeMap::new();

            for record in records {
                *names.entry(record.name.clone()).or_insert(0) += 1;
                for file in &record.files {
                    *md5.entry(file.checksum.md5.clone()).or_insert(0) += 1;
                    *sha1.entry(file.checksum.sha1.clone()).or_insert(0) += 1;
                }
            }

            FamilyDuplicates {
                family,
                names: only_repeated(names),
                md5: only_repeated(md5),
                sha1: only_repeated(sha1),
            }
        })
        .collect()
}

fn only_repeated(counts: BTreeMap<String, usize>) -> BTreeMap<String, usize> {
    counts.into_iter().filter(|(_, count)| *count > 1).collect()
}
