//! `labhub check` - report duplicate names and checksums in a merged catalog

use crate::cli::error::HelpfulError;
use crate::cli::output::{color_for_family, print_table_colored};
use labhub::catalog::{find_duplicates, read_merged, FamilyDuplicates};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Arguments for the check command
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Merged catalog file (index.<variant>.json)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with an error when duplicates are found
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    file: &'a Path,
    records: usize,
    duplicates: usize,
    families: &'a [FamilyDuplicates],
}

fn duplicate_count(report: &FamilyDuplicates) -> usize {
    report.names.len() + report.md5.len() + report.sha1.len()
}

/// Run the check command
pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    if !args.file.exists() {
        return Err(HelpfulError::file_not_found(&args.file).into());
    }

    let catalog = read_merged(&args.file)?;
    let families = find_duplicates(&catalog);
    let duplicates: usize = families.iter().map(duplicate_count).sum();

    if args.json {
        let report = CheckReport {
            file: &args.file,
            records: catalog.total_records(),
            duplicates,
            families: &families,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if duplicates == 0 {
        println!(
            "No duplicates in {} ({} records)",
            args.file.display(),
            catalog.total_records()
        );
    } else {
        let mut rows = Vec::new();
        for report in families.iter().filter(|r| !r.is_empty()) {
            let kinds = [("name", &report.names), ("md5", &report.md5), ("sha1", &report.sha1)];
            for (kind, values) in kinds {
                for (value, count) in values {
                    rows.push(vec![
                        (report.family.merged_key().to_string(), Some(color_for_family(report.family))),
                        (kind.to_string(), None),
                        (value.clone(), None),
                        (count.to_string(), None),
                    ]);
                }
            }
        }
        print_table_colored(&["FAMILY", "KIND", "VALUE", "COUNT"], rows);
    }

    if args.strict && duplicates > 0 {
        return Err(HelpfulError::duplicates_found(&args.file, duplicates).into());
    }
    Ok(())
}
