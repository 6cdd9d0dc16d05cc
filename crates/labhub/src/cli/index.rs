//! `labhub index` - scan the sources and write every catalog variant

use crate::cli::error::HelpfulError;
use crate::cli::output::{color_for_family, format_number, print_table_colored};
use indicatif::{ProgressBar, ProgressStyle};
use labhub::catalog::{
    collect, human_size, write_catalog, Catalog, ChecksumMode, Family, IndexConfig,
    ScanContext, ScanProgress, SourceConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Arguments for the index command
#[derive(Debug, clap::Args)]
pub struct IndexArgs {
    /// Mirror tree to scan (repeatable; replaces the configured sources)
    #[arg(short, long = "source", value_name = "DIR")]
    pub sources: Vec<PathBuf>,

    /// Directory the catalogs are written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Where checksums come from: auto, compute or sidecar
    #[arg(long)]
    pub checksums: Option<ChecksumMode>,

    /// Stop each family after N records
    #[arg(long, value_name = "N")]
    pub truncate: Option<usize>,

    /// Only write the primary variant
    #[arg(long)]
    pub no_mirrors: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct FamilySummary {
    family: Family,
    records: usize,
    files: usize,
    total_size: u64,
}

#[derive(Debug, Serialize)]
struct IndexSummary {
    output_dir: PathBuf,
    variants: Vec<String>,
    families: Vec<FamilySummary>,
    files_written: Vec<PathBuf>,
}

impl IndexSummary {
    fn new(config: &IndexConfig, catalog: &Catalog, variants: Vec<String>, files_written: Vec<PathBuf>) -> Self {
        let families = Family::ALL
            .into_iter()
            .map(|family| {
                let records = catalog.family(family);
                FamilySummary {
                    family,
                    records: records.len(),
                    files: records.iter().map(|r| r.files.len()).sum(),
                    total_size: records.iter().map(|r| r.metadata.total_size).sum(),
                }
            })
            .collect();
        Self {
            output_dir: config.output_dir.clone(),
            variants,
            families,
            files_written,
        }
    }
}

/// Apply command-line overrides on top of the resolved configuration
fn apply_overrides(mut config: IndexConfig, args: &IndexArgs) -> anyhow::Result<IndexConfig> {
    if !args.sources.is_empty() {
        config.sources = args.sources.iter().map(SourceConfig::all_families).collect();
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(mode) = args.checksums {
        config.checksums = mode;
    }
    if args.truncate.is_some() {
        config.truncate = args.truncate;
    }
    if args.no_mirrors {
        config.mirrors.clear();
    }
    config.validate()?;
    Ok(config)
}

/// Fail early, with suggestions, when a source or one of its family roots is missing
fn check_sources(config: &IndexConfig) -> anyhow::Result<()> {
    for source in &config.sources {
        if !source.path.exists() {
            return Err(HelpfulError::source_not_found(&source.path).into());
        }
        if !source.path.is_dir() {
            return Err(HelpfulError::not_a_directory(&source.path).into());
        }
        for family in &source.families {
            let root = source.family_root(*family);
            if !root.is_dir() {
                return Err(HelpfulError::family_root_missing(&root, family.as_str()).into());
            }
        }
    }
    Ok(())
}

fn spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix:>8} {pos:>5} {wide_msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Run the index command
pub fn run(args: IndexArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let (config, _) = crate::cli::config::resolve(config_path)?;
    let config = apply_overrides(config, &args)?;
    check_sources(&config)?;

    let bar = spinner(args.json);
    let progress = |event: ScanProgress| {
        bar.set_prefix(event.family.as_str());
        bar.set_position(event.records as u64);
        bar.set_message(event.current);
    };
    let ctx = ScanContext::new(&config.remote, config.checksums).with_progress(&progress);

    let collected = collect(&config, &ctx);
    bar.finish_and_clear();
    let catalog = collected.map_err(|err| {
        anyhow::Error::new(err).context("Indexing aborted; no catalog files were written")
    })?;

    let mut variants = vec![config.variant.clone()];
    let mut files_written = write_catalog(&config.output_dir, &config.variant, &catalog)?;
    for mirror in &config.mirrors {
        let mirrored = catalog.with_mirror(mirror);
        files_written.extend(write_catalog(&config.output_dir, &mirror.variant, &mirrored)?);
        variants.push(mirror.variant.clone());
    }
    tracing::info!(
        records = catalog.total_records(),
        files = files_written.len(),
        "Catalogs written"
    );

    let summary = IndexSummary::new(&config, &catalog, variants, files_written);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let rows = summary
        .families
        .iter()
        .map(|f| {
            vec![
                (f.family.merged_key().to_string(), Some(color_for_family(f.family))),
                (format_number(f.records), None),
                (format_number(f.files), None),
                (human_size(f.total_size), None),
            ]
        })
        .collect();
    print_table_colored(&["FAMILY", "RECORDS", "FILES", "TOTAL SIZE"], rows);
    println!();
    println!(
        "Wrote {} files to {} (variants: {})",
        summary.files_written.len(),
        summary.output_dir.display(),
        summary.variants.join(", ")
    );

    Ok(())
}
