//! `labhub renumber` - re-sort and re-number catalog files in place

use labhub::catalog::{renumber_file, RenumberOutcome};
use std::path::PathBuf;

/// Arguments for the renumber command
#[derive(Debug, clap::Args)]
pub struct RenumberArgs {
    /// Catalog files to rewrite (family lists or merged catalogs)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Run the renumber command
///
/// Missing and empty files are skipped with a warning; a malformed file
/// aborts the run, leaving it untouched.
pub fn run(args: RenumberArgs) -> anyhow::Result<()> {
    for path in &args.files {
        match renumber_file(path)? {
            RenumberOutcome::Renumbered { lists, records } => {
                println!("{}: {} records in {} list(s)", path.display(), records, lists);
            }
            RenumberOutcome::Missing => {
                tracing::warn!(path = %path.display(), "Catalog file not found, skipping");
                eprintln!("WARNING: {} not found, skipped", path.display());
            }
            RenumberOutcome::Empty => {
                tracing::warn!(path = %path.display(), "Catalog file is empty, skipping");
                eprintln!("WARNING: {} is empty, skipped", path.display());
            }
        }
    }
    Ok(())
}
