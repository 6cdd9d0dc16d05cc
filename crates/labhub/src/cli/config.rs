//! Configuration resolution and the `config` command
//!
//! Priority:
//! 1. `--config` / `LABHUB_CONFIG`
//! 2. `./labhub.toml` if present
//! 3. Built-in defaults

use crate::cli::error::HelpfulError;
use labhub::catalog::{CatalogError, IndexConfig};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "labhub.toml";

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults,
}

impl ConfigOrigin {
    pub fn describe(&self) -> String {
        match self {
            ConfigOrigin::File(path) => path.display().to_string(),
            ConfigOrigin::Defaults => "built-in defaults".to_string(),
        }
    }
}

/// Resolve the configuration for this run
pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<(IndexConfig, ConfigOrigin)> {
    let candidate = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.is_file().then_some(local)
        }
    };

    let Some(path) = candidate else {
        return Ok((IndexConfig::default(), ConfigOrigin::Defaults));
    };

    if !path.exists() {
        return Err(HelpfulError::file_not_found(&path)
            .with_context("The configuration file passed with --config does not exist")
            .into());
    }

    match IndexConfig::load(&path) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "Loaded configuration");
            Ok((config, ConfigOrigin::File(path)))
        }
        Err(err @ (CatalogError::Toml { .. } | CatalogError::Config(_))) => {
            Err(HelpfulError::invalid_config(&path, &err.to_string()).into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Arguments for the config command
#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    /// Show the resolved configuration in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run the config command - shows the resolved configuration
pub fn run(args: ConfigArgs, explicit: Option<&Path>) -> anyhow::Result<()> {
    let (config, origin) = resolve(explicit)?;

    if args.json {
        let value = serde_json::json!({
            "origin": origin.describe(),
            "config": config,
            "log_dir": labhub_logging::logs_dir().to_string_lossy(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("LABHUB CONFIGURATION");
    println!("====================");
    println!();
    println!("Origin:     {}", origin.describe());
    println!("Output:     {}", config.output_dir.display());
    println!("Variant:    {}", config.variant);
    println!("Checksums:  {}", config.checksums);
    if let Some(limit) = config.truncate {
        println!("Truncate:   {} records per family", limit);
    }
    println!("Logs:       {}", labhub_logging::logs_dir().display());
    println!();
    println!(
        "Remote:     https://{}{}  (installs to {})",
        config.remote.host, config.remote.api_prefix, config.remote.install_root
    );
    println!();
    println!("Sources:");
    for source in &config.sources {
        let families: Vec<&str> = source.families.iter().map(|f| f.as_str()).collect();
        println!(
            "  {} [{}] ({})",
            source.path.display(),
            families.join(", "),
            if source.path.is_dir() { "found" } else { "not found" }
        );
    }
    if !config.mirrors.is_empty() {
        println!();
        println!("Mirrors:");
        for mirror in &config.mirrors {
            println!("  {}: {} -> {}", mirror.variant, mirror.from, mirror.to);
        }
    }

    Ok(())
}
