//! Indexer configuration
//!
//! Read from a TOML file (see `labhub.toml`); every field has a default that
//! reproduces the historical UNETLAB I / UNETLAB II layout.

use super::checksum::ChecksumMode;
use super::error::{CatalogError, Result};
use super::types::Family;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Characters left unescaped in URLs, in addition to ASCII alphanumerics
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/')
    .remove(b',')
    .remove(b'=')
    .remove(b'?');

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory the catalog files are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Name of the primary catalog variant (`index.<variant>.json`)
    #[serde(default = "default_variant")]
    pub variant: String,

    #[serde(default)]
    pub checksums: ChecksumMode,

    /// Stop each family after this many records
    #[serde(default)]
    pub truncate: Option<usize>,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    #[serde(default = "default_mirrors")]
    pub mirrors: Vec<MirrorConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            variant: default_variant(),
            checksums: ChecksumMode::default(),
            truncate: None,
            remote: RemoteConfig::default(),
            sources: default_sources(),
            mirrors: default_mirrors(),
        }
    }
}

/// Remote mirror layout used to build URLs and install paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_install_root")]
    pub install_root: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            api_prefix: default_api_prefix(),
            install_root: default_install_root(),
        }
    }
}

impl RemoteConfig {
    /// Download URL of a file.
    ///
    /// `relative_dir` is the file's directory relative to the family root,
    /// with forward slashes; empty at the root.
    pub fn file_url(&self, family: Family, relative_dir: &str, file_name: &str) -> String {
        let remote_path = format!("{}/addons/{}", self.api_prefix, family.addon_path());
        let mut url = format!("https://{}{}/", encode(&self.host), encode(&remote_path));
        if !relative_dir.is_empty() {
            url.push_str(&encode(relative_dir));
            url.push('/');
        }
        url.push_str(&encode(file_name));
        url
    }

    /// Install location on the lab host.
    ///
    /// QEMU images each get their own directory; IOL and Dynamips images
    /// share the family directory.
    pub fn download_path(&self, family: Family, name: &str) -> String {
        let root = self.install_root.trim_end_matches('/');
        match family {
            Family::Qemu => format!("{}/{}/{}", root, family.addon_path(), name),
            Family::Iol | Family::Dynamips => format!("{}/{}/", root, family.addon_path()),
        }
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, URL_ENCODE_SET).to_string()
}

/// A mounted mirror tree (the directory holding `addons/`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: PathBuf,
    #[serde(default = "default_families")]
    pub families: Vec<Family>,
}

impl SourceConfig {
    pub fn all_families(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            families: default_families(),
        }
    }

    /// Root directory of one family inside this source
    pub fn family_root(&self, family: Family) -> PathBuf {
        self.path.join("addons").join(family.addon_path())
    }
}

/// An alternative URL base; produces `index.<variant>.*.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub variant: String,
    pub from: String,
    pub to: String,
}

impl MirrorConfig {
    pub fn rewrite(&self, url: &str) -> String {
        url.replace(&self.from, &self.to)
    }
}

impl IndexConfig {
    /// Load and validate a config file.
    ///
    /// Relative source and output paths are resolved against the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let mut config: IndexConfig = toml::from_str(&content).map_err(|e| CatalogError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        for source in &mut self.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(CatalogError::Config("at least one source is required".to_string()));
        }
        for source in &self.sources {
            if source.families.is_empty() {
                return Err(CatalogError::Config(format!(
                    "source {} lists no families",
                    source.path.display()
                )));
            }
        }

        let mut variants = HashSet::new();
        for variant in std::iter::once(&self.variant).chain(self.mirrors.iter().map(|m| &m.variant)) {
            if !is_valid_variant(variant) {
                return Err(CatalogError::Config(format!(
                    "invalid variant name '{}' (use letters, digits, '-' or '_')",
                    variant
                )));
            }
            if !variants.insert(variant.as_str()) {
                return Err(CatalogError::Config(format!("duplicate variant '{}'", variant)));
            }
        }
        for mirror in &self.mirrors {
            if mirror.from.is_empty() {
                return Err(CatalogError::Config(format!(
                    "mirror '{}' has an empty 'from' pattern",
                    mirror.variant
                )));
            }
        }
        if self.truncate == Some(0) {
            return Err(CatalogError::Config("truncate must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn is_valid_variant(variant: &str) -> bool {
    !variant.is_empty()
        && variant
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_variant() -> String {
    "od".to_string()
}

fn default_host() -> String {
    "labhub.eu.org".to_string()
}

fn default_api_prefix() -> String {
    "/api/raw/?path=".to_string()
}

fn default_install_root() -> String {
    "/opt/unetlab/addons".to_string()
}

fn default_families() -> Vec<Family> {
    Family::ALL.to_vec()
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::all_families("../UNETLAB/UNETLAB I"),
        // Dynamips is not carried by UNETLAB II
        SourceConfig {
            path: PathBuf::from("../UNETLAB/UNETLAB II"),
            families: vec![Family::Qemu, Family::Iol],
        },
    ]
}

fn default_mirrors() -> Vec<MirrorConfig> {
    vec![MirrorConfig {
        variant: "gd".to_string(),
        from: "labhub.eu.org/api/raw/?path=/".to_string(),
        to: "drive.labhub.eu.org/0:/".to_string(),
    }]
}
