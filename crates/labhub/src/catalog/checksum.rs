//! MD5/SHA-1 checksums for catalog files
//!
//! Checksums come from one of two places: the `.md5sum.txt` / `.sha1sum.txt`
//! sidecars written by the remote hash script into a family root, or a local
//! pass over the file. Hashing a multi-gigabyte disk over a network mount is
//! slow, so `auto` prefers the sidecars whenever both hashes are listed.

use super::error::{CatalogError, Result};
use super::types::Checksum;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub const MD5_SIDECAR: &str = ".md5sum.txt";
pub const SHA1_SIDECAR: &str = ".sha1sum.txt";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Where checksums are taken from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumMode {
    /// Sidecar values when both are listed, otherwise hash the file
    #[default]
    Auto,
    /// Always hash the file
    Compute,
    /// Only sidecar values; a missing entry is an error
    Sidecar,
}

impl ChecksumMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumMode::Auto => "auto",
            ChecksumMode::Compute => "compute",
            ChecksumMode::Sidecar => "sidecar",
        }
    }
}

impl fmt::Display for ChecksumMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ChecksumMode::Auto),
            "compute" => Ok(ChecksumMode::Compute),
            "sidecar" => Ok(ChecksumMode::Sidecar),
            other => Err(format!(
                "unknown checksum mode '{}' (expected auto, compute or sidecar)",
                other
            )),
        }
    }
}

/// Hash a file with MD5 and SHA-1 in a single read pass.
pub fn compute_file(path: &Path) -> Result<Checksum> {
    let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
    compute_reader(file).map_err(|e| CatalogError::io(path, e))
}

fn compute_reader(mut reader: impl Read) -> io::Result<Checksum> {
    let mut md5_ctx = md5::Context::new();
    let mut sha1_ctx = Sha1::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        md5_ctx.consume(&buf[..n]);
        sha1_ctx.update(&buf[..n]);
    }

    Ok(Checksum {
        md5: format!("{:x}", md5_ctx.compute()),
        sha1: format!("{:x}", sha1_ctx.finalize()),
    })
}

/// Parse `<hex>  <path>` lines as written by md5sum/sha1sum-style tools.
///
/// Paths are normalized to forward slashes without a leading `./`; the
/// binary-mode marker `*` is dropped.
pub fn parse_sidecar(content: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        let Some((hash, path)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let path = path.trim_start().trim_start_matches('*');
        if hash.is_empty() || path.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        entries.insert(normalize_key(path), hash.to_ascii_lowercase());
    }
    entries
}

fn normalize_key(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}

/// Checksum lookup for one family root
#[derive(Debug)]
pub struct ChecksumSource {
    mode: ChecksumMode,
    root: PathBuf,
    md5: HashMap<String, String>,
    sha1: HashMap<String, String>,
}

impl ChecksumSource {
    /// Load the sidecars of `root` (if the mode uses them).
    pub fn load(root: &Path, mode: ChecksumMode) -> Result<Self> {
        let (md5, sha1) = match mode {
            ChecksumMode::Compute => (HashMap::new(), HashMap::new()),
            ChecksumMode::Auto | ChecksumMode::Sidecar => (
                read_sidecar(&root.join(MD5_SIDECAR))?,
                read_sidecar(&root.join(SHA1_SIDECAR))?,
            ),
        };
        if !md5.is_empty() || !sha1.is_empty() {
            info!(
                root = %root.display(),
                md5 = md5.len(),
                sha1 = sha1.len(),
                "Loaded checksum sidecars"
            );
        }
        Ok(Self {
            mode,
            root: root.to_path_buf(),
            md5,
            sha1,
        })
    }

    /// Checksum for a file under the root
    pub fn checksum(&self, path: &Path) -> Result<Checksum> {
        if self.mode == ChecksumMode::Compute {
            return compute_file(path);
        }

        let key = path
            .strip_prefix(&self.root)
            .map(relative_key)
            .unwrap_or_else(|_| relative_key(path));

        match (self.md5.get(&key), self.sha1.get(&key)) {
            (Some(md5), Some(sha1)) => {
                debug!(file = %key, "Using sidecar checksums");
                Ok(Checksum {
                    md5: md5.clone(),
                    sha1: sha1.clone(),
                })
            }
            (listed_md5, _) if self.mode == ChecksumMode::Sidecar => Err(CatalogError::MissingChecksum {
                algorithm: if listed_md5.is_none() { "MD5" } else { "SHA-1" },
                path: path.to_path_buf(),
            }),
            _ => compute_file(path),
        }
    }
}

fn read_sidecar(path: &Path) -> Result<HashMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_sidecar(&content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(CatalogError::io(path, e)),
    }
}

/// Forward-slash relative path used as sidecar key and URL component
pub fn relative_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
