//! Error types for catalog generation

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Catalog error type
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Image root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("No {algorithm} sidecar entry for {path}")]
    MissingChecksum {
        algorithm: &'static str,
        path: PathBuf,
    },

    #[error("Invalid catalog {path}: {message}")]
    InvalidCatalog { path: PathBuf, message: String },
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CatalogError>;
