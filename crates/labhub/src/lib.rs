//! LabHub - Image Catalog Library
//!
//! Shared functionality for the `labhub` indexer binary.

pub mod catalog;

pub use catalog::{Catalog, Family, ImageRecord, IndexConfig};
