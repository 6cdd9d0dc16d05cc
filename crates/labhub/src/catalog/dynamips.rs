//! Dynamips scanner: every `*.image` in `addons/dynamips` is one image.

use super::error::Result;
use super::scanner::{scan_flat, ScanContext};
use super::types::{Family, ImageRecord};
use std::path::Path;

const IMAGE_EXTENSION: &str = ".image";

pub(crate) fn scan(root: &Path, ctx: &ScanContext<'_>, limit: Option<usize>) -> Result<Vec<ImageRecord>> {
    scan_flat(Family::Dynamips, IMAGE_EXTENSION, root, ctx, limit)
}
