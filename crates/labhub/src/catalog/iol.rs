//! IOL scanner: every `*.bin` in `addons/iol/bin` is one image.

use super::error::Result;
use super::scanner::{scan_flat, ScanContext};
use super::types::{Family, ImageRecord};
use std::path::Path;

const IMAGE_EXTENSION: &str = ".bin";

pub(crate) fn scan(root: &Path, ctx: &ScanContext<'_>, limit: Option<usize>) -> Result<Vec<ImageRecord>> {
    scan_flat(Family::Iol, IMAGE_EXTENSION, root, ctx, limit)
}
