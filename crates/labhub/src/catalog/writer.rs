//! Catalog file output
//!
//! Files are pretty-printed with four-space indentation and replaced
//! atomically: the JSON goes to a temporary file next to the target, which is
//! then renamed over it. A reader never sees a half-written catalog.

use super::aggregate::Catalog;
use super::error::{CatalogError, Result};
use super::types::Family;
use serde::Serialize;
use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// `index.<variant>.<family>.json`
pub fn family_file_name(variant: &str, family: Family) -> String {
    format!("index.{}.{}.json", variant, family.as_str())
}

/// `index.<variant>.json`
pub fn merged_file_name(variant: &str) -> String {
    format!("index.{}.json", variant)
}

/// Serialize with four-space indentation and a trailing newline.
pub fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Replace `path` with `bytes` in one rename.
///
/// The replacement keeps the permissions of the file it replaces; a new file
/// gets `0644` on Unix.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CatalogError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| CatalogError::io(tmp.path(), e))?;
    let permissions = target_permissions(path, tmp.as_file()).map_err(|e| CatalogError::io(path, e))?;
    tmp.as_file()
        .set_permissions(permissions)
        .map_err(|e| CatalogError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| CatalogError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| CatalogError::io(path, e.error))?;
    Ok(())
}

fn target_permissions(path: &Path, tmp: &File) -> io::Result<Permissions> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.permissions()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            #[allow(unused_mut)]
            let mut permissions = tmp.metadata()?.permissions();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                permissions.set_mode(0o644);
            }
            Ok(permissions)
        }
        Err(e) => Err(e),
    }
}

/// Write the per-family files and the merged file of one variant.
///
/// Returns the written paths, per-family files first.
pub fn write_catalog(output_dir: &Path, variant: &str, catalog: &Catalog) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|e| CatalogError::io(output_dir, e))?;

    let mut written = Vec::with_capacity(Family::ALL.len() + 1);
    for family in Family::ALL {
        let path = output_dir.join(family_file_name(variant, family));
        write_atomic(&path, &to_json_bytes(catalog.family(family))?)?;
        info!(path = %path.display(), records = catalog.family(family).len(), "Wrote family catalog");
        written.push(path);
    }

    let merged = output_dir.join(merged_file_name(variant));
    write_atomic(&merged, &to_json_bytes(catalog)?)?;
    info!(path = %merged.display(), records = catalog.total_records(), "Wrote merged catalog");
    written.push(merged);

    Ok(written)
}

/// Read a merged catalog file.
pub fn read_merged(path: &Path) -> Result<Catalog> {
    let content = std::fs::read(path).map_err(|e| CatalogError::io(path, e))?;
    serde_json::from_slice(&content).map_err(|e| CatalogError::InvalidCatalog {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{human_size, Checksum, FileEntry, FileType, ImageRecord};
    use tempfile::TempDir;

    fn sample_catalog() -> Catalog {
        let file = FileEntry {
            url: "https://labhub.eu.org/api/raw/?path=/addons/dynamips/c7200.image".to_string(),
            size: 3,
            human_size: human_size(3),
            file_type: FileType::Firmware,
            extension: ".image".to_string(),
            checksum: Checksum {
                md5: "m".to_string(),
                sha1: "s".to_string(),
            },
        };
        let mut record =
            ImageRecord::new("c7200.image", Family::Dynamips, vec![file], "/opt/unetlab/addons/dynamips/")
                .unwrap();
        record.id = 1;
        Catalog {
            dynamips: vec![record],
            ..Catalog::default()
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(family_file_name("od", Family::Iol), "index.od.iol.json");
        assert_eq!(merged_file_name("gd"), "index.gd.json");
    }

    #[test]
    fn test_to_json_bytes_uses_four_spaces() {
        let text = String::from_utf8(to_json_bytes(&vec![1, 2]).unwrap()).unwrap();
        assert_eq!(text, "[\n    1,\n    2\n]\n");
    }

    #[test]
    fn test_merged_key_order() {
        let text = String::from_utf8(to_json_bytes(&sample_catalog()).unwrap()).unwrap();
        let qemu = text.find("\"QEMU\"").unwrap();
        let iol = text.find("\"IOL\"").unwrap();
        let dynamips = text.find("\"DYNAMIPS\"").unwrap();
        assert!(qemu < iol && iol < dynamips);
    }

    #[test]
    fn test_write_catalog_and_read_back() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        let catalog = sample_catalog();

        let written = write_catalog(&out, "od", &catalog).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["index.od.qemu.json", "index.od.iol.json", "index.od.dynamips.json", "index.od.json"]
        );

        assert_eq!(read_merged(&out.join("index.od.json")).unwrap(), catalog);
        let dynamips: Vec<ImageRecord> =
            serde_json::from_slice(&fs::read(out.join("index.od.dynamips.json")).unwrap()).unwrap();
        assert_eq!(dynamips, catalog.dynamips);
        assert_eq!(fs::read_to_string(out.join("index.od.qemu.json")).unwrap(), "[]\n");
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.od.json");
        fs::write(&path, "old contents that are longer").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.od.iol.json");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        write_atomic(&path, b"new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_catalog_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        write_catalog(dir.path(), "od", &sample_catalog()).unwrap();
        for name in ["index.od.qemu.json", "index.od.json"] {
            let mode = fs::metadata(dir.path().join(name)).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o644, "{}", name);
        }
    }

    #[test]
    fn test_read_merged_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.od.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(read_merged(&path), Err(CatalogError::InvalidCatalog { .. })));
    }
}
