//! QEMU scanner
//!
//! A directory holding at least one `.qcow2` is a disk image: every visible
//! file in it belongs to the image, named after the directory. Anywhere else,
//! each `.tgz` / `.tar.gz` / `.zip` is an image of its own, named after the
//! archive without its extension.

use super::checksum::ChecksumSource;
use super::error::Result;
use super::scanner::{archive_extension, build_file_entry, file_name, is_hidden, list_files, ScanContext};
use super::types::{Family, ImageRecord};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

const DISK_EXTENSION: &str = ".qcow2";

pub(crate) fn scan(root: &Path, ctx: &ScanContext<'_>, limit: Option<usize>) -> Result<Vec<ImageRecord>> {
    let sums = ChecksumSource::load(root, ctx.checksums)?;
    let mut records = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let dir = entry.path();
        let files = list_files(dir)?;
        let has_disk = files
            .iter()
            .any(|f| file_name(f).to_ascii_lowercase().ends_with(DISK_EXTENSION));

        if has_disk {
            if limit.is_some_and(|max| records.len() >= max) {
                break;
            }
            let name = file_name(dir);
            let mut entries = Vec::with_capacity(files.len());
            for path in &files {
                entries.push(build_file_entry(ctx.remote, &sums, Family::Qemu, root, path, None)?);
            }
            let download_path = ctx.remote.download_path(Family::Qemu, &name);
            if let Some(record) = ImageRecord::new(name, Family::Qemu, entries, download_path) {
                debug!(
                    name = %record.name,
                    files = record.files.len(),
                    size = record.metadata.total_size,
                    "Added disk image directory"
                );
                ctx.report(Family::Qemu, records.len() + 1, &record.name);
                records.push(record);
            }
            continue;
        }

        for path in &files {
            let file = file_name(path);
            let Some(ext) = archive_extension(&file) else {
                continue;
            };
            if limit.is_some_and(|max| records.len() >= max) {
                break;
            }
            // The whole compound extension is stripped: `asav-9.tar.gz` is `asav-9`.
            let name = file[..file.len() - ext.len()].to_string();
            let entry = build_file_entry(ctx.remote, &sums, Family::Qemu, root, path, None)?;
            let download_path = ctx.remote.download_path(Family::Qemu, &name);
            if let Some(record) = ImageRecord::new(name, Family::Qemu, vec![entry], download_path) {
                debug!(name = %record.name, archive = %file, "Added archive image");
                ctx.report(Family::Qemu, records.len() + 1, &record.name);
                records.push(record);
            }
        }
    }

    if limit.is_some_and(|max| records.len() >= max) {
        debug!(records = records.len(), "Stopped at truncation limit");
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::checksum::ChecksumMode;
    use crate::catalog::config::RemoteConfig;
    use crate::catalog::types::FileType;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &Path, content: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scan_dir(root: &Path, limit: Option<usize>) -> Vec<ImageRecord> {
        let remote = RemoteConfig::default();
        let ctx = ScanContext::new(&remote, ChecksumMode::Compute);
        scan(root, &ctx, limit).unwrap()
    }

    #[test]
    fn test_qcow2_directory_includes_all_siblings() {
        let dir = TempDir::new().unwrap();
        let img = dir.path().join("linux-vyos-1.4");
        write(&img.join("virtioa.qcow2"), b"disk-a");
        write(&img.join("virtiob.qcow2"), b"disk-bb");
        write(&img.join("vyos.yaml"), b"template: vyos");
        write(&img.join("readme.txt"), b"hi");
        write(&img.join(".sha1sum.txt"), b"");

        let records = scan_dir(dir.path(), None);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.name, "linux-vyos-1.4");
        assert_eq!(record.family, Family::Qemu);
        assert_eq!(record.metadata.download_path, "/opt/unetlab/addons/qemu/linux-vyos-1.4");

        let urls: Vec<&str> = record.files.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://labhub.eu.org/api/raw/?path=/addons/qemu/linux-vyos-1.4/readme.txt",
                "https://labhub.eu.org/api/raw/?path=/addons/qemu/linux-vyos-1.4/virtioa.qcow2",
                "https://labhub.eu.org/api/raw/?path=/addons/qemu/linux-vyos-1.4/virtiob.qcow2",
                "https://labhub.eu.org/api/raw/?path=/addons/qemu/linux-vyos-1.4/vyos.yaml",
            ]
        );
        assert_eq!(record.files[1].file_type, FileType::Disk);
        assert_eq!(record.files[3].file_type, FileType::Template);
        assert_eq!(record.files[0].file_type, FileType::Document);
        assert_eq!(record.metadata.total_size, 2 + 6 + 7 + 14);
    }

    #[test]
    fn test_archives_become_single_file_images() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("bundles/asa-9.tar.gz"), b"tarball");
        write(&dir.path().join("bundles/win10.zip"), b"zip");
        write(&dir.path().join("bundles/notes.md"), b"ignored");

        let records = scan_dir(dir.path(), None);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["asa-9", "win10"]);

        let asa = &records[0];
        assert_eq!(asa.files.len(), 1);
        assert_eq!(asa.files[0].extension, ".tar.gz");
        assert_eq!(asa.files[0].file_type, FileType::Archive);
        assert_eq!(
            asa.files[0].url,
            "https://labhub.eu.org/api/raw/?path=/addons/qemu/bundles/asa-9.tar.gz"
        );
        assert_eq!(asa.metadata.download_path, "/opt/unetlab/addons/qemu/asa-9");
    }

    #[test]
    fn test_archive_next_to_qcow2_is_part_of_directory_image() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("csr/virtioa.qcow2"), b"disk");
        write(&dir.path().join("csr/extras.zip"), b"zip");

        let records = scan_dir(dir.path(), None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "csr");
        assert_eq!(records[0].files.len(), 2);
    }

    #[test]
    fn test_unrecognized_directories_yield_nothing() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("empty-ish/readme.txt"), b"nothing here");
        fs::create_dir_all(dir.path().join("really-empty")).unwrap();
        write(&dir.path().join(".trash/old.qcow2"), b"hidden");

        assert!(scan_dir(dir.path(), None).is_empty());
    }

    #[test]
    fn test_nested_image_directories() {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("vendor/a-router/hda.qcow2"), b"a");
        write(&dir.path().join("vendor/b-switch/hda.qcow2"), b"b");

        let records = scan_dir(dir.path(), None);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a-router", "b-switch"]);
        assert!(records[1].files[0].url.ends_with("/addons/qemu/vendor/b-switch/hda.qcow2"));
    }

    #[test]
    fn test_truncate_limits_records() {
        let dir = TempDir::new().unwrap();
        for name in ["a", "b", "c"] {
            write(&dir.path().join(name).join("hda.qcow2"), b"x");
        }
        write(&dir.path().join("d.zip"), b"z");

        let records = scan_dir(dir.path(), Some(2));
        assert_eq!(records.len(), 2);
    }
}
