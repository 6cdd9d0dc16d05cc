use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn labhub_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_labhub"))
}

fn run_cli(cwd: &Path, args: &[&str]) -> Output {
    Command::new(labhub_bin())
        .current_dir(cwd)
        .args(args)
        .env("LABHUB_HOME", cwd.join(".labhub-home"))
        .env("RUST_LOG", "error")
        .env_remove("LABHUB_CONFIG")
        .output()
        .expect("failed to execute labhub CLI")
}

fn parse_json_output(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json_start = stdout.find(['{', '[']).unwrap_or_else(|| {
        panic!(
            "no JSON payload found in output\nstdout:\n{}\nstderr:\n{}",
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    });
    let mut deserializer = serde_json::Deserializer::from_str(&stdout[json_start..]);
    Value::deserialize(&mut deserializer).unwrap_or_else(|err| {
        panic!(
            "failed to parse JSON output: {}\nstdout:\n{}\nstderr:\n{}",
            err,
            stdout,
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{} failed\nstdout:\n{}\nstderr:\n{}",
        what,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// One mirror tree with images of every family
fn build_tree(root: &Path) {
    let addons = root.join("addons");
    write(&addons.join("qemu/vyos-1.4/virtioa.qcow2"), b"vyos disk");
    write(&addons.join("qemu/vyos-1.4/readme.txt"), b"notes");
    write(&addons.join("qemu/asa/asav-9.tar.gz"), b"archive");
    write(&addons.join("qemu/empty-dir/.keep"), b"");
    write(&addons.join("iol/bin/i86bi-linux-l3.bin"), b"l3");
    write(&addons.join("iol/bin/i86bi-linux-l2.bin"), b"l2");
    write(&addons.join("dynamips/c7200-adventerprisek9.image"), b"c7200");
}

fn index(cwd: &Path, source: &Path, out: &Path) -> Value {
    let output = run_cli(
        cwd,
        &[
            "index",
            "--source",
            source.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--checksums",
            "compute",
            "--json",
        ],
    );
    assert_success(&output, "index");
    parse_json_output(&output)
}

#[test]
fn index_writes_numbered_catalogs() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("UNETLAB I");
    let out = work.path().join("dist");
    build_tree(&source);

    let summary = index(work.path(), &source, &out);
    assert_eq!(summary["variants"], serde_json::json!(["od", "gd"]));
    assert_eq!(summary["files_written"].as_array().unwrap().len(), 8);

    let qemu = read_json(&out.join("index.od.qemu.json"));
    let names: Vec<&str> = qemu
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["asav-9", "vyos-1.4"]);
    assert_eq!(qemu[0]["id"], 1);
    assert_eq!(qemu[1]["id"], 2);

    // Sibling files of a disk image belong to the same record
    let vyos = &qemu[1];
    assert_eq!(vyos["files"].as_array().unwrap().len(), 2);
    assert_eq!(vyos["metadata"]["total_size"], 14);
    assert_eq!(vyos["metadata"]["download_path"], "/opt/unetlab/addons/qemu/vyos-1.4");

    let iol = read_json(&out.join("index.od.iol.json"));
    assert_eq!(iol[0]["name"], "i86bi-linux-l2.bin");
    assert_eq!(iol[0]["metadata"]["download_path"], "/opt/unetlab/addons/iol/bin/");

    // Merged file is the union of the family files
    let merged = read_json(&out.join("index.od.json"));
    assert_eq!(merged["QEMU"], qemu);
    assert_eq!(merged["IOL"], iol);
    assert_eq!(merged["DYNAMIPS"], read_json(&out.join("index.od.dynamips.json")));
}

#[test]
fn mirror_variant_rewrites_urls() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("src");
    let out = work.path().join("dist");
    build_tree(&source);
    index(work.path(), &source, &out);

    let od = read_json(&out.join("index.od.dynamips.json"));
    let gd = read_json(&out.join("index.gd.dynamips.json"));
    assert_eq!(
        od[0]["files"][0]["url"],
        "https://labhub.eu.org/api/raw/?path=/addons/dynamips/c7200-adventerprisek9.image"
    );
    assert_eq!(
        gd[0]["files"][0]["url"],
        "https://drive.labhub.eu.org/0:/addons/dynamips/c7200-adventerprisek9.image"
    );
    assert_eq!(od[0]["files"][0]["checksum"], gd[0]["files"][0]["checksum"]);
}

#[test]
fn reindexing_is_byte_identical() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("src");
    let out = work.path().join("dist");
    build_tree(&source);

    index(work.path(), &source, &out);
    let first = fs::read(out.join("index.od.json")).unwrap();
    index(work.path(), &source, &out);
    let second = fs::read(out.join("index.od.json")).unwrap();

    assert_eq!(first, second);
    assert!(first.ends_with(b"\n"));
}

#[test]
fn missing_source_fails_with_suggestions() {
    let work = TempDir::new().unwrap();
    let output = run_cli(
        work.path(),
        &["index", "--source", work.path().join("absent").to_str().unwrap()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Source not found"), "stderr:\n{}", stderr);
    assert!(stderr.contains("TRY:"));
}

#[test]
fn check_and_renumber_existing_catalog() {
    let work = TempDir::new().unwrap();
    let source = work.path().join("src");
    let out = work.path().join("dist");
    build_tree(&source);
    // Same firmware uploaded twice
    write(&source.join("addons/iol/bin/copy-of-l2.bin"), b"l2");
    index(work.path(), &source, &out);

    let merged = out.join("index.od.json");
    let output = run_cli(work.path(), &["check", merged.to_str().unwrap(), "--json"]);
    assert_success(&output, "check");
    let report = parse_json_output(&output);
    assert_eq!(report["duplicates"], 2);
    assert_eq!(report["families"][1]["family"], "iol");

    let output = run_cli(work.path(), &["check", merged.to_str().unwrap(), "--strict"]);
    assert!(!output.status.success());

    // Scramble the ids, then renumber
    let iol_path = out.join("index.od.iol.json");
    let mut iol = read_json(&iol_path);
    for record in iol.as_array_mut().unwrap() {
        record["id"] = Value::from(42);
    }
    fs::write(&iol_path, serde_json::to_string(&iol).unwrap()).unwrap();

    let output = run_cli(work.path(), &["renumber", iol_path.to_str().unwrap()]);
    assert_success(&output, "renumber");
    let iol = read_json(&iol_path);
    let ids: Vec<u64> = iol
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn config_json_reports_defaults() {
    let work = TempDir::new().unwrap();
    let output = run_cli(work.path(), &["config", "--json"]);
    assert_success(&output, "config");
    let value = parse_json_output(&output);
    assert_eq!(value["origin"], "built-in defaults");
    assert_eq!(value["config"]["variant"], "od");
    assert_eq!(value["config"]["mirrors"][0]["variant"], "gd");
    assert_eq!(value["config"]["sources"].as_array().unwrap().len(), 2);
}

#[test]
fn unusable_log_dir_falls_back_to_stderr() {
    let work = TempDir::new().unwrap();
    // A regular file where the home directory should be
    let home = work.path().join("not-a-dir");
    fs::write(&home, "x").unwrap();

    let output = Command::new(labhub_bin())
        .current_dir(work.path())
        .args(["config", "--json"])
        .env("LABHUB_HOME", &home)
        .env("RUST_LOG", "error")
        .env_remove("LABHUB_CONFIG")
        .output()
        .expect("failed to execute labhub CLI");

    assert_success(&output, "config");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("File logging disabled"), "stderr:\n{}", stderr);
    assert_eq!(parse_json_output(&output)["origin"], "built-in defaults");
}
