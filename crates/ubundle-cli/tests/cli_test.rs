#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Integration tests for the ubundle CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ubundle_crypto::UnityCnCipher;
use ubundle_formats::bundle::BundleBuilder;

const KEY: &str = "5265616C6C794861726453656372657E";

fn write_bundle(dir: &Path, name: &str, builder: &BundleBuilder) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, builder.build().expect("build bundle")).expect("write bundle");
    path
}

fn sample_bundle(dir: &Path) -> PathBuf {
    let builder = BundleBuilder::new(7, "2021.3.15f1")
        .add_file("CAB-4e8f2a", b"serialized file".to_vec())
        .add_resource("CAB-4e8f2a.resS", vec![0x5A; 300]);
    write_bundle(dir, "sample.bundle", &builder)
}

fn encrypted_bundle(dir: &Path) -> PathBuf {
    // index nibbles form a permutation, as encryption requires
    let info = [
        0x7C, 0x2E, 0x05, 0xB9, 0x14, 0xD3, 0x6F, 0xA8, 0x31, 0x4B, 0x92, 0x07, 0xE5, 0x68, 0x2D,
        0xC0,
    ];
    let cipher = UnityCnCipher::create(KEY, info, [0x22; 16], [0x33; 16]).expect("cipher");
    let builder = BundleBuilder::new(7, "2020.3.34f1")
        .with_cipher(cipher)
        .add_file("CAB-secret", b"secret serialized file".to_vec());
    write_bundle(dir, "secret.bundle", &builder)
}

fn ubundle() -> Command {
    let mut cmd = Command::cargo_bin("ubundle").unwrap();
    cmd.env_remove("UBUNDLE_KEY").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_command() {
    ubundle()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("UnityFS"))
        .stdout(predicate::str::contains("info"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn test_version_command() {
    ubundle()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ubundle"));
}

#[test]
fn test_invalid_command() {
    ubundle()
        .arg("invalid")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_info_text() {
    let dir = TempDir::new().unwrap();
    let bundle = sample_bundle(dir.path());

    ubundle()
        .args(["--no-color", "info", "--blocks"])
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::contains("Signature: UnityFS"))
        .stdout(predicate::str::contains("2021.3.15f1"))
        .stdout(predicate::str::contains("Encryption Policy: modern"))
        .stdout(predicate::str::contains("CAB-4e8f2a.resS"))
        .stdout(predicate::str::contains("(2 entries)"));
}

#[test]
fn test_info_json() {
    let dir = TempDir::new().unwrap();
    let bundle = sample_bundle(dir.path());

    let output = ubundle()
        .args(["--format", "json", "info"])
        .arg(&bundle)
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["header"]["signature"], "UnityFS");
    assert_eq!(value["header"]["version"], 7);
    assert_eq!(value["header"]["encrypted"], false);
    assert_eq!(value["directory"][0]["path"], "CAB-4e8f2a");
    assert_eq!(value["directory"][0]["serialized_file"], true);
    assert_eq!(value["directory"][1]["size"], 300);
    assert!(value["offsets"]["file_data"].as_i64().unwrap() > 0);
    assert!(value.get("blocks").is_none());
}

#[test]
fn test_extract() {
    let dir = TempDir::new().unwrap();
    let bundle = sample_bundle(dir.path());
    let out = dir.path().join("out");

    ubundle()
        .args(["--no-color", "extract"])
        .arg(&bundle)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 entries"));

    assert_eq!(fs::read(out.join("CAB-4e8f2a")).unwrap(), b"serialized file");
    assert_eq!(fs::read(out.join("CAB-4e8f2a.resS")).unwrap(), vec![0x5A; 300]);
}

#[test]
fn test_extract_serialized_only() {
    let dir = TempDir::new().unwrap();
    let bundle = sample_bundle(dir.path());
    let out = dir.path().join("out");

    ubundle()
        .args(["extract", "--serialized-only"])
        .arg(&bundle)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();

    assert!(out.join("CAB-4e8f2a").is_file());
    assert!(!out.join("CAB-4e8f2a.resS").exists());
}

#[test]
fn test_extract_skips_escaping_paths() {
    let dir = TempDir::new().unwrap();
    let builder = BundleBuilder::new(7, "2021.3.15f1")
        .add_file("../escaped", b"nope".to_vec())
        .add_file("CAB-ok", b"fine".to_vec());
    let bundle = write_bundle(dir.path(), "hostile.bundle", &builder);
    let out = dir.path().join("out");

    ubundle()
        .args(["--no-color", "extract"])
        .arg(&bundle)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped unsafe path"));

    assert!(!dir.path().join("escaped").exists());
    assert!(out.join("CAB-ok").is_file());
}

#[test]
fn test_encrypted_bundle_needs_key() {
    let dir = TempDir::new().unwrap();
    let bundle = encrypted_bundle(dir.path());

    ubundle()
        .arg("info")
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no key was supplied"));
}

#[test]
fn test_encrypted_bundle_with_key() {
    let dir = TempDir::new().unwrap();
    let bundle = encrypted_bundle(dir.path());
    let out = dir.path().join("out");

    ubundle()
        .args(["--no-color", "info"])
        .arg(&bundle)
        .args(["--key", KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains("Encrypted: true"))
        .stdout(predicate::str::contains("Encryption Policy: legacy"));

    ubundle()
        .env("UBUNDLE_KEY", KEY)
        .arg("extract")
        .arg(&bundle)
        .arg("--output")
        .arg(&out)
        .assert()
        .success();
    assert_eq!(
        fs::read(out.join("CAB-secret")).unwrap(),
        b"secret serialized file"
    );
}

#[test]
fn test_wrong_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let bundle = encrypted_bundle(dir.path());

    ubundle()
        .arg("info")
        .arg(&bundle)
        .args(["--key", "00000000000000000000000000000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read bundle"));
}
