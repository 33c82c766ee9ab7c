//! CLI test cases.
//!
//! Anything that needs a real `tesseract` install is marked `#[ignore]`. Run
//! those with `cargo test -- --ignored`.

use std::{fs, path::PathBuf};

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

/// A tesseract path which doesn't exist.
static MISSING_TESSERACT: &str = "/nonexistent/tesseract";

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("survey-mapper").unwrap();
    // Don't let the developer's environment leak into tests.
    cmd.env_remove("TESSERACT_CMD").env_remove("RUST_LOG");
    cmd
}

/// Write a small white PNG.
fn blank_png(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("blank.png");
    RgbImage::from_pixel(64, 32, Rgb([255, 255, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_project_inverse() {
    cmd()
        .args(["project", "2615968.84", "584283.08"])
        .assert()
        .success()
        .stdout(predicate::str::contains("23.652234"))
        .stdout(predicate::str::contains("57.826426"));
}

#[test]
fn test_project_forward() {
    cmd()
        .args([
            "project",
            "--forward",
            "23.65223489035807",
            "57.826426702652626",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"northing\": 2615968.8"))
        .stdout(predicate::str::contains("\"easting\": 584283.0"));
}

#[test]
fn test_project_other_zone() {
    // Same offset from the central meridian, which is at 123°W in zone 10.
    cmd()
        .args(["project", "--utm-zone", "10", "2615968.84", "584283.08"])
        .assert()
        .success()
        .stdout(predicate::str::contains("23.652234"))
        .stdout(predicate::str::contains("-122.17357"));
}

#[test]
fn test_project_rejects_invalid_zone() {
    cmd()
        .args(["project", "--utm-zone", "61", "2615968.84", "584283.08"])
        .assert()
        .failure();
}

#[test]
fn test_project_out_of_domain() {
    cmd()
        .args(["project", "2615968.84", "20000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the valid area"));
}

#[test]
fn test_parse_stdin() {
    cmd()
        .arg("parse")
        .write_stdin("Point A 2615968.84 584283.08\nPoint B 2615990.10 584301.55\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"northing\": 2615968.84"))
        .stdout(predicate::str::contains("\"easting\": 584301.55"));
}

#[test]
fn test_parse_no_matches() {
    cmd()
        .arg("parse")
        .write_stdin("Scale 1:500\n261596.84 584283.08\n")
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
fn test_parse_file_to_output() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let input = dir.path().join("ocr.txt");
    let output = dir.path().join("pairs.json");
    fs::write(&input, "2615968.84 584283.08").unwrap();
    cmd()
        .arg("parse")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stdout("");
    let pairs: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(
        pairs,
        serde_json::json!([{ "northing": 2615968.84, "easting": 584283.08 }])
    );
}

#[test]
fn test_schema() {
    for schema_type in [
        "RawCoordinatePair",
        "GeoPoint",
        "UploadResponse",
        "ErrorResponse",
        "PipelineConfig",
    ] {
        cmd()
            .args(["schema", schema_type])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("\"title\": \"{schema_type}\"")));
    }
}

#[test]
fn test_extract_rejects_non_images() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let path = dir.path().join("notes.png");
    fs::write(&path, "2615968.84 584283.08").unwrap();
    cmd()
        .arg("extract")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown file type"));
}

#[test]
fn test_map_reports_missing_tesseract() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let image = blank_png(&dir);
    let output = dir.path().join("map.html");
    cmd()
        .env("TESSERACT_CMD", MISSING_TESSERACT)
        .arg("map")
        .arg(&image)
        .arg("-o")
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains(format!(
            "cannot run {MISSING_TESSERACT}"
        )));
    assert!(!output.exists());
}

#[test]
fn test_map_requires_output() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let image = blank_png(&dir);
    cmd().arg("map").arg(&image).assert().failure();
}

#[test]
#[ignore = "Needs tesseract installed"]
fn test_extract_blank_image() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let image = blank_png(&dir);
    cmd()
        .arg("extract")
        .arg(&image)
        .assert()
        .success()
        .stdout("[]\n");
}

#[test]
#[ignore = "Needs tesseract installed"]
fn test_map_blank_image_has_no_coordinates() {
    let dir = TempDir::with_prefix("cli_test").unwrap();
    let image = blank_png(&dir);
    cmd()
        .arg("map")
        .arg(&image)
        .arg("-o")
        .arg(dir.path().join("map.html"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No coordinates found in image"));
}
