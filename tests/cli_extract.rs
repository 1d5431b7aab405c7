//! Integration tests for `fieldlens extract`, `map` and `config` on local files.
//!
//! Everything runs offline: `--no-llm` skips the language model and plain
//! text input never needs OCR.

#![allow(deprecated)] // cargo_bin deprecation: replacement not yet stable

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;

fn fieldlens() -> Command {
    Command::cargo_bin("fieldlens").expect("binary 'fieldlens' should be built")
}

/// Fresh scratch directory with an empty config file in it.
struct Scratch {
    dir: PathBuf,
}

impl Scratch {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("fieldlens-cli-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = fieldlens();
        cmd.arg("--config")
            .arg(self.dir.join("config.toml"))
            .env_remove("GROQ_API_KEY")
            .env("RUST_LOG", "off");
        cmd
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn extract_text_document_as_json() {
    let scratch = Scratch::new();
    let doc = scratch.write("claim.txt", "Policy Number: POL-123\nTotal: $500\n");

    let out = scratch
        .cmd()
        .args(["extract", "--no-llm"])
        .arg(&doc)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["raw_text"], "Policy Number: POL-123\nTotal: $500");
    assert_eq!(json["layout"]["characters"].as_array().unwrap().len(), 34);
    assert_eq!(json["layout"]["characters"][22]["char"], "\n");
    assert_eq!(json["fields"].as_array().unwrap().len(), 0);
}

#[test]
fn extract_summary_format() {
    let scratch = Scratch::new();
    let doc = scratch.write("note.txt", "hello\u{c}world");

    scratch
        .cmd()
        .args(["extract", "--no-llm", "--format", "summary"])
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 pages"))
        .stdout(predicate::str::contains("0 fields"));
}

#[test]
fn extract_persists_artifacts() {
    let scratch = Scratch::new();
    let doc = scratch.write("invoice.txt", "Total: $5");
    let out_dir = scratch.dir.join("out");

    scratch
        .cmd()
        .args(["extract", "--no-llm", "--output-dir"])
        .arg(&out_dir)
        .arg(&doc)
        .assert()
        .success();

    let mut names: Vec<String> = fs::read_dir(&out_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.starts_with("invoice_")));
    assert!(names[0].ends_with("_extracted.json"));
    assert!(names[1].ends_with("_layout.json"));
    assert!(names[2].ends_with("_raw_text.txt"));
}

#[test]
fn extract_binary_input_fails() {
    let scratch = Scratch::new();
    let path = scratch.dir.join("blob.bin");
    fs::write(&path, [0u8, 159, 146, 150]).unwrap();

    scratch
        .cmd()
        .args(["extract", "--no-llm"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported document format"));
}

#[test]
fn map_relocates_fields_from_artifacts() {
    let scratch = Scratch::new();
    let doc = scratch.write("claim.txt", "Policy Number: POL-123\nClaims[0].Amount: $500");
    let out_dir = scratch.dir.join("out");

    scratch
        .cmd()
        .args(["extract", "--no-llm", "--output-dir"])
        .arg(&out_dir)
        .arg(&doc)
        .assert()
        .success();

    let artifact = |suffix: &str| {
        fs::read_dir(&out_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.to_string_lossy().ends_with(suffix))
            .unwrap()
    };
    let fields = scratch.write(
        "fields.json",
        r#"[{"label":"Claims[0].Amount","value":"$500","snippet":"Claims[0].Amount: $500"},
            {"label":"Missing","value":"nowhere to be found"}]"#,
    );

    let out = scratch
        .cmd()
        .arg("map")
        .arg("--text")
        .arg(artifact("_raw_text.txt"))
        .arg("--layout")
        .arg(artifact("_layout.json"))
        .arg("--fields")
        .arg(&fields)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let mapped: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(mapped[0]["label"], "Claims[0].Amount");
    assert_eq!(mapped[0]["rects"].as_array().unwrap().len(), 1);
    assert_eq!(mapped[0]["rects"][0]["page"], 0);
    assert_eq!(mapped[1]["rects"].as_array().unwrap().len(), 0);
}

#[test]
fn config_prints_effective_settings() {
    let scratch = Scratch::new();
    scratch
        .cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("chunk_size = 25000"))
        .stdout(predicate::str::contains("GROQ_API_KEY: not set"));
}
