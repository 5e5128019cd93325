//! Integration tests for `cpgrag index`, `cpgrag config` and global flags.

mod common;

use predicates::prelude::*;
use std::fs;

use common::{cpgrag_cmd, Sandbox};

#[test]
fn test_help_lists_commands() {
    cpgrag_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("index"))
        .stdout(predicate::str::contains("overview"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version() {
    cpgrag_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("cpgrag "));
}

#[test]
fn test_invalid_config_file() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.config_path(), "retrieval: [not, a, map]\n").unwrap();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize cpgrag engine"))
        .stderr(predicate::str::contains("Check your config at"));
}

// ============================================================================
// index
// ============================================================================

#[test]
fn test_index_missing_export() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["index", "does-not-exist.json", "--project", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[err]"))
        .stderr(predicate::str::contains("Hint: Export methods"));
}

#[test]
fn test_index_unreachable_embedder() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("index")
        .arg(sandbox.methods_path())
        .args(["--project", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[err]"));
}

#[test]
fn test_index_requires_project() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("index")
        .arg(sandbox.methods_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--project"));
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_show_yaml() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vectorStore:"))
        .stdout(predicate::str::contains("backend: simple"))
        .stdout(predicate::str::contains("topK: 5"));
}

#[test]
fn test_config_show_env_override() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .env("CPGRAG_TOP_K", "7")
        .env("CPGRAG_LLM_MODEL", "codellama:13b")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("topK: 7"))
        .stdout(predicate::str::contains("codellama:13b"));
}

#[test]
fn test_config_show_json() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["config", "show", "--json"])
        .output()
        .expect("run cpgrag");
    assert!(output.status.success());

    let config: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(config["retrieval"]["topK"], 5);
    assert_eq!(config["vectorStore"]["backend"], "simple");
}

#[test]
fn test_config_check_reports_unreachable() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["config", "check"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("vectorStore"))
        .stdout(predicate::str::contains("embedding"))
        .stdout(predicate::str::contains("error"))
        .stderr(predicate::str::contains("backend(s) unreachable"));
}

#[test]
fn test_config_check_json() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["config", "check", "--json"])
        .output()
        .expect("run cpgrag");
    assert!(!output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let checks = report["checks"].as_array().unwrap();
    let store = checks
        .iter()
        .find(|c| c["component"] == "vectorStore")
        .expect("vector store check");
    assert_eq!(store["ok"], true);
    let embedding = checks
        .iter()
        .find(|c| c["component"] == "embedding")
        .expect("embedding check");
    assert_eq!(embedding["ok"], false);
}
