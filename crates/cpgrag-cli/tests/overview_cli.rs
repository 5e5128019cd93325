//! Integration tests for `cpgrag overview`.

mod common;

use predicates::prelude::*;

use common::Sandbox;

#[test]
fn test_overview_human() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("overview")
        .arg(sandbox.methods_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("OVERVIEW"))
        .stdout(predicate::str::contains("Files: 2"))
        .stdout(predicate::str::contains("Methods: 3"))
        .stdout(predicate::str::contains("main (src/app.py:3)"))
        .stdout(predicate::str::contains("main function"))
        .stdout(predicate::str::contains("src/io.py"));
}

#[test]
fn test_overview_json() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .args(["overview", "--json"])
        .arg(sandbox.methods_path())
        .output()
        .expect("run cpgrag");
    assert!(output.status.success());

    let overview: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(overview["totalMethods"], 3);
    assert_eq!(overview["totalFiles"], 2);
    assert_eq!(overview["entryPoints"][0]["methodName"], "main");
    assert_eq!(overview["modules"][0]["filePath"], "src/app.py");
    assert_eq!(overview["modules"][0]["methodCount"], 2);
}

#[test]
fn test_overview_needs_an_export() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("overview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No method export given"));
}

#[test]
fn test_overview_missing_file() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["overview", "nowhere.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Hint: Export methods"));
}
