//! Shared test utilities for cpgrag-cli integration tests.
//!
//! Every test runs offline: the vector store is the JSONL backend in a temp
//! dir and model servers point at a closed port.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Address where nothing listens.
pub const DEAD_URL: &str = "http://127.0.0.1:9";

/// Small method export with a caller/callee pair and a module entry.
pub const METHODS_JSON: &str = r#"{"methods": [
  {"methodName": "<module>", "filePath": "src/app.py", "code": "import sys\nmain()"},
  {"methodName": "main", "fullName": "app.py:<module>.main", "filePath": "src/app.py", "lineNumber": 3,
   "code": "def main():\n    data = load()\n    validate_input(data)",
   "callees": ["load", "validate_input", "<operator>.assignment"]},
  {"methodName": "validate_input", "filePath": "src/app.py", "lineNumber": 10,
   "code": "def validate_input(data):\n    if not data:\n        raise ValueError('empty input')",
   "callees": ["ValueError"], "paramNames": ["data"]},
  {"methodName": "load", "filePath": "src/io.py", "lineNumber": 1,
   "code": "def load():\n    return open('input.txt').read()"}
]}"#;

/// Get a Command for the cpgrag binary with a clean environment.
///
/// # Panics
///
/// Panics if the cpgrag binary cannot be found.
#[allow(deprecated)]
pub fn cpgrag_cmd() -> Command {
    let mut cmd = Command::cargo_bin("cpgrag").expect("cpgrag binary should exist");
    for var in [
        "CPGRAG_CONFIG",
        "CPGRAG_PROJECT",
        "CPGRAG_VERBOSE",
        "CPGRAG_QUIET",
        "CPGRAG_COLOR",
        "CPGRAG_OLLAMA_URL",
        "CPGRAG_LLM_MODEL",
        "CPGRAG_EMBEDDING_MODEL",
        "CPGRAG_CHROMA_URL",
        "CPGRAG_TOP_K",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

/// Temp directory holding a config file and a method export.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let sandbox = Self { dir };

        let config = format!(
            "vectorStore:\n  backend: simple\n  path: {vectors}\n\
             embedding:\n  baseUrl: {url}\n  timeoutSecs: 2\n\
             llm:\n  baseUrl: {url}\n  timeoutSecs: 2\n",
            vectors = sandbox.path().join("vectors").display(),
            url = DEAD_URL,
        );
        fs::write(sandbox.config_path(), config).expect("write config");
        fs::write(sandbox.methods_path(), METHODS_JSON).expect("write methods");
        sandbox
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.yaml")
    }

    pub fn methods_path(&self) -> PathBuf {
        self.path().join("methods.json")
    }

    /// `cpgrag --config <sandbox config> --color never`
    pub fn cmd(&self) -> Command {
        let mut cmd = cpgrag_cmd();
        cmd.arg("--config")
            .arg(self.config_path())
            .args(["--color", "never"]);
        cmd
    }
}
