//! Joern method export records.
//!
//! The offline extraction pass dumps every method of a CPG into one JSON file:
//!
//! ```json
//! {"methods": [{"methodName": "validate_input", "fullName": "app.py:<module>.validate_input",
//!               "filePath": "app.py", "lineNumber": 12, "signature": "...",
//!               "code": "def validate_input(x): ...", "callees": ["len"], "paramNames": ["x"]}]}
//! ```
//!
//! Records are immutable after extraction. They feed the indexer, the
//! export graph backend and the source-code lookup of the prompt assembler.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// One method extracted from a CPG.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRecord {
    /// Short method name (`validate_input`, `<module>`, ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub method_name: String,

    /// Qualified name as Joern reports it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub full_name: String,

    /// Source file, relative to the analyzed root.
    #[serde(default, deserialize_with = "null_as_default")]
    pub file_path: String,

    /// First line of the method, if known.
    #[serde(default)]
    pub line_number: Option<u32>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub signature: String,

    /// Method source text (bounded by the extractor).
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,

    /// Names of called methods, operators included.
    #[serde(default, deserialize_with = "null_as_default")]
    pub callees: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub param_names: Vec<String>,
}

impl MethodRecord {
    /// Create a record with just a name and file, mostly for tests and fixtures.
    pub fn new(method_name: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    /// Builder: set the source code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Builder: set the callee names.
    pub fn with_callees<I, S>(mut self, callees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callees = callees.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    /// Whether `file_path` refers to the same file as this record.
    ///
    /// Paths from the index and from the export may differ in their root, so
    /// either one being a suffix of the other counts as a match.
    pub fn matches_file(&self, file_path: &str) -> bool {
        if file_path.is_empty() {
            return true;
        }
        self.file_path == file_path
            || self.file_path.ends_with(file_path)
            || file_path.ends_with(&self.file_path)
    }
}

/// The whole export file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodExport {
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
}

impl MethodExport {
    /// Load an export from disk.
    pub fn load(path: &Path) -> DbResult<Self> {
        debug!("Loading method export from {:?}", path);
        let content = fs::read_to_string(path)?;
        let export = Self::from_json_str(&content).map_err(|e| DbError::ExportParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        debug!("Loaded {} method records", export.methods.len());
        Ok(export)
    }

    /// Parse an export from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Find a method by name, preferring the one in `file_path` when given.
    pub fn find(&self, method_name: &str, file_path: Option<&str>) -> Option<&MethodRecord> {
        let mut by_name = self.methods.iter().filter(|m| m.method_name == method_name);
        match file_path {
            Some(path) if !path.is_empty() => {
                let candidates: Vec<&MethodRecord> = by_name.collect();
                candidates
                    .iter()
                    .find(|m| m.file_path == path)
                    .or_else(|| candidates.iter().find(|m| m.matches_file(path)))
                    .copied()
            }
            _ => by_name.next(),
        }
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

/// Joern writes `null` for absent strings and lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "methods": [
            {"methodName": "validate_input", "fullName": "app.py:<module>.validate_input",
             "filePath": "src/app.py", "lineNumber": 12, "signature": "ANY(ANY)",
             "code": "def validate_input(x):\n    return len(x) > 0",
             "callees": ["len", "<operator>.greaterThan"], "paramNames": ["x"]},
            {"methodName": "validate_input", "filePath": "tests/test_app.py", "code": null,
             "callees": null, "lineNumber": null},
            {"methodName": "<module>", "filePath": "src/app.py"}
        ]
    }"#;

    #[test]
    fn test_parse_export_with_nulls() {
        let export = MethodExport::from_json_str(SAMPLE).unwrap();
        assert_eq!(export.len(), 3);

        let first = &export.methods[0];
        assert_eq!(first.method_name, "validate_input");
        assert_eq!(first.line_number, Some(12));
        assert_eq!(first.param_names, vec!["x"]);

        let second = &export.methods[1];
        assert!(second.code.is_empty());
        assert!(second.callees.is_empty());
        assert_eq!(second.line_number, None);
    }

    #[test]
    fn test_find_prefers_file_path() {
        let export = MethodExport::from_json_str(SAMPLE).unwrap();

        let hit = export.find("validate_input", Some("tests/test_app.py")).unwrap();
        assert_eq!(hit.file_path, "tests/test_app.py");

        let hit = export.find("validate_input", Some("app.py")).unwrap();
        assert_eq!(hit.file_path, "src/app.py");

        let hit = export.find("validate_input", None).unwrap();
        assert_eq!(hit.file_path, "src/app.py");

        assert!(export.find("missing", None).is_none());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("methods.json");
        fs::write(&path, "{not json").unwrap();

        let err = MethodExport::load(&path).unwrap_err();
        assert!(matches!(err, DbError::ExportParse { .. }));
        assert!(err.to_string().contains("methods.json"));
    }
}
