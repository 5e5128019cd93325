//! Source-code lookup for prompt candidates.
//!
//! The indexed document is a retrieval-oriented serialization; when the
//! method export is at hand the prompt shows the method's real source
//! instead. Code that looks like lowered CPG text is not trusted.

use std::path::Path;
use std::sync::OnceLock;

use cpgrag_db::{MethodExport, MethodRecord};
use regex::Regex;
use tracing::debug;

use crate::errors::{CpgRagError, CpgRagResult};
use crate::types::Candidate;

/// Shorter export code is treated as missing.
const MIN_SOURCE_CHARS: usize = 30;

fn lowered_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"tmp\d+|__iter__|__next__|manager_tmp").expect("Invalid regex")
    })
}

/// Whether `code` looks like Joern's lowered representation rather than source.
pub fn looks_lowered(code: &str) -> bool {
    lowered_code_pattern().is_match(code)
}

/// Extract the `Code:` section of an indexed document.
///
/// The section runs up to the next `Calls`/`In:` line.
pub fn code_section(document: &str) -> Option<&str> {
    let (_, rest) = document.split_once("Code:\n")?;
    let end = ["\nCalls", "\nIn:"]
        .iter()
        .filter_map(|marker| rest.find(marker))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Method export indexed for code lookups.
#[derive(Debug, Clone, Default)]
pub struct MethodCatalog {
    export: MethodExport,
}

impl MethodCatalog {
    /// Load the export at `path`.
    pub fn load(path: &Path) -> CpgRagResult<Self> {
        let export = MethodExport::load(path).map_err(|e| CpgRagError::MethodExport {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded {} methods for source lookup", export.len());
        Ok(Self { export })
    }

    pub fn from_export(export: MethodExport) -> Self {
        Self { export }
    }

    pub fn methods(&self) -> &[MethodRecord] {
        &self.export.methods
    }

    /// Usable source code for `candidate` from the export, if any.
    pub fn source_for(&self, candidate: &Candidate) -> Option<&str> {
        let record = self
            .export
            .find(&candidate.method_name, candidate.lookup_path())?;
        let code = record.code.trim();
        if code.is_empty() || code == "<empty>" || code.chars().count() < MIN_SOURCE_CHARS {
            return None;
        }
        if looks_lowered(code) {
            return None;
        }
        Some(record.code.as_str())
    }
}

/// Code to show for `candidate`: export source, else the document's `Code:`
/// section, else the whole document.
pub fn resolve_code<'a>(candidate: &'a Candidate, catalog: Option<&'a MethodCatalog>) -> &'a str {
    if let Some(code) = catalog.and_then(|c| c.source_for(candidate)) {
        return code;
    }
    code_section(&candidate.document).unwrap_or(&candidate.document)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REAL: &str = "def validate_input(x):\n    if not x:\n        raise ValueError('empty')\n    return x";

    fn catalog() -> MethodCatalog {
        MethodCatalog::from_export(MethodExport {
            methods: vec![
                MethodRecord::new("validate_input", "src/app.py").with_code(REAL),
                MethodRecord::new("lowered", "src/app.py")
                    .with_code("tmp0 = iter(items)\nwhile True: x = tmp0.__next__()"),
                MethodRecord::new("tiny", "src/app.py").with_code("pass"),
            ],
        })
    }

    #[test]
    fn test_code_section() {
        let doc = "Method: f\nf\nCode:\ndef f():\n    return 1\nCalls methods: g\nIn: src/app.py";
        assert_eq!(code_section(doc), Some("def f():\n    return 1"));
        assert_eq!(code_section("Code:\nx = 1\nIn: a/b.py"), Some("x = 1"));
        assert_eq!(code_section("Method: f"), None);
    }

    #[test]
    fn test_prefers_export_source() {
        let candidate = Candidate::new("1", "validate_input", "src/app.py", 0.1)
            .with_document("Method: validate_input\nCode:\nindexed\nIn: src/app.py");
        let catalog = catalog();
        assert_eq!(resolve_code(&candidate, Some(&catalog)), REAL);
        assert_eq!(resolve_code(&candidate, None), "indexed");
    }

    #[test]
    fn test_lowered_and_short_code_rejected() {
        let catalog = catalog();
        let lowered = Candidate::new("2", "lowered", "src/app.py", 0.1).with_document("whole doc");
        assert_eq!(resolve_code(&lowered, Some(&catalog)), "whole doc");

        let tiny = Candidate::new("3", "tiny", "src/app.py", 0.1).with_document("whole doc");
        assert_eq!(resolve_code(&tiny, Some(&catalog)), "whole doc");
    }

    #[test]
    fn test_looks_lowered() {
        assert!(looks_lowered("with manager_tmp0:"));
        assert!(!looks_lowered("def template(x): return x"));
    }
}
