//! Codebase overview.
//!
//! Summarizes a method export without embeddings or a language model: how
//! many files and methods there are, which files hold the most methods,
//! how files group by role, which methods look like entry points, and which
//! naming patterns show up. This answers "what is in this code base?"
//! questions that vector search over single methods handles poorly.

use std::collections::{BTreeMap, HashMap, HashSet};

use cpgrag_db::{MethodExport, MethodRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::filter::is_placeholder_name;

/// Names that start a program.
const MAIN_FUNCTION_NAMES: &[&str] = &["main", "__main__", "run", "execute", "start"];

const INITIALIZER_NAMES: &[&str] = &["__init__"];

/// A method with more distinct callers than this is central.
const CENTRAL_MIN_CALLERS: usize = 10;

/// Files listed in [`CodebaseOverview::modules`].
const MAX_MODULES: usize = 20;

/// Method names shown per module.
const SAMPLE_METHODS: usize = 5;

/// Name keywords that suggest a design pattern, in report order.
const PATTERN_KEYWORDS: &[(&[&str], &str)] = &[
    (&["factory", "create"], "Factory"),
    (&["singleton", "instance"], "Singleton"),
    (&["builder", "build"], "Builder"),
    (&["notify", "observe"], "Observer"),
    (&["strategy"], "Strategy"),
];

// ============================================================================
// Types
// ============================================================================

/// Role of a file, guessed from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Models,
    Utils,
    Tests,
    Config,
    Main,
    Other,
}

impl FileCategory {
    /// Categorize `file_path`; the first matching rule wins.
    pub fn of(file_path: &str) -> Self {
        let lower = file_path.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["model", "network"]) {
            Self::Models
        } else if has(&["util", "helper"]) {
            Self::Utils
        } else if has(&["test"]) {
            Self::Tests
        } else if has(&["config", "setting"]) {
            Self::Config
        } else if has(&["main", "__init__"]) {
            Self::Main
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Models => "models",
            Self::Utils => "utils",
            Self::Tests => "tests",
            Self::Config => "config",
            Self::Main => "main",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Why a method counts as an entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryPointKind {
    MainFunction,
    Initializer,
    /// Called from many places.
    CentralFunction,
}

impl std::fmt::Display for EntryPointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainFunction => write!(f, "main function"),
            Self::Initializer => write!(f, "initializer"),
            Self::CentralFunction => write!(f, "central function"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub method_name: String,
    pub file_path: String,
    pub line_number: Option<u32>,
    pub kind: EntryPointKind,
    /// Distinct methods calling it.
    pub callers: usize,
}

/// One file and the methods it defines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub file_path: String,
    pub method_count: usize,
    pub sample_methods: Vec<String>,
}

/// Everything [`build_overview`] found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebaseOverview {
    pub total_files: usize,
    pub total_methods: usize,
    /// Files by method count, largest first.
    pub modules: Vec<ModuleSummary>,
    pub files_by_category: BTreeMap<FileCategory, Vec<String>>,
    pub entry_points: Vec<EntryPoint>,
    pub patterns: Vec<String>,
}

// ============================================================================
// Building
// ============================================================================

fn has_usable_path(record: &MethodRecord) -> bool {
    let path = record.file_path.trim();
    !path.is_empty() && path != "<empty>" && path != "unknown"
}

/// Methods that describe real source: named, not synthetic, in a known file.
fn real_methods(export: &MethodExport) -> impl Iterator<Item = &MethodRecord> {
    export.methods.iter().filter(|m| {
        !m.method_name.trim().is_empty() && !is_placeholder_name(&m.method_name) && has_usable_path(m)
    })
}

/// Callee name → number of distinct methods calling it.
fn caller_counts(export: &MethodExport) -> HashMap<&str, usize> {
    let mut callers: HashMap<&str, HashSet<(&str, &str)>> = HashMap::new();
    for method in real_methods(export) {
        for callee in &method.callees {
            callers
                .entry(callee.as_str())
                .or_default()
                .insert((method.method_name.as_str(), method.file_path.as_str()));
        }
    }
    callers.into_iter().map(|(name, set)| (name, set.len())).collect()
}

fn entry_point_kind(name: &str, callers: usize) -> Option<EntryPointKind> {
    if MAIN_FUNCTION_NAMES.contains(&name) {
        Some(EntryPointKind::MainFunction)
    } else if INITIALIZER_NAMES.contains(&name) {
        Some(EntryPointKind::Initializer)
    } else if callers > CENTRAL_MIN_CALLERS {
        Some(EntryPointKind::CentralFunction)
    } else {
        None
    }
}

/// Summarize `export`.
pub fn build_overview(export: &MethodExport) -> CodebaseOverview {
    let callers = caller_counts(export);

    let mut by_file: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut entry_points = Vec::new();
    let mut total_methods = 0;
    let mut names: Vec<String> = Vec::new();

    for method in real_methods(export) {
        total_methods += 1;
        by_file
            .entry(method.file_path.as_str())
            .or_default()
            .push(method.method_name.as_str());
        names.push(method.method_name.to_lowercase());

        let caller_count = callers.get(method.method_name.as_str()).copied().unwrap_or(0);
        if let Some(kind) = entry_point_kind(&method.method_name, caller_count) {
            entry_points.push(EntryPoint {
                method_name: method.method_name.clone(),
                file_path: method.file_path.clone(),
                line_number: method.line_number,
                kind,
                callers: caller_count,
            });
        }
    }

    let mut files_by_category: BTreeMap<FileCategory, Vec<String>> = BTreeMap::new();
    for file in by_file.keys() {
        files_by_category
            .entry(FileCategory::of(file))
            .or_default()
            .push(file.to_string());
    }

    let mut modules: Vec<ModuleSummary> = by_file
        .iter()
        .map(|(file, methods)| ModuleSummary {
            file_path: file.to_string(),
            method_count: methods.len(),
            sample_methods: methods.iter().take(SAMPLE_METHODS).map(|m| m.to_string()).collect(),
        })
        .collect();
    // Stable: equal counts stay in path order
    modules.sort_by(|a, b| b.method_count.cmp(&a.method_count));
    modules.truncate(MAX_MODULES);

    let patterns = PATTERN_KEYWORDS
        .iter()
        .filter(|(keywords, _)| names.iter().any(|n| keywords.iter().any(|k| n.contains(k))))
        .map(|(_, pattern)| pattern.to_string())
        .collect();

    debug!(
        "Overview: {} methods in {} files, {} entry points",
        total_methods,
        by_file.len(),
        entry_points.len()
    );

    CodebaseOverview {
        total_files: by_file.len(),
        total_methods,
        modules,
        files_by_category,
        entry_points,
        patterns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export() -> MethodExport {
        let mut methods = vec![
            MethodRecord::new("<module>", "src/main.py"),
            MethodRecord::new("<operator>.assignment", ""),
            MethodRecord::new("main", "src/main.py")
                .with_callees(["build_model", "load_config", "train"])
                .with_line(5),
            MethodRecord::new("train", "src/train.py").with_callees(["log"]),
            MethodRecord::new("build_model", "src/models/net.py"),
            MethodRecord::new("__init__", "src/models/net.py").with_line(12),
            MethodRecord::new("forward", "src/models/net.py").with_callees(["log"]),
            MethodRecord::new("load_config", "src/config.py"),
            MethodRecord::new("log", "src/utils/logging.py"),
            MethodRecord::new("orphan", "unknown"),
        ];
        // Eleven distinct callers make `log` central
        for i in 0..9 {
            methods.push(MethodRecord::new(format!("step_{i}"), "tests/test_steps.py").with_callees(["log"]));
        }
        MethodExport { methods }
    }

    #[test]
    fn test_counts_skip_synthetic_entries() {
        let overview = build_overview(&export());
        assert_eq!(overview.total_methods, 16);
        assert_eq!(overview.total_files, 6);
    }

    #[test]
    fn test_modules_by_method_count() {
        let overview = build_overview(&export());
        let first = &overview.modules[0];
        assert_eq!(first.file_path, "tests/test_steps.py");
        assert_eq!(first.method_count, 9);
        assert_eq!(first.sample_methods.len(), SAMPLE_METHODS);

        let second = &overview.modules[1];
        assert_eq!(second.file_path, "src/models/net.py");
        assert_eq!(second.sample_methods, vec!["build_model", "__init__", "forward"]);
    }

    #[test]
    fn test_entry_points() {
        let overview = build_overview(&export());
        let found: Vec<(&str, EntryPointKind)> = overview
            .entry_points
            .iter()
            .map(|e| (e.method_name.as_str(), e.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("main", EntryPointKind::MainFunction),
                ("__init__", EntryPointKind::Initializer),
                ("log", EntryPointKind::CentralFunction),
            ]
        );
        assert_eq!(overview.entry_points[0].line_number, Some(5));
        assert_eq!(overview.entry_points[2].callers, 11);
    }

    #[test]
    fn test_file_categories() {
        assert_eq!(FileCategory::of("src/models/net.py"), FileCategory::Models);
        assert_eq!(FileCategory::of("src/utils/io.py"), FileCategory::Utils);
        assert_eq!(FileCategory::of("tests/test_app.py"), FileCategory::Tests);
        assert_eq!(FileCategory::of("settings.py"), FileCategory::Config);
        assert_eq!(FileCategory::of("pkg/__init__.py"), FileCategory::Main);
        assert_eq!(FileCategory::of("src/train.py"), FileCategory::Other);

        let overview = build_overview(&export());
        assert_eq!(
            overview.files_by_category[&FileCategory::Models],
            vec!["src/models/net.py"]
        );
        assert_eq!(
            overview.files_by_category[&FileCategory::Utils],
            vec!["src/utils/logging.py"]
        );
        assert_eq!(
            overview.files_by_category[&FileCategory::Other],
            vec!["src/train.py"]
        );
    }

    #[test]
    fn test_patterns() {
        let overview = build_overview(&export());
        assert_eq!(overview.patterns, vec!["Builder"]);
        assert!(build_overview(&MethodExport::default()).patterns.is_empty());
    }

    #[test]
    fn test_empty_export() {
        let overview = build_overview(&MethodExport::default());
        assert_eq!(overview.total_methods, 0);
        assert!(overview.modules.is_empty());
        assert!(overview.entry_points.is_empty());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(build_overview(&export())).unwrap();
        assert_eq!(json["totalMethods"], 16);
        assert_eq!(json["entryPoints"][0]["kind"], "mainFunction");
        assert!(json["filesByCategory"]["models"].is_array());
    }
}
