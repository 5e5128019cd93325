//! Method indexing.
//!
//! Serializes each method of a Joern export into a retrieval-oriented text,
//! embeds it and writes it to the project's collection. Re-indexing replaces
//! the whole collection, so methods missing from the new export disappear.

use std::time::Instant;

use cpgrag_db::vector::collection_name;
use cpgrag_db::{MethodExport, MethodMetadata, MethodRecord, VectorRecord, VectorStore};
use cpgrag_model::EmbeddingModel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{CpgRagError, CpgRagResult};

/// Code longer than this is shortened to head + tail.
const MAX_INDEXED_CODE_CHARS: usize = 2000;
const INDEXED_CODE_HEAD_CHARS: usize = 1500;
const INDEXED_CODE_TAIL_CHARS: usize = 500;

/// Callees considered for the `Calls methods:` line.
const MAX_INDEXED_CALLEES: usize = 20;

/// Path keywords that mark the role of a file, in lookup order.
const FILE_KINDS: &[(&[&str], &str)] = &[
    (&["train"], "training"),
    (&["evaluate", "eval"], "evaluation"),
    (&["test"], "test"),
    (&["validation", "val"], "validation"),
    (&["infer", "predict"], "inference"),
];

/// Role of a file derived from its path, if the path names one.
pub fn file_kind(file_path: &str) -> Option<&'static str> {
    let lower = file_path.to_lowercase();
    FILE_KINDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, kind)| *kind)
}

fn last_path_parts(file_path: &str) -> String {
    let normalized = file_path.replace('\\', "/");
    let parts: Vec<&str> = normalized.split('/').filter(|p| !p.is_empty()).collect();
    let start = parts.len().saturating_sub(2);
    parts[start..].join("/")
}

fn shorten_code(code: &str) -> String {
    let count = code.chars().count();
    if count <= MAX_INDEXED_CODE_CHARS {
        return code.to_string();
    }
    let head: String = code.chars().take(INDEXED_CODE_HEAD_CHARS).collect();
    let tail: String = code.chars().skip(count - INDEXED_CODE_TAIL_CHARS).collect();
    format!("{head}\n...\n{tail}")
}

/// Text embedded for one method.
pub fn method_document(record: &MethodRecord) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(kind) = file_kind(&record.file_path) {
        lines.push(format!("File type: {kind}"));
    }

    lines.push(format!("Method: {}", record.method_name));
    lines.push(record.method_name.clone());

    if !record.full_name.is_empty() && record.full_name != record.method_name {
        lines.push(format!("Full name: {}", record.full_name));
    }
    if !record.signature.is_empty() {
        lines.push(format!("Signature: {}", record.signature));
    }
    if !record.param_names.is_empty() {
        lines.push(format!("Parameters: {}", record.param_names.join(", ")));
    }
    if !record.code.is_empty() {
        lines.push(format!("Code:\n{}", shorten_code(&record.code)));
    }

    let callees: Vec<&str> = record
        .callees
        .iter()
        .take(MAX_INDEXED_CALLEES)
        .map(String::as_str)
        .filter(|c| !c.starts_with("<operator"))
        .collect();
    if !callees.is_empty() {
        lines.push(format!("Calls methods: {}", callees.join(", ")));
    }

    if !record.file_path.is_empty() {
        lines.push(format!("In: {}", last_path_parts(&record.file_path)));
    }

    lines.join("\n")
}

// ============================================================================
// Indexing
// ============================================================================

/// Summary of an index run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub project: String,
    pub collection: String,
    /// Records written.
    pub indexed: usize,
    /// Records skipped for having no name.
    pub skipped: usize,
    pub batches: usize,
    pub embedding_model: String,
    pub vector_store: String,
    pub duration_ms: u64,
}

/// Embed and store every named method of `export` under `project`.
///
/// Ids are `{project}_{i}` with `i` the position in the export. The existing
/// collection is deleted once the first batch is embedded, so a failing
/// embedding server leaves the previous index intact.
///
/// # Errors
///
/// Fails on the first embedding or store error; nothing is retried.
pub fn run_index(
    export: &MethodExport,
    project: &str,
    embedder: &dyn EmbeddingModel,
    store: &dyn VectorStore,
    batch_size: usize,
) -> CpgRagResult<IndexReport> {
    if project.trim().is_empty() {
        return Err(CpgRagError::InvalidArgument(
            "A project name is required for indexing".to_string(),
        ));
    }

    let start = Instant::now();
    let collection = collection_name(project);
    let batch_size = batch_size.max(1);

    let pending: Vec<(String, &MethodRecord)> = export
        .methods
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.method_name.trim().is_empty())
        .map(|(i, m)| (format!("{project}_{i}"), m))
        .collect();
    let skipped = export.len() - pending.len();

    info!(
        "Indexing {} methods into '{}' ({} skipped)",
        pending.len(),
        collection,
        skipped
    );

    let mut indexed = 0;
    let mut batches = 0;
    for chunk in pending.chunks(batch_size) {
        let documents: Vec<String> = chunk.iter().map(|(_, m)| method_document(m)).collect();
        let embeddings = embedder.embed_batch(&documents)?;
        if embeddings.len() != documents.len() {
            return Err(CpgRagError::Model(cpgrag_model::ModelError::embedding_failed(
                embedder.model_id(),
                format!("expected {} embeddings, got {}", documents.len(), embeddings.len()),
            )));
        }

        let records: Vec<VectorRecord> = chunk
            .iter()
            .zip(documents)
            .zip(embeddings)
            .map(|(((id, method), document), embedding)| VectorRecord {
                id: id.clone(),
                embedding,
                document,
                metadata: MethodMetadata {
                    project_name: project.to_string(),
                    method_name: method.method_name.clone(),
                    full_name: method.full_name.clone(),
                    file_path: method.file_path.clone(),
                    line_number: method.line_number,
                    signature: method.signature.clone(),
                },
            })
            .collect();

        if batches == 0 {
            store.delete_collection(&collection)?;
        }
        store.upsert(&collection, &records)?;
        indexed += records.len();
        batches += 1;
        debug!("Indexed batch {} ({} / {})", batches, indexed, pending.len());
    }

    if batches == 0 {
        store.delete_collection(&collection)?;
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    info!("Indexed {} methods in {} ms", indexed, duration_ms);

    Ok(IndexReport {
        project: project.to_string(),
        collection,
        indexed,
        skipped,
        batches,
        embedding_model: embedder.model_id().to_string(),
        vector_store: store.backend_name().to_string(),
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::HashEmbedder;
    use cpgrag_db::vector::{SimpleFileVectorStore, VectorStoreConfig};

    fn record() -> MethodRecord {
        let mut r = MethodRecord::new("train_epoch", "repo/scripts/train/loop.py")
            .with_code("def train_epoch(model, data):\n    for batch in data:\n        step(model, batch)")
            .with_callees(["step", "<operator>.assignment", "len"]);
        r.full_name = "loop.py:<module>.train_epoch".to_string();
        r.signature = "train_epoch(model, data)".to_string();
        r.param_names = vec!["model".to_string(), "data".to_string()];
        r
    }

    #[test]
    fn test_method_document_layout() {
        let doc = method_document(&record());
        let lines: Vec<&str> = doc.lines().collect();
        assert_eq!(lines[0], "File type: training");
        assert_eq!(lines[1], "Method: train_epoch");
        assert_eq!(lines[2], "train_epoch");
        assert_eq!(lines[3], "Full name: loop.py:<module>.train_epoch");
        assert_eq!(lines[4], "Signature: train_epoch(model, data)");
        assert_eq!(lines[5], "Parameters: model, data");
        assert_eq!(lines[6], "Code:");
        assert!(doc.contains("Calls methods: step, len\n"));
        assert!(doc.ends_with("In: train/loop.py"));
    }

    #[test]
    fn test_plain_file_has_no_file_type() {
        let doc = method_document(&MethodRecord::new("helper", "util.py"));
        assert_eq!(doc, "Method: helper\nhelper\nIn: util.py");
    }

    #[test]
    fn test_file_kinds() {
        assert_eq!(file_kind("src/evaluate_model.py"), Some("evaluation"));
        assert_eq!(file_kind("tests/test_app.py"), Some("test"));
        assert_eq!(file_kind("serve/predict.py"), Some("inference"));
        assert_eq!(file_kind("src/app.py"), None);
    }

    #[test]
    fn test_long_code_shortened() {
        let code: String = (0..2500).map(|i| if i < 1500 { 'a' } else if i < 2000 { 'b' } else { 'c' }).collect();
        let doc = method_document(&MethodRecord::new("f", "").with_code(code));
        let expected = format!("Code:\n{}\n...\n{}", "a".repeat(1500), "c".repeat(500));
        assert!(doc.ends_with(&expected));
    }

    #[test]
    fn test_run_index_into_simple_store() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SimpleFileVectorStore::open(&VectorStoreConfig::simple(dir.path())).unwrap();
        let export = MethodExport {
            methods: vec![
                record(),
                MethodRecord::new("", "orphan.py"),
                MethodRecord::new("helper", "util.py").with_line(4),
                MethodRecord::new("main", "app.py"),
            ],
        };

        let report = run_index(&export, "demo", &HashEmbedder::new(16), &store, 2).unwrap();
        assert_eq!(report.indexed, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.batches, 2);
        assert_eq!(report.collection, "methods_demo");
        assert_eq!(store.count("methods_demo").unwrap(), 3);

        // Re-indexing replaces by id
        run_index(&export, "demo", &HashEmbedder::new(16), &store, 32).unwrap();
        assert_eq!(store.count("methods_demo").unwrap(), 3);

        let query = HashEmbedder::new(16).embed_one(&method_document(&export.methods[2])).unwrap();
        let hits = store.query("methods_demo", &query, 1).unwrap();
        assert_eq!(hits[0].id, "demo_2");
        assert_eq!(hits[0].metadata.line_number, Some(4));
    }

    #[test]
    fn test_reindex_drops_removed_methods() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SimpleFileVectorStore::open(&VectorStoreConfig::simple(dir.path())).unwrap();
        let embedder = HashEmbedder::new(16);
        let full = MethodExport {
            methods: vec![
                MethodRecord::new("main", "app.py"),
                MethodRecord::new("helper", "util.py"),
                MethodRecord::new("legacy", "old.py"),
            ],
        };
        run_index(&full, "demo", &embedder, &store, 8).unwrap();
        assert_eq!(store.count("methods_demo").unwrap(), 3);

        let shrunk = MethodExport {
            methods: vec![MethodRecord::new("main", "app.py")],
        };
        run_index(&shrunk, "demo", &embedder, &store, 8).unwrap();
        assert_eq!(store.count("methods_demo").unwrap(), 1);

        let query = embedder.embed_one(&method_document(&full.methods[2])).unwrap();
        let hits = store.query("methods_demo", &query, 5).unwrap();
        assert!(hits.iter().all(|h| h.metadata.method_name != "legacy"));
    }

    #[test]
    fn test_failed_embedding_keeps_previous_index() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SimpleFileVectorStore::open(&VectorStoreConfig::simple(dir.path())).unwrap();
        let export = MethodExport {
            methods: vec![MethodRecord::new("main", "app.py")],
        };
        run_index(&export, "demo", &HashEmbedder::new(16), &store, 8).unwrap();

        assert!(run_index(&export, "demo", &crate::testing::DownEmbedder, &store, 8).is_err());
        assert_eq!(store.count("methods_demo").unwrap(), 1);
    }

    #[test]
    fn test_project_required() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SimpleFileVectorStore::open(&VectorStoreConfig::simple(dir.path())).unwrap();
        let err = run_index(&MethodExport::default(), " ", &HashEmbedder::new(4), &store, 8).unwrap_err();
        assert!(matches!(err, CpgRagError::InvalidArgument(_)));
    }
}
