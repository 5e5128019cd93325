//! Simple file-based vector store.
//!
//! Each collection is a JSONL file `<dir>/<collection>.jsonl`, loaded lazily
//! and searched by linear scan. Intended for tests and small projects where
//! running a ChromaDB server is not justified.

use super::super::config::VectorStoreConfig;
use super::super::traits::{MethodMetadata, VectorHit, VectorMetric, VectorRecord, VectorStore};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, trace};

/// A stored method embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredVector {
    id: String,
    vector: Vec<f32>,
    document: String,
    metadata: MethodMetadata,
}

impl From<&VectorRecord> for StoredVector {
    fn from(record: &VectorRecord) -> Self {
        Self {
            id: record.id.clone(),
            vector: record.embedding.clone(),
            document: record.document.clone(),
            metadata: record.metadata.clone(),
        }
    }
}

/// Records of one collection, keyed by id so files are written in a stable order.
type Collection = BTreeMap<String, StoredVector>;

/// Simple file-based vector store.
pub struct SimpleFileVectorStore {
    /// Directory holding one JSONL file per collection.
    path: PathBuf,

    metric: VectorMetric,

    /// Collections loaded so far.
    collections: RwLock<HashMap<String, Collection>>,
}

impl SimpleFileVectorStore {
    /// Open (or create) a store rooted at `config.path`.
    pub fn open(config: &VectorStoreConfig) -> DbResult<Self> {
        debug!("Opening SimpleFileVectorStore at {:?}", config.path);
        fs::create_dir_all(&config.path)
            .map_err(|e| DbError::vector_io(&config.path, e.to_string()))?;

        Ok(Self {
            path: config.path.clone(),
            metric: config.metric,
            collections: RwLock::new(HashMap::new()),
        })
    }

    fn collection_file(&self, collection: &str) -> PathBuf {
        self.path.join(format!("{}.jsonl", collection))
    }

    /// Make sure `collection` is in memory. Returns `false` if it has no file.
    fn ensure_loaded(&self, collection: &str) -> DbResult<bool> {
        {
            let collections = self
                .collections
                .read()
                .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
            if collections.contains_key(collection) {
                return Ok(true);
            }
        }

        let file = self.collection_file(collection);
        if !file.exists() {
            return Ok(false);
        }

        let loaded = load_from_file(&file)?;
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        collections.entry(collection.to_string()).or_insert(loaded);
        Ok(true)
    }

    fn save_collection(&self, collection: &str, records: &Collection) -> DbResult<()> {
        let file_path = self.collection_file(collection);
        debug!("Saving {} vectors to {:?}", records.len(), file_path);

        let mut file =
            File::create(&file_path).map_err(|e| DbError::vector_io(&file_path, e.to_string()))?;
        for stored in records.values() {
            let line = serde_json::to_string(stored)?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }
}

/// Load vectors from a JSONL file, skipping unreadable lines.
fn load_from_file(path: &Path) -> DbResult<Collection> {
    debug!("Loading vectors from {:?}", path);

    let file = File::open(path).map_err(|e| DbError::vector_io(path, e.to_string()))?;
    let reader = BufReader::new(file);
    let mut records = Collection::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<StoredVector>(&line) {
            Ok(stored) => {
                records.insert(stored.id.clone(), stored);
            }
            Err(e) => {
                debug!("Skipping invalid line {}: {}", line_num + 1, e);
            }
        }
    }

    debug!("Loaded {} vectors", records.len());
    Ok(records)
}

impl VectorStore for SimpleFileVectorStore {
    fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> DbResult<Vec<VectorHit>> {
        trace!("Querying '{}', limit={}", collection, limit);

        if !self.ensure_loaded(collection)? {
            return Err(DbError::CollectionNotFound {
                collection: collection.to_string(),
            });
        }

        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        if let Some(stored) = records.values().next() {
            if stored.vector.len() != embedding.len() {
                return Err(DbError::DimensionMismatch {
                    expected: stored.vector.len(),
                    actual: embedding.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &StoredVector)> = records
            .values()
            .map(|v| (self.metric.distance(embedding, &v.vector), v))
            .collect();

        // Ascending distance; ties keep id order from the BTreeMap
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let hits: Vec<VectorHit> = scored
            .into_iter()
            .take(limit)
            .map(|(distance, stored)| {
                VectorHit::new(
                    stored.id.clone(),
                    stored.document.clone(),
                    stored.metadata.clone(),
                    distance,
                )
            })
            .collect();

        trace!("Found {} hits", hits.len());
        Ok(hits)
    }

    fn upsert(&self, collection: &str, records: &[VectorRecord]) -> DbResult<()> {
        debug!("Upserting {} vectors into '{}'", records.len(), collection);
        self.ensure_loaded(collection)?;

        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        let stored = collections.entry(collection.to_string()).or_default();

        let expected = stored
            .values()
            .next()
            .map(|v| v.vector.len())
            .or_else(|| records.first().map(|r| r.embedding.len()));
        if let Some(expected) = expected {
            if let Some(bad) = records.iter().find(|r| r.embedding.len() != expected) {
                return Err(DbError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        for record in records {
            let entry = StoredVector::from(record);
            stored.insert(entry.id.clone(), entry);
        }

        let snapshot = stored.clone();
        drop(collections);
        self.save_collection(collection, &snapshot)
    }

    fn count(&self, collection: &str) -> DbResult<usize> {
        if !self.ensure_loaded(collection)? {
            return Err(DbError::CollectionNotFound {
                collection: collection.to_string(),
            });
        }
        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        Ok(collections.get(collection).map(|c| c.len()).unwrap_or(0))
    }

    fn delete_collection(&self, collection: &str) -> DbResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        collections.remove(collection);

        let file = self.collection_file(collection);
        if file.exists() {
            debug!("Deleting collection file {:?}", file);
            fs::remove_file(&file).map_err(|e| DbError::vector_io(&file, e.to_string()))?;
        }
        Ok(())
    }

    fn health_check(&self) -> DbResult<()> {
        if self.path.is_dir() {
            Ok(())
        } else {
            Err(DbError::vector_unavailable(
                self.path.display().to_string(),
                "store directory does not exist",
            ))
        }
    }

    fn backend_name(&self) -> &'static str {
        "simple"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, name: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            embedding,
            document: format!("Method: {}", name),
            metadata: MethodMetadata {
                project_name: "demo".to_string(),
                method_name: name.to_string(),
                file_path: "src/app.py".to_string(),
                ..Default::default()
            },
        }
    }

    fn open(dir: &TempDir) -> SimpleFileVectorStore {
        SimpleFileVectorStore::open(&VectorStoreConfig::simple(dir.path())).unwrap()
    }

    #[test]
    fn test_query_orders_by_ascending_distance() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .upsert(
                "methods_demo",
                &[
                    record("demo_0", "far", vec![0.0, 1.0]),
                    record("demo_1", "near", vec![1.0, 0.0]),
                    record("demo_2", "middle", vec![1.0, 1.0]),
                ],
            )
            .unwrap();

        let hits = store.query("methods_demo", &[1.0, 0.0], 10).unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.metadata.method_name.as_str()).collect();
        assert_eq!(names, vec!["near", "middle", "far"]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

        let top = store.query("methods_demo", &[1.0, 0.0], 1).unwrap();
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_missing_collection_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let err = store.query("methods_nope", &[1.0], 5).unwrap_err();
        assert!(matches!(err, DbError::CollectionNotFound { .. }));
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_upsert_persists_and_replaces() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir);
            store
                .upsert("methods_demo", &[record("demo_0", "old", vec![1.0, 0.0])])
                .unwrap();
            store
                .upsert("methods_demo", &[record("demo_0", "new", vec![1.0, 0.0])])
                .unwrap();
        }

        let reopened = open(&dir);
        assert_eq!(reopened.count("methods_demo").unwrap(), 1);
        let hits = reopened.query("methods_demo", &[1.0, 0.0], 5).unwrap();
        assert_eq!(hits[0].metadata.method_name, "new");
    }

    #[test]
    fn test_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .upsert("methods_demo", &[record("demo_0", "a", vec![1.0, 0.0])])
            .unwrap();
        let err = store
            .upsert("methods_demo", &[record("demo_1", "b", vec![1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .upsert("methods_demo", &[record("demo_0", "a", vec![1.0, 0.0, 0.0, 0.0])])
            .unwrap();

        let err = store.query("methods_demo", &[1.0, 0.0], 5).unwrap_err();
        assert!(matches!(
            err,
            DbError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_delete_collection() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .upsert("methods_demo", &[record("demo_0", "a", vec![1.0, 0.0])])
            .unwrap();
        assert!(dir.path().join("methods_demo.jsonl").exists());

        store.delete_collection("methods_demo").unwrap();
        assert!(!dir.path().join("methods_demo.jsonl").exists());
        assert!(matches!(
            store.count("methods_demo").unwrap_err(),
            DbError::CollectionNotFound { .. }
        ));

        // Missing collections delete cleanly, and a new dimension is accepted afterwards
        store.delete_collection("methods_demo").unwrap();
        store
            .upsert("methods_demo", &[record("demo_0", "a", vec![1.0, 0.0, 0.0])])
            .unwrap();
        assert_eq!(store.count("methods_demo").unwrap(), 1);
    }

    #[test]
    fn test_invalid_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .upsert("methods_demo", &[record("demo_0", "a", vec![1.0, 0.0])])
            .unwrap();

        let file = dir.path().join("methods_demo.jsonl");
        let mut content = fs::read_to_string(&file).unwrap();
        content.push_str("garbage\n\n");
        fs::write(&file, content).unwrap();

        let reopened = open(&dir);
        assert_eq!(reopened.count("methods_demo").unwrap(), 1);
    }
}
