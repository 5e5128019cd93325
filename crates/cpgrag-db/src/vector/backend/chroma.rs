//! ChromaDB vector store over the v2 HTTP API.
//!
//! Start a server next to the persisted index with
//! `chroma run --path ./data/chromadb` and point `vectorStore.url` at it.
//!
//! Endpoints used (relative to `/api/v2/tenants/{tenant}/databases/{database}`):
//!
//! | Operation | Request |
//! |-----------|---------|
//! | resolve collection | `GET /collections/{name}` |
//! | create collection | `POST /collections` with `get_or_create` |
//! | query | `POST /collections/{id}/query` |
//! | upsert | `POST /collections/{id}/upsert` |
//! | count | `GET /collections/{id}/count` |
//! | delete collection | `DELETE /collections/{name}` |
//!
//! Health uses `GET /api/v2/heartbeat`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::super::config::VectorStoreConfig;
use super::super::traits::{MethodMetadata, VectorHit, VectorMetric, VectorRecord, VectorStore};
use crate::error::{DbError, DbResult};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    metadata: HashMap<&'static str, &'static str>,
    get_or_create: bool,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: Vec<&'a [f32]>,
    n_results: usize,
    include: [&'static str; 3],
}

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<MethodMetadata>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a MethodMetadata>,
}

impl QueryResponse {
    /// Flatten the single-query response into hits.
    fn into_hits(self) -> Vec<VectorHit> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let mut documents = self
            .documents
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut metadatas = self
            .metadatas
            .and_then(|m| m.into_iter().next())
            .unwrap_or_default()
            .into_iter();
        let mut distances = self
            .distances
            .and_then(|d| d.into_iter().next())
            .unwrap_or_default()
            .into_iter();

        ids.into_iter()
            .map(|id| {
                let document = documents.next().flatten().unwrap_or_default();
                let metadata = metadatas.next().flatten().unwrap_or_default();
                // A hit without a distance sorts last
                let distance = distances.next().flatten().unwrap_or(f32::MAX);
                VectorHit::new(id, document, metadata, distance)
            })
            .collect()
    }
}

// ============================================================================
// ChromaVectorStore
// ============================================================================

/// ChromaDB HTTP client implementing [`VectorStore`].
pub struct ChromaVectorStore {
    client: Client,
    base_url: String,
    database_url: String,
    metric: VectorMetric,
    /// Collection name → id.
    ids: Mutex<HashMap<String, String>>,
}

impl ChromaVectorStore {
    /// Build a client. No request is made until the first operation.
    pub fn new(config: &VectorStoreConfig) -> DbResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| DbError::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config.url.trim_end_matches('/').to_string();
        let database_url = format!(
            "{}/api/v2/tenants/{}/databases/{}",
            base_url, config.tenant, config.database
        );
        debug!("ChromaDB endpoint: {}", database_url);

        Ok(Self {
            client,
            base_url,
            database_url,
            metric: config.metric,
            ids: Mutex::new(HashMap::new()),
        })
    }

    fn cached_id(&self, collection: &str) -> DbResult<Option<String>> {
        let ids = self
            .ids
            .lock()
            .map_err(|e| DbError::internal(format!("Failed to acquire lock: {}", e)))?;
        Ok(ids.get(collection).cloned())
    }

    fn remember_id(&self, collection: &str, id: &str) -> DbResult<()> {
        let mut ids = self
            .ids
            .lock()
            .map_err(|e| DbError::internal(format!("Failed to acquire lock: {}", e)))?;
        ids.insert(collection.to_string(), id.to_string());
        Ok(())
    }

    /// Resolve an existing collection's id.
    fn collection_id(&self, collection: &str) -> DbResult<String> {
        if let Some(id) = self.cached_id(collection)? {
            return Ok(id);
        }

        let url = format!("{}/collections/{}", self.database_url, collection);
        trace!("GET {}", url);
        let response = self.client.get(&url).send()?;

        if is_not_found(response.status()) {
            return Err(DbError::CollectionNotFound {
                collection: collection.to_string(),
            });
        }
        let info: CollectionInfo = check(response)?.json()?;
        self.remember_id(collection, &info.id)?;
        Ok(info.id)
    }

    /// Resolve or create a collection's id.
    fn get_or_create(&self, collection: &str) -> DbResult<String> {
        if let Some(id) = self.cached_id(collection)? {
            return Ok(id);
        }

        let url = format!("{}/collections", self.database_url);
        let mut metadata = HashMap::new();
        metadata.insert("hnsw:space", self.metric.as_str());
        let body = CreateCollectionRequest {
            name: collection,
            metadata,
            get_or_create: true,
        };

        trace!("POST {}", url);
        let info: CollectionInfo = check(self.client.post(&url).json(&body).send()?)?.json()?;
        self.remember_id(collection, &info.id)?;
        Ok(info.id)
    }
}

/// ChromaDB has answered missing collections with 404 and, in older
/// releases, with 400/500 and a "does not exist" message.
fn is_not_found(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND
}

/// Turn an error status into [`DbError`], keeping the response body.
fn check(response: Response) -> DbResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    if body.contains("does not exist") {
        return Err(DbError::CollectionNotFound {
            collection: extract_collection_name(&body),
        });
    }
    Err(DbError::VectorRequest {
        status: status.as_u16(),
        body,
    })
}

fn extract_collection_name(body: &str) -> String {
    body.split('\'')
        .nth(1)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

impl VectorStore for ChromaVectorStore {
    fn query(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
    ) -> DbResult<Vec<VectorHit>> {
        let id = self.collection_id(collection)?;
        let url = format!("{}/collections/{}/query", self.database_url, id);
        let body = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: limit,
            include: ["documents", "metadatas", "distances"],
        };

        trace!("POST {} (n_results={})", url, limit);
        let response: QueryResponse = check(self.client.post(&url).json(&body).send()?)?.json()?;
        let mut hits = response.into_hits();
        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        debug!("ChromaDB returned {} hits from '{}'", hits.len(), collection);
        Ok(hits)
    }

    fn upsert(&self, collection: &str, records: &[VectorRecord]) -> DbResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let id = self.get_or_create(collection)?;
        let url = format!("{}/collections/{}/upsert", self.database_url, id);
        let body = UpsertRequest {
            ids: records.iter().map(|r| r.id.as_str()).collect(),
            embeddings: records.iter().map(|r| r.embedding.as_slice()).collect(),
            documents: records.iter().map(|r| r.document.as_str()).collect(),
            metadatas: records.iter().map(|r| &r.metadata).collect(),
        };

        debug!("Upserting {} records into '{}'", records.len(), collection);
        check(self.client.post(&url).json(&body).send()?)?;
        Ok(())
    }

    fn count(&self, collection: &str) -> DbResult<usize> {
        let id = self.collection_id(collection)?;
        let url = format!("{}/collections/{}/count", self.database_url, id);
        let count: usize = check(self.client.get(&url).send()?)?.json()?;
        Ok(count)
    }

    fn delete_collection(&self, collection: &str) -> DbResult<()> {
        self.ids
            .lock()
            .map_err(|e| DbError::internal(format!("Failed to acquire lock: {}", e)))?
            .remove(collection);

        let url = format!("{}/collections/{}", self.database_url, collection);
        trace!("DELETE {}", url);
        let response = self.client.delete(&url).send()?;
        if is_not_found(response.status()) {
            debug!("Collection '{}' did not exist", collection);
            return Ok(());
        }
        match check(response) {
            Ok(_) | Err(DbError::CollectionNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn health_check(&self) -> DbResult<()> {
        let url = format!("{}/api/v2/heartbeat", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DbError::vector_unavailable(&self.base_url, e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DbError::vector_unavailable(
                &self.base_url,
                format!("heartbeat returned {}", response.status()),
            ))
        }
    }

    fn backend_name(&self) -> &'static str {
        "chroma"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_into_hits() {
        let raw = r#"{
            "ids": [["p_0", "p_1"]],
            "documents": [["Method: a", null]],
            "metadatas": [[{"method_name": "a", "file_path": "x.py", "line_number": "4"}, null]],
            "distances": [[0.25, 0.5]]
        }"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let hits = response.into_hits();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "p_0");
        assert_eq!(hits[0].metadata.method_name, "a");
        assert_eq!(hits[0].metadata.line_number, Some(4));
        assert!((hits[0].distance - 0.25).abs() < 1e-6);
        assert_eq!(hits[1].document, "");
        assert_eq!(hits[1].metadata, MethodMetadata::default());
    }

    #[test]
    fn test_query_response_without_distances() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"ids": [["only"]], "distances": null}"#).unwrap();
        let hits = response.into_hits();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, f32::MAX);
    }

    #[test]
    fn test_empty_query_response() {
        let response: QueryResponse = serde_json::from_str(r#"{"ids": []}"#).unwrap();
        assert!(response.into_hits().is_empty());
    }

    #[test]
    fn test_database_url() {
        let store = ChromaVectorStore::new(&VectorStoreConfig::chroma("http://chroma:8000/")).unwrap();
        assert_eq!(
            store.database_url,
            "http://chroma:8000/api/v2/tenants/default_tenant/databases/default_database"
        );
        assert_eq!(store.backend_name(), "chroma");
    }

    #[test]
    fn test_extract_collection_name() {
        assert_eq!(
            extract_collection_name("Collection 'methods_x' does not exist"),
            "methods_x"
        );
        assert_eq!(extract_collection_name("nope"), "<unknown>");
    }
}
