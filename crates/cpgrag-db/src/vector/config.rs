//! Vector store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::traits::VectorMetric;

/// Default backend name.
pub const DEFAULT_BACKEND: &str = "chroma";

/// Default ChromaDB server URL (`chroma run --path ./data/chromadb`).
pub const DEFAULT_CHROMA_URL: &str = "http://localhost:8000";

/// Default tenant and database of a ChromaDB server.
pub const DEFAULT_CHROMA_TENANT: &str = "default_tenant";
pub const DEFAULT_CHROMA_DATABASE: &str = "default_database";

/// Default directory of the file-based store.
pub const DEFAULT_SIMPLE_PATH: &str = "./data/vectors";

/// Default HTTP timeout for vector store requests.
pub const DEFAULT_VECTOR_TIMEOUT_SECS: u64 = 30;

/// Prefix of per-project collection names.
pub const COLLECTION_PREFIX: &str = "methods_";

/// Collection name for a project.
///
/// ```
/// assert_eq!(cpgrag_db::vector::collection_name("medsam"), "methods_medsam");
/// ```
pub fn collection_name(project: &str) -> String {
    format!("{}{}", COLLECTION_PREFIX, project)
}

/// Configuration for opening a vector store.
///
/// # Example (YAML)
///
/// ```yaml
/// vectorStore:
///   backend: chroma
///   url: http://localhost:8000
///   metric: cosine
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorStoreConfig {
    /// `chroma` or `simple`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// ChromaDB server URL.
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default = "default_tenant")]
    pub tenant: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Directory of the file-based store.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Distance metric used when a collection is created.
    #[serde(default)]
    pub metric: VectorMetric,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}
fn default_url() -> String {
    DEFAULT_CHROMA_URL.to_string()
}
fn default_tenant() -> String {
    DEFAULT_CHROMA_TENANT.to_string()
}
fn default_database() -> String {
    DEFAULT_CHROMA_DATABASE.to_string()
}
fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_SIMPLE_PATH)
}
fn default_timeout_secs() -> u64 {
    DEFAULT_VECTOR_TIMEOUT_SECS
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_url(),
            tenant: default_tenant(),
            database: default_database(),
            path: default_path(),
            metric: VectorMetric::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl VectorStoreConfig {
    /// Config for a file-based store rooted at `path`.
    pub fn simple(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: "simple".to_string(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Config for a ChromaDB server at `url`.
    pub fn chroma(url: impl Into<String>) -> Self {
        Self {
            backend: "chroma".to_string(),
            url: url.into(),
            ..Default::default()
        }
    }
}
