//! Vector store backend implementations.
//!
//! - `chroma` (default): ChromaDB HTTP API
//! - `simple`: JSONL file store

#[cfg(feature = "chroma")]
mod chroma;

#[cfg(feature = "simple")]
mod simple;

#[cfg(feature = "chroma")]
pub use chroma::ChromaVectorStore;

#[cfg(feature = "simple")]
pub use simple::SimpleFileVectorStore;

use super::config::VectorStoreConfig;
use super::traits::VectorStore;
use crate::error::{DbError, DbResult};
use std::sync::Arc;
use tracing::debug;

/// Open a vector store with the given configuration.
///
/// Opening never contacts a server; reachability problems surface on the
/// first request so callers can decide to run without retrieval.
///
/// # Errors
///
/// Returns [`DbError::Config`] if the backend is unknown or not compiled in.
pub fn open_vector_store(config: &VectorStoreConfig) -> DbResult<Arc<dyn VectorStore>> {
    debug!("Opening '{}' vector store", config.backend);

    match config.backend.as_str() {
        #[cfg(feature = "chroma")]
        "chroma" => Ok(Arc::new(ChromaVectorStore::new(config)?)),

        #[cfg(feature = "simple")]
        "simple" => Ok(Arc::new(SimpleFileVectorStore::open(config)?)),

        backend => Err(DbError::config(format!(
            "Unknown vector store backend: '{}'. Available backends: {}",
            backend,
            available_backends().join(", ")
        ))),
    }
}

/// Get a list of available backend names.
#[allow(clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<&'static str> {
    let mut backends = Vec::new();

    #[cfg(feature = "chroma")]
    backends.push("chroma");

    #[cfg(feature = "simple")]
    backends.push("simple");

    backends
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_backend_is_config_error() {
        let config = VectorStoreConfig {
            backend: "lance".to_string(),
            ..Default::default()
        };
        let err = open_vector_store(&config).err().unwrap();
        assert!(matches!(err, DbError::Config { .. }));
        assert!(err.to_string().contains("lance"));
    }

    #[cfg(feature = "simple")]
    #[test]
    fn test_open_simple_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open_vector_store(&VectorStoreConfig::simple(dir.path())).unwrap();
        assert_eq!(store.backend_name(), "simple");
    }
}
