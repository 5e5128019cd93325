//! Vector store module for cpgrag-db.
//!
//! Per-method embeddings live in one collection per project. Two backends
//! are available:
//!
//! - `chroma` (default): a ChromaDB server reached over its HTTP API
//! - `simple`: JSONL files with linear scan, for tests and offline use
//!
//! ## Usage
//!
//! ```ignore
//! use cpgrag_db::vector::{collection_name, open_vector_store, VectorStoreConfig};
//!
//! let store = open_vector_store(&VectorStoreConfig::simple("./data/vectors"))?;
//! store.upsert(&collection_name("demo"), &records)?;
//! let hits = store.query(&collection_name("demo"), &embedding, 10)?;
//! ```

mod backend;
mod config;
mod traits;

pub use config::{
    collection_name, VectorStoreConfig, COLLECTION_PREFIX, DEFAULT_BACKEND, DEFAULT_CHROMA_URL,
};
pub use traits::{MethodMetadata, VectorHit, VectorMetric, VectorRecord, VectorStore};

pub use backend::{available_backends, open_vector_store};

#[cfg(feature = "chroma")]
pub use backend::ChromaVectorStore;

#[cfg(feature = "simple")]
pub use backend::SimpleFileVectorStore;
