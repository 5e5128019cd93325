//! # cpgrag-db
//!
//! Infrastructure layer for cpgrag - vector stores and code graph backends.
//!
//! Everything that talks to an external persisted artifact lives here, away
//! from the domain logic in `cpgrag-core`:
//!
//! - Vector stores can be swapped (ChromaDB server, local JSONL file)
//! - Graph backends can be swapped (Joern subprocess, Joern method export)
//! - Tests in `cpgrag-core` run against the file-based implementations
//!
//! ## Architecture
//!
//! ```text
//! cpgrag-cli → cpgrag-core → (traits)
//!                  ↑
//!              cpgrag-db (vector stores, graph backends, method export)
//!              cpgrag-model (embedding + LLM clients)
//! ```
//!
//! ## Features
//!
//! - `chroma` (default): ChromaDB over HTTP
//! - `simple` (default): JSONL file vector store
//!
//! ## Usage
//!
//! ```ignore
//! use cpgrag_db::vector::{open_vector_store, VectorStoreConfig};
//! use cpgrag_db::graph::{open_graph_backend, GraphBackendConfig};
//!
//! let store = open_vector_store(&VectorStoreConfig::default())?;
//! let hits = store.query("methods_myproj", &embedding, 100)?;
//!
//! if let Some(graph) = open_graph_backend(&graph_config)? {
//!     let neighborhood = graph.neighborhood("validate_input", Some("src/app.py"))?;
//! }
//! ```

pub mod error;
pub mod export;
pub mod graph;
pub mod vector;

pub use error::{DbError, DbResult};
pub use export::{MethodExport, MethodRecord};
pub use graph::{GraphBackend, GraphNeighborhood};
pub use vector::{MethodMetadata, VectorHit, VectorRecord, VectorStore};
