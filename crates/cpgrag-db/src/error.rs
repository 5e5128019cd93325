//! Error types for cpgrag-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cpgrag-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in cpgrag-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Vector store errors
    // ========================================================================
    /// Vector store I/O error.
    #[error("Vector store I/O error at {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The requested collection does not exist.
    #[error("Collection '{collection}' not found. Run `cpgrag index` for this project first.")]
    CollectionNotFound { collection: String },

    /// The vector store could not be reached at all.
    #[error("Vector store unavailable at {endpoint}: {message}")]
    VectorUnavailable { endpoint: String, message: String },

    /// The vector store answered with an error status.
    #[error("Vector store request failed ({status}): {body}")]
    VectorRequest { status: u16, body: String },

    // ========================================================================
    // Graph backend errors
    // ========================================================================
    /// The graph backend cannot be used (missing binary, CPG or export).
    #[error("Graph backend '{backend}' unavailable: {message}")]
    GraphUnavailable { backend: String, message: String },

    /// A graph lookup exceeded its time budget.
    #[error("Graph lookup for '{method}' timed out after {seconds}s")]
    GraphTimeout { method: String, seconds: u64 },

    /// A graph lookup ran but its output could not be used.
    #[error("Graph lookup for '{method}' failed: {message}")]
    GraphQuery { method: String, message: String },

    // ========================================================================
    // Method export errors
    // ========================================================================
    /// The method export file could not be parsed.
    #[error("Invalid method export at {path}: {message}")]
    ExportParse { path: PathBuf, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a vector I/O error.
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector-store-unavailable error.
    pub fn vector_unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::VectorUnavailable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a graph-backend-unavailable error.
    pub fn graph_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GraphUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a graph query error.
    pub fn graph_query(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GraphQuery {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the error means the backend itself is unreachable, as opposed
    /// to a single request failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::VectorUnavailable { .. }
                | Self::GraphUnavailable { .. }
                | Self::CollectionNotFound { .. }
        )
    }
}

#[cfg(feature = "chroma")]
impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        if err.is_connect() || err.is_timeout() {
            Self::VectorUnavailable {
                endpoint,
                message: err.to_string(),
            }
        } else {
            Self::Internal {
                message: format!("HTTP error from {}: {}", endpoint, err),
            }
        }
    }
}
