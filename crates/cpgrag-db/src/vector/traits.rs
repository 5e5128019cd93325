//! Vector store traits and core types.
//!
//! A vector store holds one collection per project (`methods_{project}`), one
//! record per extracted method. Queries return hits ordered by ascending
//! distance, so lower is always better regardless of the metric.

use crate::error::DbResult;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// VectorMetric
// ============================================================================

/// Distance function of a collection.
///
/// Names follow ChromaDB's `hnsw:space` values so a collection created by
/// either backend reports the same distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorMetric {
    /// `1 - cosine_similarity` (default).
    #[default]
    Cosine,
    /// Squared Euclidean distance.
    L2,
    /// `1 - dot_product`.
    Ip,
}

impl VectorMetric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorMetric::Cosine => "cosine",
            VectorMetric::L2 => "l2",
            VectorMetric::Ip => "ip",
        }
    }

    /// Distance between two vectors under this metric.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            VectorMetric::Cosine => 1.0 - cosine_similarity(a, b),
            VectorMetric::L2 => squared_euclidean(a, b),
            VectorMetric::Ip => 1.0 - dot_product(a, b),
        }
    }
}

impl std::fmt::Display for VectorMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// MethodMetadata
// ============================================================================

/// Metadata stored next to each method embedding.
///
/// Keys are snake_case and the line number is written as a string, which is
/// the layout ChromaDB collections built by the extraction tooling already
/// use. Reading accepts a string, a number or nothing for the line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodMetadata {
    pub project_name: String,
    pub method_name: String,
    pub full_name: String,
    pub file_path: String,
    #[serde(
        serialize_with = "line_as_string",
        deserialize_with = "line_from_any"
    )]
    pub line_number: Option<u32>,
    pub signature: String,
}

fn line_as_string<S: Serializer>(line: &Option<u32>, s: S) -> Result<S::Ok, S::Error> {
    match line {
        Some(n) => s.serialize_str(&n.to_string()),
        None => s.serialize_str("unknown"),
    }
}

fn line_from_any<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ============================================================================
// VectorRecord / VectorHit
// ============================================================================

/// A method embedding to insert or replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Record id, `{project}_{i}`.
    pub id: String,
    pub embedding: Vec<f32>,
    /// Text that was embedded.
    pub document: String,
    pub metadata: MethodMetadata,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub document: String,
    pub metadata: MethodMetadata,
    /// Distance to the query vector; lower is closer.
    pub distance: f32,
}

impl VectorHit {
    /// Create a hit from its parts.
    pub fn new(
        id: impl Into<String>,
        document: impl Into<String>,
        metadata: MethodMetadata,
        distance: f32,
    ) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata,
            distance,
        }
    }
}

// ============================================================================
// VectorStore
// ============================================================================

/// Abstraction over the external vector database.
///
/// Implementations must be `Send + Sync`; a store is opened read-only by
/// concurrent queries and written only by the indexer.
pub trait VectorStore: Send + Sync {
    /// Return up to `limit` hits from `collection`, ascending by distance.
    ///
    /// # Errors
    ///
    /// - [`DbError::CollectionNotFound`](crate::DbError::CollectionNotFound) if the collection does not exist
    /// - [`DbError::DimensionMismatch`](crate::DbError::DimensionMismatch) if `embedding` does not match the stored vectors
    /// - [`DbError::VectorUnavailable`](crate::DbError::VectorUnavailable) if the store cannot be reached
    fn query(&self, collection: &str, embedding: &[f32], limit: usize)
        -> DbResult<Vec<VectorHit>>;

    /// Insert or replace records, creating the collection if needed.
    fn upsert(&self, collection: &str, records: &[VectorRecord]) -> DbResult<()>;

    /// Number of records in a collection.
    fn count(&self, collection: &str) -> DbResult<usize>;

    /// Remove a collection and every record in it.
    ///
    /// Deleting a collection that does not exist is not an error.
    fn delete_collection(&self, collection: &str) -> DbResult<()>;

    /// Check that the store is reachable.
    fn health_check(&self) -> DbResult<()>;

    /// Backend name for logs and status output.
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Distance functions
// ============================================================================

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

// ============================================================================
// Tests
// ============================================================================
