//! Common types shared by the pipeline stages.

use cpgrag_db::{GraphNeighborhood, VectorHit};
use serde::{Deserialize, Serialize};

// ============================================================================
// Candidate
// ============================================================================

/// A method surfaced by vector search, with its distance to the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Vector record id (`{project}_{i}`), or `literal:{file}:{name}` for
    /// a method found by name.
    pub id: String,
    pub method_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    pub file_path: String,
    pub line_number: Option<u32>,
    /// Text that was embedded for this method.
    #[serde(default)]
    pub document: String,
    /// Lower is closer.
    pub distance: f32,
    /// Admitted as a module-like backfill entry.
    #[serde(default)]
    pub backfilled: bool,
    /// Found by name because the question quoted it.
    #[serde(default)]
    pub exact_match: bool,
}

impl Candidate {
    /// Create a candidate with just a name, file and distance.
    pub fn new(
        id: impl Into<String>,
        method_name: impl Into<String>,
        file_path: impl Into<String>,
        distance: f32,
    ) -> Self {
        Self {
            id: id.into(),
            method_name: method_name.into(),
            full_name: String::new(),
            file_path: file_path.into(),
            line_number: None,
            document: String::new(),
            distance,
            backfilled: false,
            exact_match: false,
        }
    }

    /// Builder: set the indexed document.
    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    /// Builder: set the line number.
    pub fn with_line(mut self, line: u32) -> Self {
        self.line_number = Some(line);
        self
    }

    /// File path usable for a graph lookup, if any.
    pub fn lookup_path(&self) -> Option<&str> {
        let path = self.file_path.trim();
        (!path.is_empty() && path != "unknown").then_some(path)
    }

    /// Line number as shown to users (`unknown` when absent).
    pub fn line_display(&self) -> String {
        self.line_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl From<VectorHit> for Candidate {
    fn from(hit: VectorHit) -> Self {
        Self {
            id: hit.id,
            method_name: hit.metadata.method_name,
            full_name: hit.metadata.full_name,
            file_path: hit.metadata.file_path,
            line_number: hit.metadata.line_number,
            document: hit.document,
            distance: hit.distance,
            backfilled: false,
            exact_match: false,
        }
    }
}

// ============================================================================
// Neighborhood status
// ============================================================================

/// Outcome of the graph lookup for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum NeighborhoodStatus {
    /// The backend knows the method.
    Found,
    /// The backend has no entry; the neighbourhood is empty.
    NotFound,
    /// The lookup errored or timed out; the neighbourhood was skipped.
    Failed { reason: String },
    /// No graph backend is configured.
    Skipped,
}

impl NeighborhoodStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not found",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// A candidate together with its graph context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContext {
    pub candidate: Candidate,
    /// `None` when the graph stage is disabled or the lookup failed.
    pub neighborhood: Option<GraphNeighborhood>,
    pub lookup: NeighborhoodStatus,
}

impl CandidateContext {
    /// Context for a candidate when no graph backend is configured.
    pub fn without_graph(candidate: Candidate) -> Self {
        Self {
            candidate,
            neighborhood: None,
            lookup: NeighborhoodStatus::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpgrag_db::MethodMetadata;

    #[test]
    fn test_candidate_from_hit() {
        let metadata = MethodMetadata {
            project_name: "demo".to_string(),
            method_name: "validate_input".to_string(),
            file_path: "src/app.py".to_string(),
            line_number: Some(12),
            ..Default::default()
        };
        let candidate = Candidate::from(VectorHit::new("demo_3", "Method: validate_input", metadata, 0.25));
        assert_eq!(candidate.id, "demo_3");
        assert_eq!(candidate.method_name, "validate_input");
        assert_eq!(candidate.line_display(), "12");
        assert!(!candidate.backfilled);
    }

    #[test]
    fn test_lookup_path() {
        assert_eq!(Candidate::new("a", "f", "unknown", 0.1).lookup_path(), None);
        assert_eq!(Candidate::new("a", "f", " ", 0.1).lookup_path(), None);
        assert_eq!(Candidate::new("a", "f", "x.py", 0.1).lookup_path(), Some("x.py"));
    }

    #[test]
    fn test_status_serializes_tagged() {
        let json = serde_json::to_value(NeighborhoodStatus::Failed {
            reason: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "timeout");
    }
}
