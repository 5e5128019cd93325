//! Error types for cpgrag-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for cpgrag operations.
///
/// Only a few of these end a query. A missing graph entry or an unreachable
/// backend is recovered inside the pipeline; see [`CpgRagError::is_recoverable`].
#[derive(Error, Debug)]
pub enum CpgRagError {
    /// Global configuration file is invalid.
    #[error("Global config invalid: {0}")]
    InvalidGlobalConfig(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Invalid argument provided to a command.
    #[error("{0}")]
    InvalidArgument(String),

    // =========================================================================
    // Pipeline Errors
    // =========================================================================
    /// No graph entry for a method.
    #[error("No graph entry for method `{method}`")]
    NotFound {
        /// The method that was looked up.
        method: String,
    },

    /// A graph backend or the vector index cannot be reached.
    #[error("{stage} backend `{backend}` is unavailable: {reason}")]
    BackendUnavailable {
        /// Pipeline stage that lost its backend (`retrieval`, `graph`, `llm`).
        stage: String,
        /// The backend name.
        backend: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// The LLM did not produce a usable answer.
    #[error("Answer generation failed with `{model}`: {reason}")]
    GenerationFailure {
        /// The model that was asked.
        model: String,
        /// Description of the failure.
        reason: String,
    },

    /// The prompt document could not be formatted.
    #[error("Prompt assembly failed: {0}")]
    PromptAssembly(String),

    /// The method export could not be used.
    #[error("Method export `{path}` unusable: {reason}")]
    MethodExport {
        /// Path to the export file.
        path: PathBuf,
        /// Description of the failure.
        reason: String,
    },

    // =========================================================================
    // Wrappers
    // =========================================================================
    /// Storage layer error.
    #[error(transparent)]
    Db(#[from] cpgrag_db::DbError),

    /// Inference layer error.
    #[error(transparent)]
    Model(#[from] cpgrag_model::ModelError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result alias for cpgrag-core operations.
pub type CpgRagResult<T> = Result<T, CpgRagError>;

impl CpgRagError {
    /// Create a backend unavailable error.
    pub fn backend_unavailable(
        stage: impl Into<String>,
        backend: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::BackendUnavailable {
            stage: stage.into(),
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Create a generation failure error.
    pub fn generation_failure(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GenerationFailure {
            model: model.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline keeps going after this error with reduced context.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::BackendUnavailable { .. } => true,
            Self::Db(e) => e.is_unavailable(),
            _ => false,
        }
    }
}

impl From<std::fmt::Error> for CpgRagError {
    fn from(err: std::fmt::Error) -> Self {
        Self::PromptAssembly(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(CpgRagError::NotFound {
            method: "ghost".to_string()
        }
        .is_recoverable());
        assert!(CpgRagError::backend_unavailable("graph", "joern", "no CPG").is_recoverable());
        assert!(CpgRagError::Db(cpgrag_db::DbError::CollectionNotFound {
            collection: "methods_x".to_string()
        })
        .is_recoverable());
        assert!(!CpgRagError::generation_failure("llama3.2", "timeout").is_recoverable());
        assert!(!CpgRagError::InvalidArgument("empty question".to_string()).is_recoverable());
    }

    #[test]
    fn test_configuration_message_has_hint() {
        let err = CpgRagError::InvalidConfiguration {
            message: "retrieval.topK cannot be 0".to_string(),
            hint: "Set topK to at least 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: retrieval.topK cannot be 0. Set topK to at least 1"
        );
    }
}
