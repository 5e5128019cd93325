//! Error types for cpgrag-model.
//!
//! Errors say what went wrong, which endpoint was involved and, where there
//! is one, how to fix it.

use thiserror::Error;

/// Result type alias for cpgrag-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in cpgrag-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Provider errors
    // ========================================================================
    /// Provider not available in this build or not usable with this config.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// The inference server could not be reached.
    #[error("{}", format_unreachable(.endpoint, .message))]
    Unreachable { endpoint: String, message: String },

    /// The request exceeded the configured timeout.
    #[error("Request to {endpoint} timed out after {seconds}s")]
    Timeout { endpoint: String, seconds: u64 },

    /// The server answered with an error status.
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    /// The server answered with something we could not use.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse { provider: String, message: String },

    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Embedding generation failed.
    #[error("Embedding failed for model '{model_id}': {message}")]
    EmbeddingFailed { model_id: String, message: String },

    /// Text generation failed.
    #[error("Generation failed for model '{model_id}': {message}")]
    GenerationFailed { model_id: String, message: String },

    // ========================================================================
    // Wrappers
    // ========================================================================
    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_unreachable(endpoint: &str, message: &str) -> String {
    format!(
        "Cannot reach inference server at {endpoint}: {message}\n\n\
        Start it (for Ollama: `ollama serve`) or point the baseUrl setting\n\
        in ~/.cpgrag/config.yaml at a running server."
    )
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create an embedding failed error.
    pub fn embedding_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a generation failed error.
    pub fn generation_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create an invalid response error.
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Unreachable { .. } => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
