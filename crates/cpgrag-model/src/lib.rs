//! # cpgrag-model
//!
//! Inference layer for cpgrag: query/document embeddings and answer
//! generation, both served by an external inference server.
//!
//! - **Embedding models**: turn method documents and questions into vectors
//! - **Language models**: turn an assembled prompt into an answer
//! - **Config**: the canonical `embedding` and `llm` settings
//!
//! ## Providers
//!
//! - `ollama` (default): native Ollama API
//! - `openai`: any OpenAI-compatible server (TGI, vLLM, llama.cpp)
//!
//! Test doubles live in the consuming crates.
//!
//! ## Usage
//!
//! ```ignore
//! use cpgrag_model::{create_language_model, LlmConfig};
//!
//! let llm = create_language_model(&LlmConfig::default())?;
//! let answer = llm.generate("Who calls validate_input?", 256)?;
//! ```

pub mod config;
pub mod error;

#[cfg(any(feature = "ollama", feature = "openai"))]
mod http;

#[cfg(feature = "ollama")]
mod ollama;

#[cfg(feature = "openai")]
mod openai;

pub use error::{ModelError, ModelResult};

pub use config::{
    EmbeddingConfig, LlmConfig, ProviderKind, DEFAULT_EMBEDDING_BATCH_SIZE,
    DEFAULT_EMBEDDING_MODEL, DEFAULT_LLM_MODEL, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_OLLAMA_URL,
    DEFAULT_TEMPERATURE,
};

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// Trait for embedding models.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across threads.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Generate embeddings for a batch of texts, one vector per input.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Generate embeddings for owned strings.
    fn embed_batch(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed(&refs)
    }

    /// Embed a single text.
    fn embed_one(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::embedding_failed(self.model_id(), "no embedding returned"))
    }

    /// Get the model ID.
    fn model_id(&self) -> &str;

    /// Check the server is reachable and serves this model.
    fn health_check(&self) -> ModelResult<()>;
}

// ============================================================================
// Language Model Trait
// ============================================================================

/// Trait for answer-generating language models.
pub trait LanguageModel: Send + Sync + std::fmt::Debug {
    /// Generate a completion for `prompt`, producing at most
    /// `max_output_tokens` tokens. The raw text is returned uncleaned.
    fn generate(&self, prompt: &str, max_output_tokens: usize) -> ModelResult<String>;

    /// Get the model ID.
    fn model_id(&self) -> &str;

    /// Check the server is reachable and serves this model.
    fn health_check(&self) -> ModelResult<()>;
}

// ============================================================================
// Factory Functions
// ============================================================================

#[allow(dead_code)]
fn not_compiled(provider: ProviderKind) -> ModelError {
    ModelError::ProviderNotAvailable {
        provider: provider.to_string(),
        reason: format!("this build was compiled without the '{provider}' feature"),
    }
}

/// Create an embedding model from configuration.
///
/// No network traffic happens here; an unreachable server surfaces on the
/// first `embed` call.
///
/// # Errors
///
/// Returns [`ModelError::ProviderNotAvailable`] if the provider feature was
/// not compiled in.
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    match config.provider {
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Box::new(ollama::OllamaEmbeddingModel::new(config)?)),
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => Ok(Box::new(openai::OpenAiEmbeddingModel::new(config)?)),
        #[allow(unreachable_patterns)]
        other => Err(not_compiled(other)),
    }
}

/// Create a language model from configuration.
///
/// # Errors
///
/// Returns [`ModelError::ProviderNotAvailable`] if the provider feature was
/// not compiled in.
pub fn create_language_model(config: &LlmConfig) -> ModelResult<Box<dyn LanguageModel>> {
    match config.provider {
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Box::new(ollama::OllamaLanguageModel::new(config)?)),
        #[cfg(feature = "openai")]
        ProviderKind::OpenAi => Ok(Box::new(openai::OpenAiLanguageModel::new(config)?)),
        #[allow(unreachable_patterns)]
        other => Err(not_compiled(other)),
    }
}

// ============================================================================
// Re-export implementations (feature-gated)
// ============================================================================

#[cfg(feature = "ollama")]
pub use ollama::{OllamaEmbeddingModel, OllamaLanguageModel};

#[cfg(feature = "openai")]
pub use openai::{OpenAiEmbeddingModel, OpenAiLanguageModel};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EmptyEmbedder;

    impl EmbeddingModel for EmptyEmbedder {
        fn embed(&self, _texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
            Ok(Vec::new())
        }
        fn model_id(&self) -> &str {
            "empty"
        }
        fn health_check(&self) -> ModelResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_embed_one_without_result() {
        let err = EmptyEmbedder.embed_one("x").unwrap_err();
        assert!(matches!(err, ModelError::EmbeddingFailed { .. }));
    }

    #[test]
    fn test_factories_build_without_network() {
        let embedder = create_embedding_model(&EmbeddingConfig::default()).unwrap();
        assert_eq!(embedder.model_id(), DEFAULT_EMBEDDING_MODEL);

        let llm = create_language_model(&LlmConfig {
            provider: ProviderKind::OpenAi,
            base_url: "http://localhost:8080/v1".to_string(),
            model: "Qwen/Qwen2.5-Coder-7B-Instruct".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(llm.model_id(), "Qwen/Qwen2.5-Coder-7B-Instruct");
    }
}
