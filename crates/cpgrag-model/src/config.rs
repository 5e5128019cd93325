//! Configuration types for cpgrag-model.
//!
//! These are the canonical embedding and LLM settings; `cpgrag-core` embeds
//! them in its `GlobalConfig` instead of defining duplicates.

use serde::{Deserialize, Serialize};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default embedding model (Ollama tag).
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Default answer model (Ollama tag of Qwen2.5-Coder-7B-Instruct).
pub const DEFAULT_LLM_MODEL: &str = "qwen2.5-coder:7b";

/// Default sampling temperature for answers.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default cap on generated tokens.
pub const DEFAULT_MAX_OUTPUT_TOKENS: usize = 1024;

/// Default embedding batch size.
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 32;

// ============================================================================
// ProviderKind
// ============================================================================

/// Inference server flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Ollama native API.
    #[default]
    Ollama,
    /// OpenAI-compatible API (`/v1/chat/completions`, `/v1/embeddings`).
    OpenAi,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai-compatible" | "tgi" | "vllm" => Ok(Self::OpenAi),
            _ => Err(format!(
                "Unknown provider: '{}'. Use 'ollama' or 'openai'.",
                s
            )),
        }
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Embedding model settings.
///
/// # Example (YAML)
///
/// ```yaml
/// embedding:
///   provider: ollama
///   baseUrl: http://localhost:11434
///   model: nomic-embed-text
///   batchSize: 32
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Server root (`http://host:11434`, or `http://host:8080/v1` for OpenAI-compatible).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Texts per request while indexing.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token for OpenAI-compatible servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}
fn default_batch_size() -> usize {
    DEFAULT_EMBEDDING_BATCH_SIZE
}
fn default_embedding_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
            api_key: None,
        }
    }
}

// ============================================================================
// LlmConfig
// ============================================================================

/// Answer model settings.
///
/// # Example (YAML)
///
/// ```yaml
/// llm:
///   provider: ollama
///   model: qwen2.5-coder:7b
///   temperature: 0.3
///   maxOutputTokens: 1024
///   timeoutSecs: 180
///   retryOnce: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: usize,

    /// Context window requested from Ollama (`num_ctx`); server default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<usize>,

    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry a failed generation once when the failure looks transient.
    #[serde(default)]
    pub retry_once: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_max_output_tokens() -> usize {
    DEFAULT_MAX_OUTPUT_TOKENS
}
fn default_llm_timeout_secs() -> u64 {
    180
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            context_window: None,
            timeout_secs: default_llm_timeout_secs(),
            retry_once: false,
            api_key: None,
        }
    }
}
