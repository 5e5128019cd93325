//! Ollama provider.
//!
//! Embeddings go through `POST /api/embed`, answers through
//! `POST /api/generate` with streaming disabled. `GET /api/tags` doubles as
//! the health check and tells us whether the model has been pulled.

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{ModelError, ModelResult};
use crate::http::{build_client, check_status, join_url, transport_error};
use crate::{EmbeddingModel, LanguageModel};

const PROVIDER: &str = "ollama";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Whether `pulled` (e.g. `nomic-embed-text:latest`) satisfies `wanted`.
fn tag_matches(pulled: &str, wanted: &str) -> bool {
    if pulled == wanted {
        return true;
    }
    !wanted.contains(':') && pulled.strip_suffix(":latest") == Some(wanted)
}

/// Verify the server is up and `model` is available locally.
fn check_model_pulled(client: &Client, base_url: &str, timeout_secs: u64, model: &str) -> ModelResult<()> {
    let url = join_url(base_url, "api/tags");
    let response = client
        .get(&url)
        .send()
        .map_err(|e| transport_error(e, base_url, timeout_secs))?;
    let tags: TagsResponse = check_status(PROVIDER, response)?
        .json()
        .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

    if tags.models.iter().any(|t| tag_matches(&t.name, model)) {
        Ok(())
    } else {
        Err(ModelError::ProviderNotAvailable {
            provider: PROVIDER.to_string(),
            reason: format!("model '{model}' is not pulled; run `ollama pull {model}`"),
        })
    }
}

// ============================================================================
// OllamaEmbeddingModel
// ============================================================================

/// Embedding model served by Ollama.
#[derive(Debug)]
pub struct OllamaEmbeddingModel {
    client: Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        Ok(Self {
            client: build_client(PROVIDER, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

impl EmbeddingModel for OllamaEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = join_url(&self.base_url, "api/embed");
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let body: EmbedResponse = check_status(PROVIDER, response)?
            .json()
            .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

        if body.embeddings.len() != texts.len() {
            return Err(ModelError::embedding_failed(
                &self.model,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    body.embeddings.len()
                ),
            ));
        }
        Ok(body.embeddings)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn health_check(&self) -> ModelResult<()> {
        check_model_pulled(&self.client, &self.base_url, self.timeout_secs, &self.model)
    }
}

// ============================================================================
// OllamaLanguageModel
// ============================================================================

/// Answer model served by Ollama.
#[derive(Debug)]
pub struct OllamaLanguageModel {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    context_window: Option<usize>,
    timeout_secs: u64,
}

impl OllamaLanguageModel {
    pub fn new(config: &LlmConfig) -> ModelResult<Self> {
        Ok(Self {
            client: build_client(PROVIDER, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            context_window: config.context_window,
            timeout_secs: config.timeout_secs,
        })
    }
}

impl LanguageModel for OllamaLanguageModel {
    fn generate(&self, prompt: &str, max_output_tokens: usize) -> ModelResult<String> {
        let url = join_url(&self.base_url, "api/generate");
        debug!(
            "Generating with {} ({} prompt chars, max {} tokens)",
            self.model,
            prompt.len(),
            max_output_tokens
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: max_output_tokens,
                num_ctx: self.context_window,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let body: GenerateResponse = check_status(PROVIDER, response)?
            .json()
            .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

        if body.response.trim().is_empty() {
            warn!("Ollama returned an empty response for {}", self.model);
        }
        Ok(body.response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn health_check(&self) -> ModelResult<()> {
        check_model_pulled(&self.client, &self.base_url, self.timeout_secs, &self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_matching() {
        assert!(tag_matches("nomic-embed-text:latest", "nomic-embed-text"));
        assert!(tag_matches("qwen2.5-coder:7b", "qwen2.5-coder:7b"));
        assert!(!tag_matches("qwen2.5-coder:14b", "qwen2.5-coder:7b"));
        assert!(!tag_matches("llama3.2:1b", "llama3.2"));
    }

    #[test]
    fn test_generate_request_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "hi",
            stream: false,
            options: GenerateOptions {
                temperature: 0.3,
                num_predict: 64,
                num_ctx: None,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_predict"], 64);
        assert!(json["options"].get("num_ctx").is_none());
    }

    #[test]
    fn test_embed_empty_input_skips_request() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let model = OllamaEmbeddingModel::new(&config).unwrap();
        assert!(model.embed(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_unreachable_server() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let model = OllamaLanguageModel::new(&config).unwrap();
        let err = model.generate("hello", 8).unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err}");
    }
}
