//! OpenAI-compatible provider (TGI, vLLM, llama.cpp server, hosted APIs).
//!
//! `baseUrl` is expected to include the version prefix, e.g.
//! `http://localhost:8080/v1`.

use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{ModelError, ModelResult};
use crate::http::{build_client, check_status, join_url, transport_error};
use crate::{EmbeddingModel, LanguageModel};

const PROVIDER: &str = "openai";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: usize,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn with_auth(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

fn ping_models(client: &Client, base_url: &str, api_key: Option<&str>, timeout_secs: u64) -> ModelResult<()> {
    let url = join_url(base_url, "models");
    let response = with_auth(client.get(&url), api_key)
        .send()
        .map_err(|e| transport_error(e, base_url, timeout_secs))?;
    check_status(PROVIDER, response)?;
    Ok(())
}

// ============================================================================
// OpenAiEmbeddingModel
// ============================================================================

/// Embedding model behind an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug)]
pub struct OpenAiEmbeddingModel {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiEmbeddingModel {
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        Ok(Self {
            client: build_client(PROVIDER, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

impl EmbeddingModel for OpenAiEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = join_url(&self.base_url, "embeddings");
        let request = self.client.post(&url).json(&EmbeddingsRequest {
            model: &self.model,
            input: texts,
        });
        let response = with_auth(request, self.api_key.as_deref())
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let mut body: EmbeddingsResponse = check_status(PROVIDER, response)?
            .json()
            .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

        if body.data.len() != texts.len() {
            return Err(ModelError::embedding_failed(
                &self.model,
                format!("expected {} embeddings, got {}", texts.len(), body.data.len()),
            ));
        }
        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn health_check(&self) -> ModelResult<()> {
        ping_models(&self.client, &self.base_url, self.api_key.as_deref(), self.timeout_secs)
    }
}

// ============================================================================
// OpenAiLanguageModel
// ============================================================================

/// Chat model behind an OpenAI-compatible `/chat/completions` endpoint.
///
/// The assembled prompt is sent as a single user message.
#[derive(Debug)]
pub struct OpenAiLanguageModel {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
    timeout_secs: u64,
}

impl OpenAiLanguageModel {
    pub fn new(config: &LlmConfig) -> ModelResult<Self> {
        Ok(Self {
            client: build_client(PROVIDER, config.timeout_secs)?,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: config.api_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

impl LanguageModel for OpenAiLanguageModel {
    fn generate(&self, prompt: &str, max_output_tokens: usize) -> ModelResult<String> {
        let url = join_url(&self.base_url, "chat/completions");
        debug!("Chat completion with {} ({} prompt chars)", self.model, prompt.len());

        let request = self.client.post(&url).json(&ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: max_output_tokens,
            temperature: self.temperature,
            stream: false,
        });
        let response = with_auth(request, self.api_key.as_deref())
            .send()
            .map_err(|e| transport_error(e, &self.base_url, self.timeout_secs))?;

        let body: ChatResponse = check_status(PROVIDER, response)?
            .json()
            .map_err(|e| ModelError::invalid_response(PROVIDER, e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| ModelError::generation_failed(&self.model, "response had no choices"))
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn health_check(&self) -> ModelResult<()> {
        ping_models(&self.client, &self.base_url, self.api_key.as_deref(), self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "Qwen/Qwen2.5-Coder-7B-Instruct",
            messages: [ChatMessage {
                role: "user",
                content: "Who calls main?",
            }],
            max_tokens: 256,
            temperature: 0.3,
            stream: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_embeddings_response_reordered_by_index() {
        let mut body: EmbeddingsResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        body.data.sort_by_key(|d| d.index);
        assert_eq!(body.data[0].embedding, vec![1.0, 0.0]);
    }

    #[test]
    fn test_chat_response_null_content() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(body.choices[0].message.content.is_none());
    }
}
