//! Test doubles for the inference traits.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cpgrag_model::{EmbeddingModel, LanguageModel, ModelError, ModelResult};

/// Deterministic bag-of-words embedder: one hashed bucket per token.
#[derive(Debug)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % self.dimension as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
        } else {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl EmbeddingModel for HashEmbedder {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn model_id(&self) -> &str {
        "hash-embedder"
    }

    fn health_check(&self) -> ModelResult<()> {
        Ok(())
    }
}

/// Embedder whose server is never reachable.
#[derive(Debug)]
pub struct DownEmbedder;

impl EmbeddingModel for DownEmbedder {
    fn embed(&self, _texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        Err(ModelError::Unreachable {
            endpoint: "http://127.0.0.1:9".to_string(),
            message: "connection refused".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        "down"
    }

    fn health_check(&self) -> ModelResult<()> {
        self.embed(&[]).map(|_| ())
    }
}

/// Language model replaying scripted responses and recording prompts.
#[derive(Debug)]
pub struct ScriptedLlm {
    responses: Mutex<Vec<ModelResult<String>>>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    /// Responses are served in order; the last one repeats.
    pub fn new(responses: Vec<ModelResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn timing_out() -> Self {
        Self::new(vec![Err(timeout())])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn timeout() -> ModelError {
    ModelError::Timeout {
        endpoint: "http://localhost:11434".to_string(),
        seconds: 1,
    }
}

fn clone_result(result: &ModelResult<String>) -> ModelResult<String> {
    match result {
        Ok(text) => Ok(text.clone()),
        Err(ModelError::Timeout { endpoint, seconds }) => Err(ModelError::Timeout {
            endpoint: endpoint.clone(),
            seconds: *seconds,
        }),
        Err(e) => Err(ModelError::generation_failed("scripted", e.to_string())),
    }
}

impl LanguageModel for ScriptedLlm {
    fn generate(&self, prompt: &str, _max_output_tokens: usize) -> ModelResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let responses = self.responses.lock().unwrap();
        let idx = call.min(responses.len().saturating_sub(1));
        clone_result(&responses[idx])
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    fn health_check(&self) -> ModelResult<()> {
        Ok(())
    }
}
