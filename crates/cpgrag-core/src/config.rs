//! Configuration types for cpgrag.
//!
//! - [`GlobalConfig`]: user-level configuration stored in `~/.cpgrag/config.yaml`
//! - [`RetrievalConfig`]: over-fetch and candidate filter tunables
//! - [`PromptConfig`]: prompt size limits and the source-code lookup file
//!
//! Backend sections reuse the canonical types of the infrastructure crates
//! (`VectorStoreConfig`, `GraphBackendConfig`, `EmbeddingConfig`, `LlmConfig`).

use std::fs;
use std::path::{Path, PathBuf};

use cpgrag_db::graph::GraphBackendConfig;
use cpgrag_db::vector::VectorStoreConfig;
use cpgrag_model::{EmbeddingConfig, LlmConfig};
use serde::{Deserialize, Serialize};

use crate::errors::CpgRagError;

// ======================================================================
// Defaults
// ======================================================================

/// Default number of candidates handed to the prompt.
pub const DEFAULT_TOP_K: usize = 5;

/// Default over-fetch multiplier applied to `top_k` before filtering.
pub const DEFAULT_OVERFETCH_FACTOR: usize = 20;

/// Default absolute distance cutoff for backfilled module-like entries.
pub const DEFAULT_MAX_BACKFILL_DISTANCE: f32 = 0.9;

/// Default cutoff relative to the worst selected real method.
pub const DEFAULT_BACKFILL_RELATIVE_FACTOR: f32 = 2.5;

/// Default minimum indexed document length of a real method, in characters.
pub const DEFAULT_MIN_DOCUMENT_CHARS: usize = 30;

/// Default per-candidate code length in the prompt, in characters.
pub const DEFAULT_MAX_CODE_CHARS: usize = 4000;

/// Default number of callers listed per candidate.
pub const DEFAULT_MAX_CALLERS: usize = 15;

/// Default number of callees listed per candidate.
pub const DEFAULT_MAX_CALLEES: usize = 10;

/// Environment variables that override the config file.
pub const ENV_OLLAMA_URL: &str = "CPGRAG_OLLAMA_URL";
pub const ENV_LLM_MODEL: &str = "CPGRAG_LLM_MODEL";
pub const ENV_EMBEDDING_MODEL: &str = "CPGRAG_EMBEDDING_MODEL";
pub const ENV_CHROMA_URL: &str = "CPGRAG_CHROMA_URL";
pub const ENV_TOP_K: &str = "CPGRAG_TOP_K";

// ============================================================================
// GlobalConfig
// ============================================================================

/// User-level configuration.
///
/// Every section and field has a default, so an empty or missing file is a
/// working configuration (Ollama and ChromaDB on localhost, no graph stage).
///
/// # Example YAML
///
/// ```yaml
/// vectorStore:
///   backend: chroma
///   url: http://localhost:8000
/// graph:
///   cpgPath: ./data/cpg/myproject.bin
///   workers: 4
/// embedding:
///   model: nomic-embed-text
/// llm:
///   model: qwen2.5-coder:7b
///   retryOnce: true
/// retrieval:
///   topK: 5
///   maxBackfillDistance: 0.9
/// prompt:
///   maxCodeChars: 4000
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub graph: GraphBackendConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub prompt: PromptConfig,
}

impl GlobalConfig {
    /// Load the global configuration from the default location (`~/.cpgrag/config.yaml`).
    ///
    /// If the file does not exist, returns a default configuration. Environment
    /// overrides are applied on top.
    pub fn load_default() -> Result<Self, CpgRagError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::from_path(&path)?,
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load the global configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CpgRagError::InvalidGlobalConfig`] if the file exists but cannot be parsed.
    /// Returns [`CpgRagError::InvalidConfiguration`] if validation fails.
    pub fn from_path(path: &Path) -> Result<Self, CpgRagError> {
        if !path.exists() {
            tracing::debug!(
                "Global config not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            CpgRagError::InvalidGlobalConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        // An empty file parses as YAML null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            CpgRagError::InvalidGlobalConfig(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default global config directory (`~/.cpgrag`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".cpgrag"))
    }

    /// Get the default global config file path (`~/.cpgrag/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join("config.yaml"))
    }

    /// Apply `CPGRAG_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// `CPGRAG_OLLAMA_URL` only moves endpoints that use the Ollama provider.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_OLLAMA_URL) {
            if self.embedding.provider == cpgrag_model::ProviderKind::Ollama {
                self.embedding.base_url = url.clone();
            }
            if self.llm.provider == cpgrag_model::ProviderKind::Ollama {
                self.llm.base_url = url;
            }
        }
        if let Some(model) = lookup(ENV_LLM_MODEL) {
            self.llm.model = model;
        }
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
        if let Some(url) = lookup(ENV_CHROMA_URL) {
            self.vector_store.url = url;
        }
        if let Some(raw) = lookup(ENV_TOP_K) {
            match raw.trim().parse::<usize>() {
                Ok(k) if k > 0 => self.retrieval.top_k = k,
                _ => tracing::warn!("Ignoring {}={:?}: expected a positive integer", ENV_TOP_K, raw),
            }
        }
    }

    /// Serialize the resolved configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, CpgRagError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validates the whole configuration.
    ///
    /// Returns the first critical error as [`CpgRagError::InvalidConfiguration`];
    /// non-fatal issues are returned as warning strings.
    pub fn validate(&self) -> Result<Vec<String>, CpgRagError> {
        let mut warnings = Vec::new();

        warnings.extend(self.retrieval.validate()?);
        warnings.extend(self.prompt.validate()?);

        if self.embedding.batch_size == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "embedding.batchSize cannot be 0".to_string(),
                hint: "Set batchSize to at least 1 (recommended: 32)".to_string(),
            });
        }
        if self.graph.workers == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "graph.workers cannot be 0".to_string(),
                hint: "Set workers to at least 1 (recommended: 4)".to_string(),
            });
        }
        if self.graph.workers > 32 {
            warnings.push(format!(
                "graph.workers={} starts that many Joern JVMs at once; expect memory pressure",
                self.graph.workers
            ));
        }
        if self.graph.timeout_secs == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "graph.timeoutSecs cannot be 0".to_string(),
                hint: "Joern needs tens of seconds to load a CPG (recommended: 60)".to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            warnings.push(format!(
                "llm.temperature={} is outside 0.0-2.0; most servers will clamp or reject it",
                self.llm.temperature
            ));
        }
        if self.llm.max_output_tokens == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "llm.maxOutputTokens cannot be 0".to_string(),
                hint: "Set maxOutputTokens to at least 64 (recommended: 1024)".to_string(),
            });
        }

        Ok(warnings)
    }
}

// ======================================================================
// RetrievalConfig
// ======================================================================

/// Retrieval and candidate filter configuration.
///
/// # Example YAML
///
/// ```yaml
/// retrieval:
///   topK: 5
///   overfetchFactor: 20
///   maxBackfillDistance: 0.9
///   backfillRelativeFactor: 2.5
///   unknownPathIsModule: true
///   trivialNamesAreModule: true
///   minDocumentChars: 30
///   literalLookup: true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Candidates handed to the prompt.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// The vector search asks for `top_k * overfetch_factor` hits.
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: usize,

    /// Module-like entries farther than this are never backfilled.
    #[serde(default = "default_max_backfill_distance")]
    pub max_backfill_distance: f32,

    /// Tighten the cutoff to `worst real distance * factor`. `null` disables it.
    #[serde(default = "default_backfill_relative_factor")]
    pub backfill_relative_factor: Option<f32>,

    /// Treat hits with an empty or `unknown` file path as module-like.
    #[serde(default = "default_true")]
    pub unknown_path_is_module: bool,

    /// Treat `item`, `keys`, `t`, `__iter__`, `__next__` and names of at
    /// most two characters as module-like.
    #[serde(default = "default_true")]
    pub trivial_names_are_module: bool,

    /// Hits whose indexed document is shorter than this are module-like.
    /// `0` disables the check.
    #[serde(default = "default_min_document_chars")]
    pub min_document_chars: usize,

    /// Look up quoted method names in the question (`"load"`, `` `load` ``)
    /// in the method export and put exact matches ahead of vector hits.
    #[serde(default = "default_true")]
    pub literal_lookup: bool,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_overfetch_factor() -> usize {
    DEFAULT_OVERFETCH_FACTOR
}
fn default_max_backfill_distance() -> f32 {
    DEFAULT_MAX_BACKFILL_DISTANCE
}
fn default_backfill_relative_factor() -> Option<f32> {
    Some(DEFAULT_BACKFILL_RELATIVE_FACTOR)
}
fn default_true() -> bool {
    true
}
fn default_min_document_chars() -> usize {
    DEFAULT_MIN_DOCUMENT_CHARS
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            overfetch_factor: default_overfetch_factor(),
            max_backfill_distance: default_max_backfill_distance(),
            backfill_relative_factor: default_backfill_relative_factor(),
            unknown_path_is_module: true,
            trivial_names_are_module: true,
            min_document_chars: default_min_document_chars(),
            literal_lookup: true,
        }
    }
}

impl RetrievalConfig {
    /// Number of hits requested from the vector store for `top_k`.
    pub fn fetch_size(&self, top_k: usize) -> usize {
        top_k.saturating_mul(self.overfetch_factor.max(1))
    }

    /// Validates the retrieval configuration.
    ///
    /// # Errors
    /// Returns an error if `top_k` or `overfetch_factor` is 0, or a cutoff is negative.
    pub fn validate(&self) -> Result<Vec<String>, CpgRagError> {
        let mut warnings = Vec::new();

        if self.top_k == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "retrieval.topK cannot be 0".to_string(),
                hint: "Set topK to at least 1 (recommended: 5)".to_string(),
            });
        }
        if self.overfetch_factor == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "retrieval.overfetchFactor cannot be 0".to_string(),
                hint: "Set overfetchFactor to at least 1 (recommended: 20)".to_string(),
            });
        }
        if !self.max_backfill_distance.is_finite() || self.max_backfill_distance < 0.0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: format!(
                    "retrieval.maxBackfillDistance={} is not a valid distance",
                    self.max_backfill_distance
                ),
                hint: "Use a non-negative number (recommended: 0.9 for cosine)".to_string(),
            });
        }
        if let Some(factor) = self.backfill_relative_factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(CpgRagError::InvalidConfiguration {
                    message: format!("retrieval.backfillRelativeFactor={} must be positive", factor),
                    hint: "Use a factor such as 2.5, or null to disable it".to_string(),
                });
            }
        }

        if self.top_k > 50 {
            warnings.push(format!(
                "retrieval.topK={} produces very long prompts; most models answer best with 3-10",
                self.top_k
            ));
        }
        if self.overfetch_factor < 3 {
            warnings.push(format!(
                "retrieval.overfetchFactor={} leaves little room to drop module-level entries",
                self.overfetch_factor
            ));
        }

        Ok(warnings)
    }
}

// ======================================================================
// PromptConfig
// ======================================================================

/// Prompt assembly configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    /// Per-candidate code limit in characters.
    #[serde(default = "default_max_code_chars")]
    pub max_code_chars: usize,

    #[serde(default = "default_max_callers")]
    pub max_callers: usize,

    #[serde(default = "default_max_callees")]
    pub max_callees: usize,

    /// Method export used to show original source code instead of the
    /// indexed document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods_json: Option<PathBuf>,
}

fn default_max_code_chars() -> usize {
    DEFAULT_MAX_CODE_CHARS
}
fn default_max_callers() -> usize {
    DEFAULT_MAX_CALLERS
}
fn default_max_callees() -> usize {
    DEFAULT_MAX_CALLEES
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_code_chars: default_max_code_chars(),
            max_callers: default_max_callers(),
            max_callees: default_max_callees(),
            methods_json: None,
        }
    }
}

impl PromptConfig {
    /// Validates the prompt configuration.
    pub fn validate(&self) -> Result<Vec<String>, CpgRagError> {
        let mut warnings = Vec::new();

        if self.max_code_chars == 0 {
            return Err(CpgRagError::InvalidConfiguration {
                message: "prompt.maxCodeChars cannot be 0".to_string(),
                hint: "Set maxCodeChars to at least 200 (recommended: 4000)".to_string(),
            });
        }
        if self.max_code_chars < 200 {
            warnings.push(format!(
                "prompt.maxCodeChars={} cuts most methods after their signature",
                self.max_code_chars
            ));
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = GlobalConfig::from_path(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.retrieval.top_k, DEFAULT_TOP_K);
        assert_eq!(config.prompt.max_code_chars, DEFAULT_MAX_CODE_CHARS);
    }

    #[test]
    fn test_partial_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "retrieval:\n  topK: 3\n  backfillRelativeFactor: null\nllm:\n  model: llama3.2\ngraph:\n  workers: 2\n",
        )
        .unwrap();

        let config = GlobalConfig::from_path(&path).unwrap();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.backfill_relative_factor, None);
        assert_eq!(config.retrieval.overfetch_factor, DEFAULT_OVERFETCH_FACTOR);
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.graph.workers, 2);
        assert_eq!(config.vector_store.backend, "chroma");
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "\n").unwrap();
        assert_eq!(GlobalConfig::from_path(&path).unwrap(), GlobalConfig::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "retrieval: [unclosed").unwrap();
        let err = GlobalConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, CpgRagError::InvalidGlobalConfig(_)));
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "retrieval:\n  topK: 0\n").unwrap();
        let err = GlobalConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, CpgRagError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_validate_warnings() {
        let mut config = GlobalConfig::default();
        assert!(config.validate().unwrap().is_empty());

        config.retrieval.top_k = 100;
        config.prompt.max_code_chars = 50;
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_negative_backfill_distance_rejected() {
        let mut config = GlobalConfig::default();
        config.retrieval.max_backfill_distance = -0.1;
        assert!(config.validate().is_err());

        config.retrieval.max_backfill_distance = 0.9;
        config.retrieval.backfill_relative_factor = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_OLLAMA_URL, "http://gpu-box:11434"),
            (ENV_LLM_MODEL, "llama3.2"),
            (ENV_CHROMA_URL, "http://chroma:8000"),
            (ENV_TOP_K, "7"),
        ]
        .into_iter()
        .collect();

        let mut config = GlobalConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.embedding.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.embedding.model, cpgrag_model::DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.vector_store.url, "http://chroma:8000");
        assert_eq!(config.retrieval.top_k, 7);
    }

    #[test]
    fn test_bad_top_k_override_ignored() {
        let mut config = GlobalConfig::default();
        config.apply_overrides_from(|k| (k == ENV_TOP_K).then(|| "zero".to_string()));
        assert_eq!(config.retrieval.top_k, DEFAULT_TOP_K);
    }

    #[test]
    fn test_yaml_roundtrip_uses_camel_case() {
        let yaml = GlobalConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("vectorStore:"));
        assert!(yaml.contains("maxBackfillDistance:"));
        let parsed: GlobalConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, GlobalConfig::default());
    }

    #[test]
    fn test_fetch_size() {
        let retrieval = RetrievalConfig::default();
        assert_eq!(retrieval.fetch_size(5), 100);
    }
}
