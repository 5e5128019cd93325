//! cpgrag Engine – builds backends from configuration and runs queries.
//!
//! The [`CpgRagEngine`] is the main entry point of the library. It owns the
//! resolved [`GlobalConfig`] and the process-wide neighbourhood cache; every
//! call opens its backends from that configuration, so runs are independent
//! and may execute concurrently from several threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cpgrag_db::graph::{open_graph_backend, GraphBackendConfig, GraphBackendKind};
use cpgrag_db::vector::open_vector_store;
use cpgrag_db::{MethodExport, VectorStore};
use cpgrag_model::{create_embedding_model, create_language_model, EmbeddingModel, LanguageModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ask::{run_ask, AskBackends, AskOptions, AskReport};
use crate::catalog::MethodCatalog;
use crate::config::GlobalConfig;
use crate::errors::{CpgRagError, CpgRagResult};
use crate::index::{run_index, IndexReport};
use crate::neighborhood::{NeighborhoodCache, NeighborhoodFetcher};
use crate::overview::{build_overview, CodebaseOverview};

// ============================================================================
// Backend checks
// ============================================================================

/// Reachability of one configured backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendCheck {
    /// `vectorStore`, `embedding`, `graph` or `llm`.
    pub component: String,
    /// Backend or model in use.
    pub backend: String,
    pub ok: bool,
    /// Error text when not ok, or a note such as "not configured".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl BackendCheck {
    fn from_result<E: std::fmt::Display>(
        component: &str,
        backend: impl Into<String>,
        result: Result<(), E>,
    ) -> Self {
        Self {
            component: component.to_string(),
            backend: backend.into(),
            ok: result.is_ok(),
            detail: result.err().map(|e| e.to_string()),
        }
    }
}

// ============================================================================
// CpgRagEngine
// ============================================================================

/// The main engine for cpgrag operations.
///
/// # Example
///
/// ```ignore
/// use cpgrag_core::{AskOptions, CpgRagEngine};
///
/// let engine = CpgRagEngine::with_defaults()?;
/// let report = engine.ask(&AskOptions::new("Who calls validate_input?", "medsam"))?;
/// if let Some(answer) = report.answer.text() {
///     println!("{answer}");
/// }
/// ```
#[derive(Debug)]
pub struct CpgRagEngine {
    /// Global configuration loaded from `~/.cpgrag/config.yaml`.
    config: GlobalConfig,
    /// Neighbourhoods shared by every run of this engine.
    cache: Arc<NeighborhoodCache>,
}

impl CpgRagEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine from a resolved configuration.
    pub fn new(config: GlobalConfig) -> Self {
        Self {
            config,
            cache: Arc::new(NeighborhoodCache::new()),
        }
    }

    /// Create an engine from `~/.cpgrag/config.yaml` plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but is invalid.
    pub fn with_defaults() -> anyhow::Result<Self> {
        let config = GlobalConfig::load_default()?;
        Ok(Self::new(config))
    }

    /// Create an engine from a specific configuration file plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn with_config(path: &Path) -> anyhow::Result<Self> {
        let mut config = GlobalConfig::from_path(path)?;
        config.apply_env_overrides();
        Ok(Self::new(config))
    }

    /// The resolved configuration.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Neighbourhood cache shared by every run.
    pub fn cache(&self) -> &Arc<NeighborhoodCache> {
        &self.cache
    }

    // -------------------------------------------------------------------------
    // Ask
    // -------------------------------------------------------------------------

    /// Configuration for one run: the engine config with the run's overrides.
    fn config_for(&self, options: &AskOptions) -> GlobalConfig {
        let mut config = self.config.clone();
        if let Some(cpg) = &options.cpg_path {
            config.graph.cpg_path = Some(cpg.clone());
            config.graph.backend = GraphBackendKind::Joern;
        } else if let Some(export) = &options.graph_export {
            config.graph.export_path = Some(export.clone());
            config.graph.backend = GraphBackendKind::Export;
        }
        if let Some(methods) = &options.methods_json {
            config.prompt.methods_json = Some(methods.clone());
        }
        if let Some(model) = &options.llm_model {
            config.llm.model = model.clone();
        }
        config
    }

    fn open_store(&self, config: &GlobalConfig, warnings: &mut Vec<String>) -> Option<Arc<dyn VectorStore>> {
        match open_vector_store(&config.vector_store) {
            Ok(store) => Some(store),
            Err(e) => {
                let err = CpgRagError::backend_unavailable("retrieval", &config.vector_store.backend, e.to_string());
                warn!("{}", err);
                warnings.push(err.to_string());
                None
            }
        }
    }

    fn open_embedder(&self, config: &GlobalConfig, warnings: &mut Vec<String>) -> Option<Box<dyn EmbeddingModel>> {
        match create_embedding_model(&config.embedding) {
            Ok(model) => Some(model),
            Err(e) => {
                let err = CpgRagError::backend_unavailable("retrieval", config.embedding.provider.to_string(), e.to_string());
                warn!("{}", err);
                warnings.push(err.to_string());
                None
            }
        }
    }

    fn open_fetcher(&self, graph: &GraphBackendConfig, warnings: &mut Vec<String>) -> Option<NeighborhoodFetcher> {
        let backend = match open_graph_backend(graph) {
            Ok(Some(backend)) => backend,
            Ok(None) => {
                debug!("No graph backend configured, neighbourhoods disabled");
                return None;
            }
            Err(e) => {
                let err = CpgRagError::backend_unavailable("graph", graph.effective_kind().to_string(), e.to_string());
                warn!("{}", err);
                warnings.push(err.to_string());
                return None;
            }
        };

        let cache = graph.cache.then(|| Arc::clone(&self.cache));
        match NeighborhoodFetcher::new(backend, graph.workers, cache) {
            Ok(fetcher) => Some(fetcher),
            Err(e) => {
                warn!("{}", e);
                warnings.push(e.to_string());
                None
            }
        }
    }

    fn open_llm(&self, config: &GlobalConfig, warnings: &mut Vec<String>) -> Option<Box<dyn LanguageModel>> {
        match create_language_model(&config.llm) {
            Ok(model) => Some(model),
            Err(e) => {
                let err = CpgRagError::backend_unavailable("llm", &config.llm.model, e.to_string());
                warn!("{}", err);
                warnings.push(err.to_string());
                None
            }
        }
    }

    /// Source lookup table: `prompt.methodsJson`, else the graph export.
    fn open_catalog(&self, config: &GlobalConfig, warnings: &mut Vec<String>) -> Option<MethodCatalog> {
        let path: &PathBuf = config
            .prompt
            .methods_json
            .as_ref()
            .or(config.graph.export_path.as_ref())?;

        match MethodCatalog::load(path) {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                warn!("Using indexed code only: {}", e);
                warnings.push(e.to_string());
                None
            }
        }
    }

    /// Answer one question.
    ///
    /// Backends that cannot be opened are reported in the returned
    /// [`AskReport::warnings`] and the run continues without them.
    ///
    /// # Errors
    ///
    /// See [`run_ask`].
    pub fn ask(&self, options: &AskOptions) -> CpgRagResult<AskReport> {
        let config = self.config_for(options);
        let mut warnings = Vec::new();

        let store = self.open_store(&config, &mut warnings);
        let embedder = self.open_embedder(&config, &mut warnings);
        let fetcher = self.open_fetcher(&config.graph, &mut warnings);
        let llm = if options.no_llm {
            None
        } else {
            self.open_llm(&config, &mut warnings)
        };
        let catalog = self.open_catalog(&config, &mut warnings);

        let backends = AskBackends {
            embedder: embedder.as_deref(),
            store: store.as_deref(),
            graph: fetcher.as_ref(),
            llm: llm.as_deref(),
            catalog: catalog.as_ref(),
        };

        let mut report = run_ask(options, &backends, &config)?;
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    // -------------------------------------------------------------------------
    // Index
    // -------------------------------------------------------------------------

    /// Index the method export at `methods_json` under `project`.
    ///
    /// # Errors
    ///
    /// Fails if the export cannot be read or any backend call fails.
    pub fn index(
        &self,
        methods_json: &Path,
        project: &str,
        batch_size: Option<usize>,
    ) -> CpgRagResult<IndexReport> {
        let export = MethodExport::load(methods_json).map_err(|e| CpgRagError::MethodExport {
            path: methods_json.to_path_buf(),
            reason: e.to_string(),
        })?;
        let store = open_vector_store(&self.config.vector_store)?;
        let embedder = create_embedding_model(&self.config.embedding)?;
        let batch_size = batch_size.unwrap_or(self.config.embedding.batch_size);

        run_index(&export, project, embedder.as_ref(), store.as_ref(), batch_size)
    }

    // -------------------------------------------------------------------------
    // Overview
    // -------------------------------------------------------------------------

    /// Summarize a method export: `methods_json`, else `prompt.methodsJson`,
    /// else `graph.exportPath`.
    ///
    /// # Errors
    ///
    /// Fails if no export is given or configured, or it cannot be read.
    pub fn overview(&self, methods_json: Option<&Path>) -> CpgRagResult<CodebaseOverview> {
        let path = methods_json
            .or(self.config.prompt.methods_json.as_deref())
            .or(self.config.graph.export_path.as_deref())
            .ok_or_else(|| {
                CpgRagError::InvalidArgument(
                    "No method export given; pass METHODS_JSON or set prompt.methodsJson".to_string(),
                )
            })?;
        let export = MethodExport::load(path).map_err(|e| CpgRagError::MethodExport {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(build_overview(&export))
    }

    // -------------------------------------------------------------------------
    // Health
    // -------------------------------------------------------------------------

    /// Check every configured backend once.
    pub fn check_backends(&self) -> Vec<BackendCheck> {
        let config = &self.config;
        let mut checks = Vec::new();

        checks.push(match open_vector_store(&config.vector_store) {
            Ok(store) => BackendCheck::from_result("vectorStore", store.backend_name(), store.health_check()),
            Err(e) => BackendCheck::from_result("vectorStore", &config.vector_store.backend, Err(e)),
        });

        checks.push(match create_embedding_model(&config.embedding) {
            Ok(model) => BackendCheck::from_result("embedding", model.model_id(), model.health_check()),
            Err(e) => BackendCheck::from_result("embedding", &config.embedding.model, Err(e)),
        });

        checks.push(match open_graph_backend(&config.graph) {
            Ok(Some(graph)) => BackendCheck::from_result("graph", graph.backend_name(), graph.health_check()),
            Ok(None) => BackendCheck {
                component: "graph".to_string(),
                backend: "none".to_string(),
                ok: true,
                detail: Some("not configured; answers use retrieved code only".to_string()),
            },
            Err(e) => BackendCheck::from_result("graph", config.graph.effective_kind().to_string(), Err(e)),
        });

        checks.push(match create_language_model(&config.llm) {
            Ok(model) => BackendCheck::from_result("llm", model.model_id(), model.health_check()),
            Err(e) => BackendCheck::from_result("llm", &config.llm.model, Err(e)),
        });

        checks
    }
}
