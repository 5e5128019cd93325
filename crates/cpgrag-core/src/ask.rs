//! Ask pipeline.
//!
//! One question is one run:
//!
//! ```text
//! quoted names -> embed question -> vector search (top_k * overfetch) -> candidate filter
//!   -> graph neighbourhoods -> prompt -> [dump] -> LLM -> answer cleanup
//! ```
//!
//! Retrieval and graph failures degrade the context but never abort the
//! run; a generation failure only fails the answer. Candidates and
//! neighbourhoods are always reported.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use cpgrag_db::vector::collection_name;
use cpgrag_db::VectorStore;
use cpgrag_model::{EmbeddingModel, LanguageModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::answer::clean_answer;
use crate::catalog::MethodCatalog;
use crate::config::GlobalConfig;
use crate::errors::{CpgRagError, CpgRagResult};
use crate::filter::{filter_candidates, FilterPolicy};
use crate::literal::{literal_candidates, merge_literal, quoted_names};
use crate::neighborhood::NeighborhoodFetcher;
use crate::prompt::{assemble_prompt, entries_from_contexts, PromptLimits, QuestionKind};
use crate::types::{Candidate, CandidateContext, NeighborhoodStatus};

// ============================================================================
// Options
// ============================================================================

/// Options for one ask run.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub question: String,
    pub project: String,
    /// Overrides `retrieval.topK`.
    pub top_k: Option<usize>,
    /// Write the exact prompt text here before generation.
    pub dump_prompt: Option<PathBuf>,
    /// Stop after prompt assembly.
    pub no_llm: bool,
    /// Overrides `graph.cpgPath` (selects the Joern backend).
    pub cpg_path: Option<PathBuf>,
    /// Overrides `graph.exportPath` (selects the export backend).
    pub graph_export: Option<PathBuf>,
    /// Overrides `prompt.methodsJson`.
    pub methods_json: Option<PathBuf>,
    /// Overrides `llm.model`.
    pub llm_model: Option<String>,
}

impl AskOptions {
    pub fn new(question: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            project: project.into(),
            ..Default::default()
        }
    }

    /// Builder: set top_k.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Builder: skip generation.
    pub fn without_llm(mut self) -> Self {
        self.no_llm = true;
        self
    }

    /// Builder: dump the prompt to `path`.
    pub fn with_dump_prompt(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_prompt = Some(path.into());
        self
    }
}

/// Backends available to a run. Any of them may be missing.
#[derive(Default)]
pub struct AskBackends<'a> {
    pub embedder: Option<&'a dyn EmbeddingModel>,
    pub store: Option<&'a dyn VectorStore>,
    pub graph: Option<&'a NeighborhoodFetcher>,
    pub llm: Option<&'a dyn LanguageModel>,
    pub catalog: Option<&'a MethodCatalog>,
}

// ============================================================================
// Report
// ============================================================================

/// Final state of the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum AnswerStatus {
    Answered { text: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl AnswerStatus {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Answered { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Wall-clock time per stage, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub retrieval_ms: u64,
    pub filter_ms: u64,
    pub graph_ms: u64,
    pub prompt_ms: u64,
    pub generation_ms: u64,
    pub total_ms: u64,
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AskReport {
    pub query_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub question: String,
    pub project: String,
    pub top_k: usize,
    pub question_kind: QuestionKind,
    /// Candidates before filtering: quoted-name matches plus vector hits.
    pub pool_size: usize,
    pub candidates: Vec<CandidateContext>,
    /// Whether neighbourhoods were looked up at all.
    pub graph_enabled: bool,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_path: Option<PathBuf>,
    pub answer: AnswerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    /// Recovered problems (unreachable backends, failed lookups).
    pub warnings: Vec<String>,
    pub timings: StageTimings,
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

// ============================================================================
// Stages
// ============================================================================

/// Quoted-name matches from the catalog followed by vector hits.
fn retrieve(
    question: &str,
    project: &str,
    fetch_size: usize,
    config: &GlobalConfig,
    backends: &AskBackends<'_>,
    warnings: &mut Vec<String>,
) -> Vec<Candidate> {
    let literal = if config.retrieval.literal_lookup {
        literal_lookup(question, backends.catalog)
    } else {
        Vec::new()
    };
    let hits = vector_search(question, project, fetch_size, backends, warnings);
    merge_literal(literal, hits)
}

fn literal_lookup(question: &str, catalog: Option<&MethodCatalog>) -> Vec<Candidate> {
    let names = quoted_names(question);
    if names.is_empty() {
        return Vec::new();
    }
    let Some(catalog) = catalog else {
        debug!("No method export loaded, quoted names {:?} not looked up", names);
        return Vec::new();
    };
    let found = literal_candidates(catalog, &names);
    debug!("Quoted names {:?} matched {} methods", names, found.len());
    found
}

fn vector_search(
    question: &str,
    project: &str,
    fetch_size: usize,
    backends: &AskBackends<'_>,
    warnings: &mut Vec<String>,
) -> Vec<Candidate> {
    let (Some(embedder), Some(store)) = (backends.embedder, backends.store) else {
        let err = CpgRagError::backend_unavailable("retrieval", "vector", "no embedder or vector store configured");
        warn!("{}", err);
        warnings.push(err.to_string());
        return Vec::new();
    };

    let collection = collection_name(project);
    let result = embedder
        .embed_one(question)
        .map_err(CpgRagError::from)
        .and_then(|embedding| {
            store
                .query(&collection, &embedding, fetch_size)
                .map_err(CpgRagError::from)
        });

    match result {
        Ok(hits) => {
            debug!("Vector search returned {} hits from '{}'", hits.len(), collection);
            hits.into_iter().map(Candidate::from).collect()
        }
        Err(e) => {
            let err = CpgRagError::backend_unavailable("retrieval", store.backend_name(), e.to_string());
            warn!("Continuing without retrieved methods: {}", err);
            warnings.push(err.to_string());
            Vec::new()
        }
    }
}

fn write_prompt_dump(path: &Path, text: &str) -> CpgRagResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, text)?;
    debug!("Prompt written to {}", path.display());
    Ok(())
}

fn generate(
    llm: &dyn LanguageModel,
    prompt: &str,
    max_output_tokens: usize,
    retry_once: bool,
) -> AnswerStatus {
    let attempts = if retry_once { 2 } else { 1 };
    let mut last_failure = String::new();

    for attempt in 1..=attempts {
        match llm.generate(prompt, max_output_tokens) {
            Ok(raw) => match clean_answer(&raw) {
                Some(text) => return AnswerStatus::Answered { text },
                None => last_failure = "model returned no usable text".to_string(),
            },
            Err(e) => last_failure = e.to_string(),
        }
        if attempt < attempts {
            warn!("Generation attempt {} failed, retrying: {}", attempt, last_failure);
        }
    }

    warn!("{}", CpgRagError::generation_failure(llm.model_id(), &last_failure));
    AnswerStatus::Failed {
        reason: last_failure,
    }
}

// ============================================================================
// run_ask
// ============================================================================

/// Run the ask pipeline for one question.
///
/// # Errors
///
/// - [`CpgRagError::InvalidArgument`] for an empty question or `top_k == 0`
/// - [`CpgRagError::PromptAssembly`] on formatting errors
/// - [`CpgRagError::Io`] if the prompt dump cannot be written
///
/// Backend failures are reported in [`AskReport::warnings`] and
/// [`AskReport::answer`], not as errors.
pub fn run_ask(
    options: &AskOptions,
    backends: &AskBackends<'_>,
    config: &GlobalConfig,
) -> CpgRagResult<AskReport> {
    let question = options.question.as_str();
    if question.trim().is_empty() {
        return Err(CpgRagError::InvalidArgument(
            "The question must not be empty".to_string(),
        ));
    }
    let top_k = options.top_k.unwrap_or(config.retrieval.top_k);
    if top_k == 0 {
        return Err(CpgRagError::InvalidArgument(
            "--top-k must be at least 1".to_string(),
        ));
    }

    let started = Instant::now();
    let mut timings = StageTimings::default();
    let mut warnings = Vec::new();

    // Retrieval
    let t = Instant::now();
    let pool = retrieve(
        question,
        &options.project,
        config.retrieval.fetch_size(top_k),
        config,
        backends,
        &mut warnings,
    );
    let pool_size = pool.len();
    timings.retrieval_ms = elapsed_ms(t);

    // Filter
    let t = Instant::now();
    let policy = FilterPolicy::from(&config.retrieval);
    let candidates = filter_candidates(pool, top_k, &policy);
    timings.filter_ms = elapsed_ms(t);
    if candidates.len() < top_k {
        debug!("Only {} of {} requested candidates qualified", candidates.len(), top_k);
    }

    // Graph neighbourhoods
    let t = Instant::now();
    let contexts: Vec<CandidateContext> = match backends.graph {
        Some(fetcher) => fetcher.fetch_all(candidates),
        None => candidates.into_iter().map(CandidateContext::without_graph).collect(),
    };
    for ctx in &contexts {
        if let NeighborhoodStatus::Failed { reason } = &ctx.lookup {
            warnings.push(format!(
                "graph lookup for `{}` skipped: {}",
                ctx.candidate.method_name, reason
            ));
        }
    }
    timings.graph_ms = elapsed_ms(t);

    // Prompt
    let t = Instant::now();
    let entries = entries_from_contexts(&contexts, backends.catalog);
    let limits = PromptLimits::from(&config.prompt);
    let prompt = assemble_prompt(question, &entries, &limits, options.dump_prompt.is_some())?;
    if let (Some(path), Some(inspection)) = (&options.dump_prompt, &prompt.inspection) {
        write_prompt_dump(path, inspection)?;
    }
    timings.prompt_ms = elapsed_ms(t);

    // Generation
    let t = Instant::now();
    let answer = if options.no_llm {
        AnswerStatus::Skipped {
            reason: "generation disabled (--no-llm)".to_string(),
        }
    } else if let Some(llm) = backends.llm {
        generate(
            llm,
            &prompt.text,
            config.llm.max_output_tokens,
            config.llm.retry_once,
        )
    } else {
        AnswerStatus::Failed {
            reason: "no language model available".to_string(),
        }
    };
    timings.generation_ms = elapsed_ms(t);
    timings.total_ms = elapsed_ms(started);

    info!(
        "Answered in {} ms ({} candidates, answer {})",
        timings.total_ms,
        contexts.len(),
        match &answer {
            AnswerStatus::Answered { .. } => "ok",
            AnswerStatus::Skipped { .. } => "skipped",
            AnswerStatus::Failed { .. } => "failed",
        }
    );

    Ok(AskReport {
        query_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        question: options.question.clone(),
        project: options.project.clone(),
        top_k,
        question_kind: prompt.kind,
        pool_size,
        candidates: contexts,
        graph_enabled: backends.graph.is_some(),
        prompt: prompt.text,
        prompt_path: options.dump_prompt.clone(),
        answer,
        llm_model: backends
            .llm
            .filter(|_| !options.no_llm)
            .map(|l| l.model_id().to_string()),
        warnings,
        timings,
    })
}
