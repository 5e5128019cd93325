//! # cpgrag-core
//!
//! **Graph-augmented code question answering** – core engine library.
//!
//! Given a natural-language question about a code base, cpgrag retrieves the
//! most relevant methods by embedding similarity, enriches each one with its
//! callers and callees from a code property graph, and assembles a grounded
//! prompt for a language model.
//!
//! ## Main Types
//!
//! - [`CpgRagEngine`] – builds backends from configuration and runs queries
//! - [`AskReport`] – everything one question produced
//! - [`CpgRagError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`literal`] – quoted method names looked up by name
//! - [`filter`] – drops placeholder methods, backfills module-like entries
//! - [`neighborhood`] – parallel, cached graph lookups
//! - [`prompt`] – prompt document assembly
//! - [`answer`] – cleanup of raw model output
//! - [`index`] – method text serialization and indexing
//! - [`ask`] – the end-to-end query pipeline
//! - [`overview`] – files, entry points and patterns of a method export
//! - [`config`] – `~/.cpgrag/config.yaml`
//!
//! ## Example
//!
//! ```ignore
//! use cpgrag_core::{AskOptions, CpgRagEngine};
//!
//! let engine = CpgRagEngine::with_defaults()?;
//! let options = AskOptions::new("Who calls validate_input?", "medsam").with_top_k(5);
//! let report = engine.ask(&options)?;
//! for ctx in &report.candidates {
//!     println!("{} ({})", ctx.candidate.method_name, ctx.candidate.file_path);
//! }
//! ```

// Modules
pub mod answer;
pub mod ask;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod index;
pub mod literal;
pub mod neighborhood;
pub mod overview;
pub mod prompt;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use answer::clean_answer;
pub use ask::{run_ask, AnswerStatus, AskBackends, AskOptions, AskReport, StageTimings};
pub use catalog::MethodCatalog;
pub use config::{GlobalConfig, PromptConfig, RetrievalConfig};
pub use engine::{BackendCheck, CpgRagEngine};
pub use errors::{CpgRagError, CpgRagResult};
pub use filter::{filter_candidates, FilterPolicy};
pub use index::{method_document, run_index, IndexReport};
pub use neighborhood::{NeighborhoodCache, NeighborhoodFetcher};
pub use overview::{build_overview, CodebaseOverview, EntryPoint, EntryPointKind, FileCategory, ModuleSummary};
pub use prompt::{assemble_prompt, AssembledPrompt, PromptLimits, QuestionKind, TRUNCATION_MARKER};
pub use types::{Candidate, CandidateContext, NeighborhoodStatus};

// Infrastructure types callers need alongside the engine
pub use cpgrag_db::GraphNeighborhood;
