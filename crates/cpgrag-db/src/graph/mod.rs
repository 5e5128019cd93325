//! Code property graph backends.
//!
//! - `joern`: one Joern script run per lookup against a CPG file
//! - `export`: in-memory neighbourhoods from a method export JSON
//!
//! [`open_graph_backend`] returns `Ok(None)` when no backend is configured;
//! the neighbourhood stage is then skipped entirely.

mod config;
mod export;
mod joern;
mod traits;

pub use config::{
    GraphBackendConfig, GraphBackendKind, DEFAULT_GRAPH_TIMEOUT_SECS, DEFAULT_GRAPH_WORKERS,
    DEFAULT_SCRIPT_PATH,
};
pub use export::ExportGraphBackend;
pub use joern::JoernGraphBackend;
pub use traits::{GraphBackend, GraphNeighborhood};

use std::sync::Arc;

use tracing::debug;

use crate::error::{DbError, DbResult};

/// Open the graph backend described by `config`.
///
/// # Errors
///
/// Returns [`DbError::GraphUnavailable`] if a backend is requested but its
/// inputs (CPG, script, export) are missing.
pub fn open_graph_backend(config: &GraphBackendConfig) -> DbResult<Option<Arc<dyn GraphBackend>>> {
    let kind = config.effective_kind();
    debug!("Opening graph backend '{}'", kind);

    match kind {
        GraphBackendKind::None | GraphBackendKind::Auto => Ok(None),
        GraphBackendKind::Joern => {
            let cpg = config.cpg_path.as_deref().ok_or_else(|| {
                DbError::graph_unavailable("joern", "no CPG path configured (graph.cpgPath)")
            })?;
            Ok(Some(Arc::new(JoernGraphBackend::new(config, cpg)?)))
        }
        GraphBackendKind::Export => {
            let path = config.export_path.as_deref().ok_or_else(|| {
                DbError::graph_unavailable("export", "no export path configured (graph.exportPath)")
            })?;
            if !path.exists() {
                return Err(DbError::graph_unavailable(
                    "export",
                    format!("method export '{}' not found", path.display()),
                ));
            }
            Ok(Some(Arc::new(ExportGraphBackend::open(path)?)))
        }
    }
}
