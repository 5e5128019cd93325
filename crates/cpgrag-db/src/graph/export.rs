//! Graph backend over a Joern method export.
//!
//! Callees come straight from the export; callers are recovered by inverting
//! every method's callee list. The export carries no type information, so
//! `types` is always empty. Lookups are in-process and never time out.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::traits::{GraphBackend, GraphNeighborhood};
use crate::error::DbResult;
use crate::export::MethodExport;

/// Distinguishes exports that were never read from a file.
static IN_MEMORY_EXPORTS: AtomicU64 = AtomicU64::new(0);

/// Neighbourhoods derived from a [`MethodExport`].
#[derive(Debug, Clone)]
pub struct ExportGraphBackend {
    export: MethodExport,
    /// Callee name → display names of its callers, in export order.
    callers: HashMap<String, Vec<String>>,
    scope: String,
}

impl ExportGraphBackend {
    /// Load the export at `path`.
    pub fn open(path: &Path) -> DbResult<Self> {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut backend = Self::from_export(MethodExport::load(path)?);
        backend.scope = format!("export:{}", canonical.display());
        Ok(backend)
    }

    /// Index an export already in memory.
    pub fn from_export(export: MethodExport) -> Self {
        let mut callers: HashMap<String, Vec<String>> = HashMap::new();
        for method in &export.methods {
            if method.method_name.is_empty() {
                continue;
            }
            let caller = if method.full_name.is_empty() {
                method.method_name.clone()
            } else {
                method.full_name.clone()
            };
            for callee in &method.callees {
                let entry = callers.entry(callee.clone()).or_default();
                if !entry.contains(&caller) {
                    entry.push(caller.clone());
                }
            }
        }
        debug!(
            "Indexed call edges for {} methods ({} distinct callees)",
            export.len(),
            callers.len()
        );
        let scope = format!(
            "export:memory-{}",
            IN_MEMORY_EXPORTS.fetch_add(1, Ordering::Relaxed)
        );
        Self {
            export,
            callers,
            scope,
        }
    }
}

impl GraphBackend for ExportGraphBackend {
    fn neighborhood(
        &self,
        method_name: &str,
        file_path: Option<&str>,
    ) -> DbResult<Option<GraphNeighborhood>> {
        let Some(method) = self.export.find(method_name, file_path) else {
            return Ok(None);
        };

        Ok(Some(GraphNeighborhood {
            callers: self.callers.get(method_name).cloned().unwrap_or_default(),
            callees: method.callees.clone(),
            types: Vec::new(),
        }))
    }

    fn health_check(&self) -> DbResult<()> {
        Ok(())
    }

    fn cache_scope(&self) -> String {
        self.scope.clone()
    }

    fn backend_name(&self) -> &'static str {
        "export"
    }
}
