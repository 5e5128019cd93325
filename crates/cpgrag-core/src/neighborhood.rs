//! Graph-neighbourhood fetcher.
//!
//! Looks up callers, callees and types for each selected candidate. Lookups
//! are independent, so they run on a small rayon pool; results come back in
//! candidate order. A failed lookup only drops that candidate's graph
//! context.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use cpgrag_db::{GraphBackend, GraphNeighborhood};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, warn};

use crate::errors::{CpgRagError, CpgRagResult};
use crate::types::{Candidate, CandidateContext, NeighborhoodStatus};

/// Callee prefix of operator pseudo-methods.
const OPERATOR_PREFIX: &str = "<operator";

/// Drop operator pseudo-methods from a callee list.
pub fn filter_operator_callees(callees: &[String]) -> Vec<String> {
    callees
        .iter()
        .filter(|c| !c.starts_with(OPERATOR_PREFIX))
        .cloned()
        .collect()
}

// ============================================================================
// NeighborhoodCache
// ============================================================================

/// Graph scope, method name, file path.
type CacheKey = (String, String, Option<String>);

type Entries = HashMap<CacheKey, Option<GraphNeighborhood>>;

/// Process-wide cache of completed lookups.
///
/// Entries are keyed by the backend's [`GraphBackend::cache_scope`], so
/// fetchers over different CPGs or exports can share one cache. `None`
/// records that the backend has no entry for the method. Failures are never
/// stored.
#[derive(Debug, Default)]
pub struct NeighborhoodCache {
    entries: Mutex<Entries>,
}

impl NeighborhoodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the entries. A poisoned lock disables the cache for the call.
    fn entries(&self) -> Option<MutexGuard<'_, Entries>> {
        match self.entries.lock() {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!("Neighbourhood cache unavailable: {}", e);
                None
            }
        }
    }

    fn get(&self, key: &CacheKey) -> Option<Option<GraphNeighborhood>> {
        self.entries()?.get(key).cloned()
    }

    fn insert(&self, key: CacheKey, value: Option<GraphNeighborhood>) {
        if let Some(mut entries) = self.entries() {
            entries.insert(key, value);
        }
    }

    /// Number of cached lookups.
    pub fn len(&self) -> usize {
        self.entries().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached lookup.
    pub fn clear(&self) {
        if let Some(mut entries) = self.entries() {
            entries.clear();
        }
    }
}

// ============================================================================
// NeighborhoodFetcher
// ============================================================================

/// Runs graph lookups for a ranked candidate list.
pub struct NeighborhoodFetcher {
    backend: Arc<dyn GraphBackend>,
    scope: String,
    cache: Option<Arc<NeighborhoodCache>>,
    pool: ThreadPool,
}

impl NeighborhoodFetcher {
    /// Create a fetcher running at most `workers` lookups at once.
    ///
    /// # Errors
    ///
    /// Returns [`CpgRagError::InvalidConfiguration`] if the worker pool cannot be built.
    pub fn new(
        backend: Arc<dyn GraphBackend>,
        workers: usize,
        cache: Option<Arc<NeighborhoodCache>>,
    ) -> CpgRagResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("cpgrag-graph-{i}"))
            .build()
            .map_err(|e| CpgRagError::InvalidConfiguration {
                message: format!("cannot start {} graph workers: {}", workers, e),
                hint: "Lower graph.workers".to_string(),
            })?;

        Ok(Self {
            scope: backend.cache_scope(),
            backend,
            cache,
            pool,
        })
    }

    /// Name of the underlying backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Look up every candidate, preserving order.
    pub fn fetch_all(&self, candidates: Vec<Candidate>) -> Vec<CandidateContext> {
        debug!(
            "Fetching {} neighbourhoods via {}",
            candidates.len(),
            self.backend.backend_name()
        );
        self.pool.install(|| {
            candidates
                .into_par_iter()
                .map(|candidate| {
                    let (neighborhood, lookup) = self.fetch_one(&candidate);
                    CandidateContext {
                        candidate,
                        neighborhood,
                        lookup,
                    }
                })
                .collect()
        })
    }

    /// Look up a single candidate.
    ///
    /// Not found gives an empty neighbourhood; a backend error gives `None`.
    pub fn fetch_one(
        &self,
        candidate: &Candidate,
    ) -> (Option<GraphNeighborhood>, NeighborhoodStatus) {
        let file_path = candidate.lookup_path();
        let key: CacheKey = (
            self.scope.clone(),
            candidate.method_name.clone(),
            file_path.map(str::to_string),
        );

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!("Neighbourhood cache hit for {}", candidate.method_name);
            return Self::into_result(cached);
        }

        match self.backend.neighborhood(&candidate.method_name, file_path) {
            Ok(found) => {
                let found = found.map(|mut n| {
                    n.callees = filter_operator_callees(&n.callees);
                    n
                });
                if found.is_none() {
                    debug!(
                        "No graph entry for {} ({})",
                        candidate.method_name,
                        file_path.unwrap_or("any file")
                    );
                }
                if let Some(cache) = &self.cache {
                    cache.insert(key, found.clone());
                }
                Self::into_result(found)
            }
            Err(e) => {
                warn!(
                    "Graph lookup for {} failed, continuing without it: {}",
                    candidate.method_name, e
                );
                (
                    None,
                    NeighborhoodStatus::Failed {
                        reason: e.to_string(),
                    },
                )
            }
        }
    }

    fn into_result(found: Option<GraphNeighborhood>) -> (Option<GraphNeighborhood>, NeighborhoodStatus) {
        match found {
            Some(n) => (Some(n), NeighborhoodStatus::Found),
            None => (Some(GraphNeighborhood::new()), NeighborhoodStatus::NotFound),
        }
    }
}
