//! Candidate filter.
//!
//! Vector search over method documents happily returns module-level
//! placeholders (`<module>`), operator pseudo-methods, protocol helpers such
//! as `__iter__` and near-empty records, none of which carry useful code. The filter keeps the closest K real methods and only
//! backfills with module-like entries when real methods run short and the
//! entry is still close enough to the question.

use std::collections::HashSet;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::types::Candidate;

/// Exact placeholder names.
const MODULE_PLACEHOLDERS: &[&str] = &["<module>"];

/// Name prefixes of synthetic graph nodes.
const SYNTHETIC_PREFIXES: &[&str] = &["<operator", "<init", "<meta", "<fake"];

/// Tensor and container helpers Joern lists as ordinary methods.
const TRIVIAL_NAMES: &[&str] = &["item", "keys", "t", "__iter__", "__next__"];

/// Names this short are operators or lambdas in practice.
const MAX_TRIVIAL_NAME_CHARS: usize = 2;

/// Whether a method name denotes a module-level or synthetic entry.
pub fn is_placeholder_name(name: &str) -> bool {
    let name = name.trim();
    MODULE_PLACEHOLDERS.contains(&name) || SYNTHETIC_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Whether a method name is a helper too generic to answer anything.
pub fn is_trivial_name(name: &str) -> bool {
    let name = name.trim();
    TRIVIAL_NAMES.contains(&name) || name.chars().count() <= MAX_TRIVIAL_NAME_CHARS
}

// ============================================================================
// FilterPolicy
// ============================================================================

/// Backfill rules of the candidate filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPolicy {
    /// Absolute cutoff; backfilled entries never exceed it.
    pub max_backfill_distance: f32,
    /// Optional cutoff relative to the worst selected real method.
    pub relative_factor: Option<f32>,
    /// Count hits without a usable file path as module-like.
    pub unknown_path_is_module: bool,
    /// Count [trivial names](is_trivial_name) as module-like.
    pub trivial_names_are_module: bool,
    /// Count hits with a shorter indexed document as module-like.
    pub min_document_chars: usize,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

impl From<&RetrievalConfig> for FilterPolicy {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            max_backfill_distance: config.max_backfill_distance,
            relative_factor: config.backfill_relative_factor,
            unknown_path_is_module: config.unknown_path_is_module,
            trivial_names_are_module: config.trivial_names_are_module,
            min_document_chars: config.min_document_chars,
        }
    }
}

impl FilterPolicy {
    /// Whether `candidate` belongs to the module-like partition.
    pub fn is_module_like(&self, candidate: &Candidate) -> bool {
        is_placeholder_name(&candidate.method_name)
            || (self.trivial_names_are_module && is_trivial_name(&candidate.method_name))
            || candidate.document.trim().chars().count() < self.min_document_chars
            || (self.unknown_path_is_module && candidate.lookup_path().is_none())
    }

    /// Distance cutoff for backfill given the worst selected real distance.
    pub fn backfill_cutoff(&self, worst_real: Option<f32>) -> f32 {
        match (worst_real, self.relative_factor) {
            (Some(worst), Some(factor)) => self.max_backfill_distance.min(worst * factor),
            _ => self.max_backfill_distance,
        }
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Select at most `k` candidates from `pool`.
///
/// Real methods claim slots first, closest first. Module-like entries fill
/// the remaining slots only when within the backfill cutoff. The result is
/// sorted by ascending distance, with real methods ahead of backfilled ones
/// on equal distance. Never fails; a short pool gives a short result.
pub fn filter_candidates(pool: Vec<Candidate>, k: usize, policy: &FilterPolicy) -> Vec<Candidate> {
    if k == 0 || pool.is_empty() {
        return Vec::new();
    }

    let mut pool = pool;
    pool.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    let pool_size = pool.len();

    let (module_like, real): (Vec<Candidate>, Vec<Candidate>) =
        pool.into_iter().partition(|c| policy.is_module_like(c));

    let mut seen: HashSet<String> = HashSet::new();
    let mut selected: Vec<Candidate> = Vec::with_capacity(k);

    for candidate in real {
        if selected.len() == k {
            break;
        }
        if seen.insert(candidate.id.clone()) {
            selected.push(candidate);
        }
    }

    let real_count = selected.len();
    if real_count < k {
        let worst_real = selected.last().map(|c| c.distance);
        let cutoff = policy.backfill_cutoff(worst_real);

        for mut candidate in module_like {
            if selected.len() == k || candidate.distance > cutoff {
                break;
            }
            if seen.insert(candidate.id.clone()) {
                candidate.backfilled = true;
                selected.push(candidate);
            }
        }

        debug!(
            "Backfilled {} module-like entries (cutoff {:.3})",
            selected.len() - real_count,
            cutoff
        );
    }

    // Stable: backfilled entries were appended after real ones
    selected.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    debug!(
        "Filtered {} hits down to {} candidates ({} real)",
        pool_size,
        selected.len(),
        real_count
    );
    selected
}
