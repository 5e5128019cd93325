//! Graph backend trait and neighbourhood type.

use serde::{Deserialize, Serialize};

use crate::error::DbResult;

/// Callers, callees and referenced types of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNeighborhood {
    #[serde(default)]
    pub callers: Vec<String>,
    #[serde(default)]
    pub callees: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl GraphNeighborhood {
    /// Create an empty neighbourhood.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set callers.
    pub fn with_callers<I, S>(mut self, callers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callers = callers.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set callees.
    pub fn with_callees<I, S>(mut self, callees: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.callees = callees.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set referenced types.
    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty() && self.callees.is_empty() && self.types.is_empty()
    }
}

/// Abstraction over the code property graph.
///
/// A lookup is an out-of-process round trip for most implementations, so
/// callers should expect it to be slow and run several at once.
pub trait GraphBackend: Send + Sync {
    /// Look up a method by name, using `file_path` to disambiguate overloads
    /// across files.
    ///
    /// Returns `Ok(None)` when the graph has no such method.
    ///
    /// # Errors
    ///
    /// - [`DbError::GraphTimeout`](crate::DbError::GraphTimeout) when the lookup exceeds its budget
    /// - [`DbError::GraphQuery`](crate::DbError::GraphQuery) when the backend output is unusable
    /// - [`DbError::GraphUnavailable`](crate::DbError::GraphUnavailable) when the backend cannot run
    fn neighborhood(
        &self,
        method_name: &str,
        file_path: Option<&str>,
    ) -> DbResult<Option<GraphNeighborhood>>;

    /// Check that lookups can run at all.
    fn health_check(&self) -> DbResult<()>;

    /// Identity of the graph being queried, such as the CPG file.
    ///
    /// Two backends with the same scope must answer every lookup the same
    /// way; cached neighbourhoods are only shared within one scope.
    fn cache_scope(&self) -> String;

    /// Backend name for logs and status output.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighborhood_builders() {
        let n = GraphNeighborhood::new()
            .with_callers(["main"])
            .with_callees(vec!["len".to_string()])
            .with_types(["str"]);
        assert_eq!(n.callers, vec!["main"]);
        assert_eq!(n.callees, vec!["len"]);
        assert_eq!(n.types, vec!["str"]);
        assert!(!n.is_empty());
        assert!(GraphNeighborhood::new().is_empty());
    }
}
