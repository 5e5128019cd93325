//! Graph backend configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default Joern launcher on `PATH`.
pub const DEFAULT_JOERN_BIN: &str = "joern";

/// Default location of the neighbourhood query script.
pub const DEFAULT_SCRIPT_PATH: &str = "scripts/joern/graph_neighborhood.sc";

/// Default time budget of one lookup. Joern loads the CPG on every call.
pub const DEFAULT_GRAPH_TIMEOUT_SECS: u64 = 60;

/// Default number of concurrent lookups.
pub const DEFAULT_GRAPH_WORKERS: usize = 4;

/// Which graph backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphBackendKind {
    /// Joern when `cpgPath` is set, else the export when `exportPath` is set,
    /// else none.
    #[default]
    Auto,
    /// Run Joern queries against a CPG file.
    Joern,
    /// Derive neighbourhoods from a method export JSON.
    Export,
    /// Never look up neighbourhoods.
    None,
}

impl std::fmt::Display for GraphBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Joern => write!(f, "joern"),
            Self::Export => write!(f, "export"),
            Self::None => write!(f, "none"),
        }
    }
}

impl std::str::FromStr for GraphBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "joern" | "cpg" => Ok(Self::Joern),
            "export" | "json" => Ok(Self::Export),
            "none" | "off" => Ok(Self::None),
            _ => Err(format!(
                "Unknown graph backend: '{}'. Use 'auto', 'joern', 'export', or 'none'.",
                s
            )),
        }
    }
}

/// Configuration of the graph stage.
///
/// # Example (YAML)
///
/// ```yaml
/// graph:
///   backend: joern
///   cpgPath: ./data/cpg/medsam.bin
///   timeoutSecs: 60
///   workers: 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBackendConfig {
    #[serde(default)]
    pub backend: GraphBackendKind,

    #[serde(default = "default_joern_bin")]
    pub joern_bin: String,

    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,

    /// CPG produced by `joern-parse`.
    #[serde(default)]
    pub cpg_path: Option<PathBuf>,

    /// Method export produced by the extraction pass.
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    /// Time budget of one lookup in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of lookups run at once.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Keep neighbourhoods for the lifetime of the process.
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_joern_bin() -> String {
    DEFAULT_JOERN_BIN.to_string()
}
fn default_script_path() -> PathBuf {
    PathBuf::from(DEFAULT_SCRIPT_PATH)
}
fn default_timeout_secs() -> u64 {
    DEFAULT_GRAPH_TIMEOUT_SECS
}
fn default_workers() -> usize {
    DEFAULT_GRAPH_WORKERS
}
fn default_cache() -> bool {
    true
}

impl Default for GraphBackendConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackendKind::default(),
            joern_bin: default_joern_bin(),
            script_path: default_script_path(),
            cpg_path: None,
            export_path: None,
            timeout_secs: default_timeout_secs(),
            workers: default_workers(),
            cache: default_cache(),
        }
    }
}

impl GraphBackendConfig {
    /// The backend that `Auto` resolves to for this configuration.
    pub fn effective_kind(&self) -> GraphBackendKind {
        match self.backend {
            GraphBackendKind::Auto => {
                if self.cpg_path.is_some() {
                    GraphBackendKind::Joern
                } else if self.export_path.is_some() {
                    GraphBackendKind::Export
                } else {
                    GraphBackendKind::None
                }
            }
            kind => kind,
        }
    }
}
