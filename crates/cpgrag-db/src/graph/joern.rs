//! Joern graph backend.
//!
//! Each lookup runs
//!
//! ```text
//! joern --script graph_neighborhood.sc --param cpgFile=<cpg> --param methodName=<name> [--param filePath=<file>]
//! ```
//!
//! and reads the JSON object the script prints. Joern surrounds it with its
//! own banner and log lines, so the object is taken from the first `{` to the
//! last `}` of stdout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, trace};

use super::config::GraphBackendConfig;
use super::traits::{GraphBackend, GraphNeighborhood};
use crate::error::{DbError, DbResult};

/// How much stderr to keep in error messages.
const STDERR_EXCERPT: usize = 500;

/// Poll interval while waiting for the Joern process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// The object printed by the query script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptOutput {
    #[serde(default)]
    found: bool,
    #[serde(default)]
    method_name: Option<String>,
    #[serde(default)]
    callers: Vec<String>,
    #[serde(default)]
    callees: Vec<String>,
    #[serde(default)]
    types: Vec<String>,
}

/// Runs neighbourhood queries through the Joern CLI.
#[derive(Debug, Clone)]
pub struct JoernGraphBackend {
    joern_bin: String,
    script_path: PathBuf,
    cpg_path: PathBuf,
    timeout: Duration,
}

impl JoernGraphBackend {
    /// Create a backend for `cpg_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::GraphUnavailable`] if the CPG or the script is missing.
    pub fn new(config: &GraphBackendConfig, cpg_path: &Path) -> DbResult<Self> {
        if !cpg_path.exists() {
            return Err(DbError::graph_unavailable(
                "joern",
                format!("CPG file '{}' not found", cpg_path.display()),
            ));
        }
        if !config.script_path.exists() {
            return Err(DbError::graph_unavailable(
                "joern",
                format!("query script '{}' not found", config.script_path.display()),
            ));
        }

        Ok(Self {
            joern_bin: config.joern_bin.clone(),
            script_path: config.script_path.clone(),
            cpg_path: cpg_path.to_path_buf(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }

    fn command(&self, method_name: &str, file_path: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.joern_bin);
        cmd.arg("--script")
            .arg(&self.script_path)
            .arg("--param")
            .arg(format!("cpgFile={}", self.cpg_path.display()))
            .arg("--param")
            .arg(format!("methodName={}", method_name));
        if let Some(path) = file_path.filter(|p| !p.is_empty()) {
            cmd.arg("--param").arg(format!("filePath={}", path));
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn(&self, mut cmd: Command) -> DbResult<Child> {
        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DbError::graph_unavailable(
                    "joern",
                    format!("'{}' not found on PATH", self.joern_bin),
                )
            } else {
                DbError::graph_unavailable("joern", e.to_string())
            }
        })
    }
}

impl GraphBackend for JoernGraphBackend {
    fn neighborhood(
        &self,
        method_name: &str,
        file_path: Option<&str>,
    ) -> DbResult<Option<GraphNeighborhood>> {
        trace!("Joern lookup for '{}' ({:?})", method_name, file_path);
        let child = self.spawn(self.command(method_name, file_path))?;
        let output = wait_with_output_timeout(child, self.timeout, method_name)?;

        if !output.status.success() {
            return Err(DbError::graph_query(
                method_name,
                format!(
                    "joern exited with {}: {}",
                    output.status,
                    excerpt(&String::from_utf8_lossy(&output.stderr))
                ),
            ));
        }

        parse_script_output(&String::from_utf8_lossy(&output.stdout), method_name)
    }

    fn health_check(&self) -> DbResult<()> {
        let mut cmd = Command::new(&self.joern_bin);
        cmd.arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = self.spawn(cmd)?;
        let output = wait_with_output_timeout(child, self.timeout, "--version")?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DbError::graph_unavailable(
                "joern",
                format!("`{} --version` exited with {}", self.joern_bin, output.status),
            ))
        }
    }

    fn cache_scope(&self) -> String {
        let cpg = self
            .cpg_path
            .canonicalize()
            .unwrap_or_else(|_| self.cpg_path.clone());
        format!("joern:{}", cpg.display())
    }

    fn backend_name(&self) -> &'static str {
        "joern"
    }
}

/// Extract the script's JSON object from Joern's stdout.
fn parse_script_output(stdout: &str, method_name: &str) -> DbResult<Option<GraphNeighborhood>> {
    let (Some(start), Some(end)) = (stdout.find('{'), stdout.rfind('}')) else {
        return Err(DbError::graph_query(method_name, "no JSON object in joern output"));
    };
    if end < start {
        return Err(DbError::graph_query(method_name, "no JSON object in joern output"));
    }

    let parsed: ScriptOutput = serde_json::from_str(&stdout[start..=end])
        .map_err(|e| DbError::graph_query(method_name, format!("invalid JSON: {}", e)))?;

    if !parsed.found {
        debug!("Method '{}' not found in CPG", method_name);
        return Ok(None);
    }
    if let Some(name) = parsed.method_name.as_deref() {
        if name != method_name {
            trace!("Joern resolved '{}' as '{}'", method_name, name);
        }
    }

    Ok(Some(GraphNeighborhood {
        callers: parsed.callers,
        callees: parsed.callees,
        types: parsed.types,
    }))
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Output pipes are drained on separate threads so a chatty process cannot
/// block on a full pipe while we wait for it to exit.
fn wait_with_output_timeout(mut child: Child, timeout: Duration, context: &str) -> DbResult<Output> {
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DbError::GraphTimeout {
                method: context.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_reader(handle: Option<thread::JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
