//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `cpgrag ask` | `render_candidates_table()` |
//! | `cpgrag ask --verbose` | `render_timings_table()` |
//! | `cpgrag config check` | `render_checks_table()` |
//! | `cpgrag overview` | `render_modules_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, ColumnConstraint, Table, Width};

use cpgrag_core::{BackendCheck, CandidateContext, ModuleSummary, StageTimings};

use super::format::{format_distance, format_millis, truncate_path, truncate_str};

fn plain_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table
}

/// Ranked candidates with their graph lookup outcome.
///
/// # Example Output
///
/// ```text
/// #  METHOD           FILE              LINE  DIST   GRAPH
/// 1  validate_input   src/app.py          10  0.182  found
/// 2  <module>*        src/cli.py           -  0.611  not found
/// ```
///
/// Backfilled module-like entries are marked with `*`.
pub fn render_candidates_table(candidates: &[CandidateContext]) -> String {
    if candidates.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("#").set_alignment(CellAlignment::Right),
        Cell::new("METHOD"),
        Cell::new("FILE"),
        Cell::new("LINE").set_alignment(CellAlignment::Right),
        Cell::new("DIST").set_alignment(CellAlignment::Right),
        Cell::new("GRAPH"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(2)),  // #
        ColumnConstraint::LowerBoundary(Width::Fixed(16)), // METHOD
        ColumnConstraint::LowerBoundary(Width::Fixed(16)), // FILE
        ColumnConstraint::LowerBoundary(Width::Fixed(4)),  // LINE
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // DIST
        ColumnConstraint::LowerBoundary(Width::Fixed(9)),  // GRAPH
    ]);

    for (i, ctx) in candidates.iter().enumerate() {
        let c = &ctx.candidate;
        let mut name = truncate_str(&c.method_name, 32);
        if c.backfilled {
            name.push('*');
        }
        let line = c
            .line_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(name),
            Cell::new(truncate_path(&c.file_path, 40)),
            Cell::new(line).set_alignment(CellAlignment::Right),
            Cell::new(format_distance(c.distance)).set_alignment(CellAlignment::Right),
            Cell::new(ctx.lookup.label()),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Backend reachability for `cpgrag config check`.
///
/// # Example Output
///
/// ```text
/// COMPONENT    BACKEND            STATUS  DETAIL
/// vectorStore  chroma             ok
/// embedding    nomic-embed-text   error   Ollama unreachable at ...
/// ```
pub fn render_checks_table(checks: &[BackendCheck]) -> String {
    if checks.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("COMPONENT"),
        Cell::new("BACKEND"),
        Cell::new("STATUS"),
        Cell::new("DETAIL"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(11)), // COMPONENT
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // BACKEND
        ColumnConstraint::LowerBoundary(Width::Fixed(6)),  // STATUS
    ]);

    for check in checks {
        table.add_row(vec![
            Cell::new(&check.component),
            Cell::new(truncate_str(&check.backend, 24)),
            Cell::new(if check.ok { "ok" } else { "error" }),
            Cell::new(truncate_str(check.detail.as_deref().unwrap_or(""), 80)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Files with the most methods for `cpgrag overview`.
///
/// # Example Output
///
/// ```text
/// FILE                 METHODS  SAMPLE
/// src/models/net.py          3  build_model, __init__, forward
/// src/train.py               1  train
/// ```
pub fn render_modules_table(modules: &[ModuleSummary]) -> String {
    if modules.is_empty() {
        return String::new();
    }

    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("FILE"),
        Cell::new("METHODS").set_alignment(CellAlignment::Right),
        Cell::new("SAMPLE"),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(16)), // FILE
        ColumnConstraint::LowerBoundary(Width::Fixed(7)),  // METHODS
    ]);

    for module in modules {
        table.add_row(vec![
            Cell::new(truncate_path(&module.file_path, 48)),
            Cell::new(module.method_count).set_alignment(CellAlignment::Right),
            Cell::new(truncate_str(&module.sample_methods.join(", "), 60)),
        ]);
    }

    table.trim_fmt().to_string()
}

/// Per-stage timings of one ask run.
pub fn render_timings_table(timings: &StageTimings) -> String {
    let mut table = plain_table();
    table.set_header(vec![
        Cell::new("STAGE"),
        Cell::new("TIME").set_alignment(CellAlignment::Right),
    ]);

    table.set_constraints(vec![
        ColumnConstraint::LowerBoundary(Width::Fixed(12)), // STAGE
        ColumnConstraint::LowerBoundary(Width::Fixed(8)),  // TIME
    ]);

    let rows = [
        ("retrieval", timings.retrieval_ms),
        ("filter", timings.filter_ms),
        ("graph", timings.graph_ms),
        ("prompt", timings.prompt_ms),
        ("generation", timings.generation_ms),
        ("total", timings.total_ms),
    ];
    for (stage, ms) in rows {
        table.add_row(vec![
            Cell::new(stage),
            Cell::new(format_millis(ms)).set_alignment(CellAlignment::Right),
        ]);
    }

    table.trim_fmt().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpgrag_core::{Candidate, GraphNeighborhood, NeighborhoodStatus};

    fn sample_candidates() -> Vec<CandidateContext> {
        let mut module = Candidate::new("demo_0", "<module>", "src/cli.py", 0.611);
        module.backfilled = true;
        vec![
            CandidateContext {
                candidate: Candidate::new("demo_3", "validate_input", "src/app.py", 0.182).with_line(10),
                neighborhood: Some(GraphNeighborhood::new().with_callers(["main"])),
                lookup: NeighborhoodStatus::Found,
            },
            CandidateContext {
                candidate: module,
                neighborhood: Some(GraphNeighborhood::new()),
                lookup: NeighborhoodStatus::NotFound,
            },
        ]
    }

    #[test]
    fn test_candidates_table() {
        let output = render_candidates_table(&sample_candidates());
        assert!(output.contains("METHOD"));
        assert!(output.contains("GRAPH"));
        assert!(output.contains("validate_input"));
        assert!(output.contains("<module>*"));
        assert!(output.contains("0.182"));
        assert!(output.contains("not found"));
    }

    #[test]
    fn test_checks_table() {
        let checks = vec![
            BackendCheck {
                component: "vectorStore".to_string(),
                backend: "simple".to_string(),
                ok: true,
                detail: None,
            },
            BackendCheck {
                component: "llm".to_string(),
                backend: "qwen2.5-coder:7b".to_string(),
                ok: false,
                detail: Some("connection refused".to_string()),
            },
        ];
        let output = render_checks_table(&checks);
        assert!(output.contains("COMPONENT"));
        assert!(output.contains("vectorStore"));
        assert!(output.contains("error"));
        assert!(output.contains("connection refused"));
    }

    #[test]
    fn test_timings_table() {
        let timings = StageTimings {
            retrieval_ms: 120,
            total_ms: 2400,
            ..Default::default()
        };
        let output = render_timings_table(&timings);
        assert!(output.contains("retrieval"));
        assert!(output.contains("120ms"));
        assert!(output.contains("2.4s"));
    }

    #[test]
    fn test_modules_table() {
        let modules = vec![ModuleSummary {
            file_path: "src/models/net.py".to_string(),
            method_count: 3,
            sample_methods: vec!["build_model".to_string(), "forward".to_string()],
        }];
        let output = render_modules_table(&modules);
        assert!(output.contains("METHODS"));
        assert!(output.contains("src/models/net.py"));
        assert!(output.contains("build_model, forward"));
    }

    #[test]
    fn test_empty_tables() {
        assert_eq!(render_candidates_table(&[]), "");
        assert_eq!(render_checks_table(&[]), "");
        assert_eq!(render_modules_table(&[]), "");
    }
}
