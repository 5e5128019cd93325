//! CLI definition and command dispatch for cpgrag.
//!
//! This module defines the command-line interface using `clap` and provides
//! the `run()` function that dispatches commands to the engine.
//!
//! ## Configuration Precedence
//!
//! Configuration is resolved with the following precedence (highest to lowest):
//! 1. CLI flags (e.g., `--top-k`, `--llm-model`, `--cpg-path`)
//! 2. Environment variables (`CPGRAG_OLLAMA_URL`, `CPGRAG_LLM_MODEL`, `CPGRAG_TOP_K`, ...)
//! 3. Config file (`~/.cpgrag/config.yaml` or path from `--config`/`CPGRAG_CONFIG`)
//! 4. Built-in defaults

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::ui::{color, format, table, ColorMode, MessageType, Progress, ProgressMode, Style};

use cpgrag_core::{AnswerStatus, AskOptions, AskReport, CpgRagEngine, CpgRagError, CandidateContext};

// ============================================================================
// CLI Definition
// ============================================================================

/// Version string including git commit hash
const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

/// Callers/callees listed per candidate in the graph context fallback.
const FALLBACK_NEIGHBORS: usize = 8;

/// Files listed per category by `cpgrag overview`.
const OVERVIEW_FILES_PER_CATEGORY: usize = 5;

/// cpgrag – answer questions about a code base from its code property graph
#[derive(Parser, Debug)]
#[command(name = "cpgrag")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging, stage timings)
    #[arg(short, long, global = true, env = "CPGRAG_VERBOSE")]
    pub verbose: bool,

    /// Suppress progress and informational messages
    #[arg(short, long, global = true, env = "CPGRAG_QUIET")]
    pub quiet: bool,

    /// Path to configuration file (default: ~/.cpgrag/config.yaml)
    #[arg(long, global = true, env = "CPGRAG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Color output mode: always, never, or auto (default: auto)
    #[arg(long, global = true, env = "CPGRAG_COLOR", default_value = "auto")]
    pub color: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Answer a question using retrieved methods and their call graph
    #[command(after_help = r#"EXAMPLES:
    # Ask with callers/callees from a Joern CPG
    cpgrag ask "Who calls validate_input?" --project medsam --cpg-path ./data/cpg/medsam.bin

    # Use the method export instead of running Joern
    cpgrag ask "What does train_epoch call?" -p medsam --graph-export ./data/medsam_methods.json

    # Inspect the prompt without calling the model
    cpgrag ask "Where is the dataset loaded?" -p medsam --no-llm --dump-prompt prompt.txt

    # Full report as JSON
    cpgrag ask "Who calls main?" -p medsam --json | jq '.answer'
"#)]
    Ask {
        /// The question to answer
        question: String,

        /// Project whose index is searched (collection `methods_<project>`)
        #[arg(short, long, env = "CPGRAG_PROJECT")]
        project: String,

        /// Joern CPG file for neighbourhood lookups
        #[arg(long, value_name = "FILE", conflicts_with = "graph_export")]
        cpg_path: Option<PathBuf>,

        /// Method export JSON for neighbourhood lookups (no Joern needed)
        #[arg(long, value_name = "FILE")]
        graph_export: Option<PathBuf>,

        /// Method export JSON used to show original source code in the prompt
        #[arg(long, value_name = "FILE")]
        methods_json: Option<PathBuf>,

        /// Number of methods in the prompt (default: retrieval.topK)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Write the exact prompt text to this file
        #[arg(long, value_name = "FILE")]
        dump_prompt: Option<PathBuf>,

        /// Stop after prompt assembly
        #[arg(long)]
        no_llm: bool,

        /// Language model to use (default: llm.model)
        #[arg(long)]
        llm_model: Option<String>,

        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Embed and store the methods of a Joern method export
    #[command(after_help = r#"EXAMPLES:
    # Index a project
    cpgrag index ./data/medsam_methods.json --project medsam

    # Smaller embedding batches for a slow server
    cpgrag index ./data/medsam_methods.json -p medsam --batch-size 8
"#)]
    Index {
        /// Method export JSON (`{"methods": [...]}`)
        methods_json: PathBuf,

        /// Project name (collection `methods_<project>`)
        #[arg(short, long, env = "CPGRAG_PROJECT")]
        project: String,

        /// Texts per embedding request (default: embedding.batchSize)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Summarize a method export: files, entry points and patterns
    #[command(after_help = r#"EXAMPLES:
    # Overview of an exported project
    cpgrag overview ./data/medsam_methods.json

    # Use prompt.methodsJson or graph.exportPath from the config
    cpgrag overview --json | jq '.entryPoints'
"#)]
    Overview {
        /// Method export JSON (default: prompt.methodsJson, then graph.exportPath)
        methods_json: Option<PathBuf>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the resolved configuration or check backend reachability
    #[command(after_help = r#"EXAMPLES:
    # Show resolved configuration (file + environment)
    cpgrag config show

    # Check that Ollama, ChromaDB and Joern are reachable
    cpgrag config check
"#)]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Check every configured backend once
    Check {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration as YAML
    Show {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

// ============================================================================
// Run function
// ============================================================================

/// Run the CLI application.
///
/// Returns `ExitCode::FAILURE` when a command fails, including an ask whose
/// answer generation failed.
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // Warnings always, debug with --verbose, errors only with --quiet.
    // Logs go to stderr so `--json` output stays parseable.
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    let filter = format!(
        "cpgrag_core={lvl},cpgrag_db={lvl},cpgrag_model={lvl},cpgrag_cli={lvl}",
        lvl = log_level
    );

    tracing_subscriber::fmt()
        .with_env_filter(&filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let color_mode = cli.color.parse::<ColorMode>().unwrap_or_default();
    let style = Style::new(color_mode);

    // Priority: --config flag > CPGRAG_CONFIG env > ~/.cpgrag/config.yaml
    let engine = match &cli.config {
        Some(config_path) => CpgRagEngine::with_config(config_path),
        None => CpgRagEngine::with_defaults(),
    };

    let engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            let hint = if let Some(path) = &cli.config {
                format!("Check your config at {}", path.display())
            } else {
                "Check your global config at ~/.cpgrag/config.yaml".to_string()
            };
            eprintln!(
                "{}",
                style.error_with_context(
                    "Failed to initialize cpgrag engine",
                    Some(&e.to_string()),
                    Some(&hint),
                )
            );
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        "Engine ready: vector store '{}', embedding '{}', llm '{}'",
        engine.config().vector_store.backend,
        engine.config().embedding.model,
        engine.config().llm.model
    );

    let result = match cli.command {
        Command::Ask {
            question,
            project,
            cpg_path,
            graph_export,
            methods_json,
            top_k,
            dump_prompt,
            no_llm,
            llm_model,
            json,
        } => {
            let options = AskOptions {
                question,
                project,
                top_k,
                dump_prompt,
                no_llm,
                cpg_path,
                graph_export,
                methods_json,
                llm_model,
            };
            handle_ask(&style, &engine, options, json, cli.verbose, cli.quiet)
        }
        Command::Index {
            methods_json,
            project,
            batch_size,
            json,
        } => handle_index(&style, &engine, methods_json, project, batch_size, json, cli.quiet),
        Command::Overview { methods_json, json } => {
            handle_overview(&style, &engine, methods_json, json, cli.quiet)
        }
        Command::Config { action } => handle_config(&style, &engine, action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style.error_with_context(&e.to_string(), None, error_hint(&e)));
            ExitCode::FAILURE
        }
    }
}

/// Actionable next step for errors that have an obvious one.
fn error_hint(err: &CpgRagError) -> Option<&'static str> {
    match err {
        CpgRagError::MethodExport { .. } => {
            Some("Export methods from the CPG first (see scripts/joern) and pass the JSON file")
        }
        CpgRagError::Db(db) if db.is_unavailable() => {
            Some("Check vectorStore in ~/.cpgrag/config.yaml or set CPGRAG_CHROMA_URL")
        }
        CpgRagError::Model(model) if model.is_transient() => {
            Some("Check that the model server is running, or set CPGRAG_OLLAMA_URL")
        }
        CpgRagError::GenerationFailure { .. } => {
            Some("Retry, pick another model with --llm-model, or use --no-llm to inspect the prompt")
        }
        _ => None,
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn handle_ask(
    style: &Style,
    engine: &CpgRagEngine,
    options: AskOptions,
    json: bool,
    verbose: bool,
    quiet: bool,
) -> Result<(), CpgRagError> {
    let mode = ProgressMode::detect(quiet, json);
    let progress = Progress::spinner("Retrieving methods and call graph context...", mode);
    let report = engine.ask(&options);
    progress.finish_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_ask_report(style, &report, verbose, quiet);
    }

    if let AnswerStatus::Failed { reason } = &report.answer {
        let model = report
            .llm_model
            .clone()
            .or(options.llm_model)
            .unwrap_or_else(|| engine.config().llm.model.clone());
        return Err(CpgRagError::generation_failure(model, reason.as_str()));
    }
    Ok(())
}

fn print_ask_report(style: &Style, report: &AskReport, verbose: bool, quiet: bool) {
    if !quiet {
        println!("{}", style.section("QUESTION"));
        println!();
        println!("  {}", style.key_value("Question", &report.question));
        println!("  {}", style.key_value("Project", &report.project));
        println!("  {}", style.key_value("Kind", &report.question_kind.to_string()));
        println!();

        for warning in &report.warnings {
            println!("{}", style.message(MessageType::Warn, warning));
        }
        if !report.warnings.is_empty() {
            println!();
        }

        println!("{}", style.section("CANDIDATES"));
        println!();
        if report.candidates.is_empty() {
            println!(
                "{}",
                style.message(MessageType::Info, "No relevant methods were retrieved.")
            );
            println!(
                "{}",
                style.message(
                    MessageType::Hint,
                    &format!(
                        "Index the project first: cpgrag index <methods.json> --project {}",
                        report.project
                    )
                )
            );
        } else {
            println!(
                "{}",
                style.message(
                    MessageType::Ok,
                    &format!(
                        "{} of {} requested methods ({} hits before filtering)",
                        report.candidates.len(),
                        report.top_k,
                        report.pool_size
                    )
                )
            );
            println!();
            println!("{}", table::render_candidates_table(&report.candidates));
            if report.candidates.iter().any(|c| c.candidate.backfilled) {
                println!("{}", style.dim("* module-level entry admitted to fill the list"));
            }
            let quoted = report
                .candidates
                .iter()
                .filter(|c| c.candidate.exact_match)
                .count();
            if quoted > 0 {
                println!("{}", style.dim(&format!("{quoted} found by the name quoted in the question")));
            }
        }
        println!();

        if let Some(path) = &report.prompt_path {
            println!(
                "{}",
                style.message(
                    MessageType::Ok,
                    &format!("Prompt written to {}", style.file_path(&path.display().to_string()))
                )
            );
            println!();
        }
    }

    match &report.answer {
        AnswerStatus::Answered { text } => {
            if !quiet {
                println!("{}", style.section("ANSWER"));
                println!("{}", style.dim(&"─".repeat(color::terminal_width().min(72))));
            }
            println!("{}", text);
        }
        AnswerStatus::Skipped { reason } => {
            if !quiet {
                println!("{}", style.message(MessageType::Skip, &format!("Answer skipped: {}", reason)));
                println!();
                print_graph_context(style, &report.candidates);
            }
        }
        AnswerStatus::Failed { .. } => {
            // The error itself is reported on stderr by `run`
            print_graph_context(style, &report.candidates);
        }
    }

    if verbose {
        println!();
        println!("{}", style.section("TIMINGS"));
        println!();
        println!("{}", table::render_timings_table(&report.timings));
        println!(
            "{}",
            style.dim(&format!(
                "query {} at {}",
                report.query_id,
                format::format_timestamp(report.generated_at)
            ))
        );
    }
}

/// What the model would have been told, for runs without an answer.
fn print_graph_context(style: &Style, candidates: &[CandidateContext]) {
    if candidates.is_empty() {
        return;
    }
    println!("{}", style.section("GRAPH CONTEXT"));
    println!();
    for (i, ctx) in candidates.iter().enumerate() {
        let c = &ctx.candidate;
        println!(
            "  {}. {} ({}:{})  distance {}",
            i + 1,
            style.method(&c.method_name),
            style.file_path(&c.file_path),
            c.line_display(),
            style.distance(c.distance)
        );
        match &ctx.neighborhood {
            Some(n) => {
                println!(
                    "     Called by ({}): {}",
                    n.callers.len(),
                    none_if_empty(&format::join_capped(&n.callers, FALLBACK_NEIGHBORS))
                );
                println!(
                    "     Calls ({}): {}",
                    n.callees.len(),
                    none_if_empty(&format::join_capped(&n.callees, FALLBACK_NEIGHBORS))
                );
            }
            None => {
                println!("     Graph: {}", style.lookup(&ctx.lookup));
            }
        }
        let preview = format::truncate_str(&format::one_line(&c.document), 100);
        if !preview.is_empty() {
            println!("     {}", style.dim(&preview));
        }
    }
    println!();
}

fn none_if_empty(s: &str) -> &str {
    if s.is_empty() {
        "none found"
    } else {
        s
    }
}

fn handle_index(
    style: &Style,
    engine: &CpgRagEngine,
    methods_json: PathBuf,
    project: String,
    batch_size: Option<usize>,
    json: bool,
    quiet: bool,
) -> Result<(), CpgRagError> {
    let mode = ProgressMode::detect(quiet, json);
    let progress = Progress::spinner(
        &format!("Indexing {} into project '{}'...", methods_json.display(), project),
        mode,
    );
    let report = engine.index(&methods_json, &project, batch_size);
    progress.finish_clear();
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}",
        style.message(
            MessageType::Ok,
            &format!(
                "Indexed {} methods into '{}' in {}",
                report.indexed,
                report.collection,
                format::format_millis(report.duration_ms)
            )
        )
    );
    if !quiet {
        if report.skipped > 0 {
            println!("{}", style.message_detail("Skipped (no name)", &report.skipped.to_string()));
        }
        println!("{}", style.message_detail("Batches", &report.batches.to_string()));
        println!("{}", style.message_detail("Embedding model", &report.embedding_model));
        println!("{}", style.message_detail("Vector store", &report.vector_store));
    }
    Ok(())
}

fn handle_overview(
    style: &Style,
    engine: &CpgRagEngine,
    methods_json: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<(), CpgRagError> {
    let overview = engine.overview(methods_json.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&overview)?);
        return Ok(());
    }

    println!("{}", style.section("OVERVIEW"));
    println!();
    println!("  {}", style.key_value("Files", &overview.total_files.to_string()));
    println!("  {}", style.key_value("Methods", &overview.total_methods.to_string()));
    println!("  {}", style.key_value("Entry points", &overview.entry_points.len().to_string()));
    println!();

    if overview.total_methods == 0 {
        println!("{}", style.message(MessageType::Info, "The export contains no source methods."));
        return Ok(());
    }

    println!("{}", style.section("MAIN MODULES"));
    println!();
    println!("{}", table::render_modules_table(&overview.modules));
    println!();

    println!("{}", style.section("ENTRY POINTS"));
    println!();
    if overview.entry_points.is_empty() {
        println!("{}", style.message(MessageType::Info, "No entry points found."));
    }
    for entry in &overview.entry_points {
        let line = entry.line_number.map(|n| format!(":{n}")).unwrap_or_default();
        let detail = if entry.callers > 0 {
            format!("{}, {} callers", entry.kind, entry.callers)
        } else {
            entry.kind.to_string()
        };
        println!(
            "  {} ({}{})  {}",
            style.method(&entry.method_name),
            style.file_path(&entry.file_path),
            line,
            style.dim(&detail)
        );
    }
    println!();

    if quiet {
        return Ok(());
    }

    println!("{}", style.section("FILE ORGANIZATION"));
    println!();
    for (category, files) in &overview.files_by_category {
        println!(
            "  {}",
            style.key_value(&category.to_string(), &format::join_capped(files, OVERVIEW_FILES_PER_CATEGORY))
        );
    }
    if !overview.patterns.is_empty() {
        println!();
        println!("  {}", style.key_value("Patterns", &overview.patterns.join(", ")));
    }
    Ok(())
}

// ============================================================================
// Config command handlers
// ============================================================================

fn handle_config(style: &Style, engine: &CpgRagEngine, action: ConfigAction) -> Result<(), CpgRagError> {
    match action {
        ConfigAction::Check { json } => handle_config_check(style, engine, json),
        ConfigAction::Show { json } => handle_config_show(engine, json),
    }
}

/// Check backends; fails when any configured backend is unreachable.
fn handle_config_check(style: &Style, engine: &CpgRagEngine, json: bool) -> Result<(), CpgRagError> {
    let warnings = engine.config().validate()?;
    let checks = engine.check_backends();
    let failed = checks.iter().filter(|c| !c.ok).count();

    if json {
        let output = serde_json::json!({
            "checks": checks,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", table::render_checks_table(&checks));
        println!();

        for warning in &warnings {
            println!("{}", style.message(MessageType::Warn, warning));
        }

        if failed == 0 {
            println!("{}", style.message(MessageType::Ok, "All configured backends are reachable"));
        }
    }

    if failed > 0 {
        return Err(CpgRagError::InvalidConfiguration {
            message: format!("{} backend(s) unreachable", failed),
            hint: "Start the missing services or adjust ~/.cpgrag/config.yaml".to_string(),
        });
    }
    Ok(())
}

/// Print the resolved configuration (file plus environment overrides).
fn handle_config_show(engine: &CpgRagEngine, json: bool) -> Result<(), CpgRagError> {
    if json {
        println!("{}", serde_json::to_string_pretty(engine.config())?);
    } else {
        print!("{}", engine.config().to_yaml()?);
    }
    Ok(())
}
