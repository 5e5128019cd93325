//! Prompt assembly.
//!
//! Turns the question, the ranked candidates and their graph neighbourhoods
//! into the single text document sent to the LLM. Assembly is a pure
//! function of its inputs: the same input always yields the same bytes.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::sync::OnceLock;

use cpgrag_db::GraphNeighborhood;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::{resolve_code, MethodCatalog};
use crate::config::PromptConfig;
use crate::errors::CpgRagResult;
use crate::neighborhood::filter_operator_callees;
use crate::types::CandidateContext;

/// Appended on its own line after clipped code.
pub const TRUNCATION_MARKER: &str = "... [code truncated]";

const RULE: &str =
    "================================================================================";

const INTRO: &str = "You are a code analysis assistant. Answer the question directly and clearly using the provided code and relationship information.";

/// Answer-format rules, one per line in the TASK section.
pub const TASK_RULES: &[&str] = &[
    "Only use information from the methods and relationships shown above",
    "Only mention files that appear in the \"File:\" lines above",
    "Write a direct answer without phrases like \"the provided code shows\" or \"based on the code above\"",
    "If information is missing, say so clearly",
    "The user does NOT see the code snippets or context - they only see your answer",
];

// ============================================================================
// Question kinds
// ============================================================================

/// What the question asks for; selects the answer-format guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Callers,
    Callees,
    Location,
    General,
}

struct KindPatterns {
    callers: Regex,
    callees: Regex,
    location: Regex,
}

fn kind_patterns() -> &'static KindPatterns {
    static PATTERNS: OnceLock<KindPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| KindPatterns {
        callers: Regex::new(
            r"(?i)\b(who|what)\s+(calls|invokes|uses)\b|\bcalled\s+by\b|\bcallers?\s+(of|for)\b|\bwhere\s+(is|are)\b.*\b(called|invoked|used)\b",
        )
        .expect("Invalid regex"),
        callees: Regex::new(
            r"(?i)\bwhat\s+(does|do)\b.*\b(call|invoke)\b|\bcallees?\s+(of|for)\b|\bwhich\s+(functions|methods)\s+does\b",
        )
        .expect("Invalid regex"),
        location: Regex::new(r"(?i)\bwhere\s+(is|are)\b|\bwhich\s+files?\b|\bin\s+which\s+file\b")
            .expect("Invalid regex"),
    })
}

impl QuestionKind {
    /// Classify a question. Callers wins over location for
    /// "where is X called".
    pub fn detect(question: &str) -> Self {
        let patterns = kind_patterns();
        if patterns.callers.is_match(question) {
            Self::Callers
        } else if patterns.callees.is_match(question) {
            Self::Callees
        } else if patterns.location.is_match(question) {
            Self::Location
        } else {
            Self::General
        }
    }

    /// Answer-shape rule for this kind. Without graph context the
    /// caller and callee rules point at the code instead of the
    /// relationship sections, which are not rendered.
    fn guidance(&self, with_graph: bool) -> &'static str {
        match self {
            Self::Callers if with_graph => "This question asks for callers: list the methods from the \"Called by\" sections first, with their files, then explain.",
            Self::Callers => "This question asks for callers: no call graph is available, so name only the methods whose code above calls it, with their files, and say that callers outside these methods are unknown.",
            Self::Callees if with_graph => "This question asks for callees: list the methods from the \"Calls\" sections first, then explain what they do.",
            Self::Callees => "This question asks for callees: no call graph is available, so read the calls from the method code above, then explain what they do.",
            Self::Location => "This question asks for a location: start with the file path from the \"File:\" lines, then the method name and line.",
            Self::General => "Start with a one-sentence answer, then give the supporting details.",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callers => write!(f, "callers"),
            Self::Callees => write!(f, "callees"),
            Self::Location => write!(f, "location"),
            Self::General => write!(f, "general"),
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

/// Size limits applied while assembling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_code_chars: usize,
    pub max_callers: usize,
    pub max_callees: usize,
}

impl From<&PromptConfig> for PromptLimits {
    fn from(config: &PromptConfig) -> Self {
        Self {
            max_code_chars: config.max_code_chars,
            max_callers: config.max_callers,
            max_callees: config.max_callees,
        }
    }
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self::from(&PromptConfig::default())
    }
}

/// One candidate as the prompt sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptEntry<'a> {
    pub name: &'a str,
    pub file_path: &'a str,
    pub line: String,
    pub code: &'a str,
    /// `None` when there is no graph context for this candidate.
    pub neighborhood: Option<&'a GraphNeighborhood>,
}

/// Build prompt entries from pipeline contexts, resolving code through the
/// catalog when one is loaded.
pub fn entries_from_contexts<'a>(
    contexts: &'a [CandidateContext],
    catalog: Option<&'a MethodCatalog>,
) -> Vec<PromptEntry<'a>> {
    contexts
        .iter()
        .map(|ctx| PromptEntry {
            name: &ctx.candidate.method_name,
            file_path: if ctx.candidate.file_path.is_empty() {
                "unknown"
            } else {
                &ctx.candidate.file_path
            },
            line: ctx.candidate.line_display(),
            code: resolve_code(&ctx.candidate, catalog),
            neighborhood: ctx.neighborhood.as_ref(),
        })
        .collect()
}

// ============================================================================
// Assembly
// ============================================================================

/// The assembled document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledPrompt {
    pub text: String,
    pub kind: QuestionKind,
    /// Copy of `text` for on-disk inspection, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection: Option<String>,
}

/// Clip `code` to `max_chars` characters, appending [`TRUNCATION_MARKER`].
pub fn truncate_code(code: &str, max_chars: usize) -> Cow<'_, str> {
    match code.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Cow::Owned(format!("{}\n{}", &code[..byte_idx], TRUNCATION_MARKER)),
        None => Cow::Borrowed(code),
    }
}

fn write_heading(out: &mut String, title: &str) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{title}")?;
    writeln!(out, "{RULE}")
}

fn write_list(out: &mut String, label: &str, items: &[String], cap: usize) -> std::fmt::Result {
    writeln!(out)?;
    if items.is_empty() {
        return writeln!(out, "{label}: none found");
    }
    writeln!(out, "{label} ({}):", items.len())?;
    for item in items.iter().take(cap) {
        writeln!(out, "  - {item}")?;
    }
    if items.len() > cap {
        writeln!(out, "  ... and {} more", items.len() - cap)?;
    }
    Ok(())
}

fn write_entry(out: &mut String, index: usize, entry: &PromptEntry<'_>, limits: &PromptLimits) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "--- Method {}: {} ---", index, entry.name)?;
    writeln!(out, "Method: {}", entry.name)?;
    writeln!(out, "File: {}", entry.file_path)?;
    writeln!(out, "Line: {}", entry.line)?;
    writeln!(out)?;
    writeln!(out, "Code:")?;
    writeln!(out, "{}", truncate_code(entry.code.trim_end(), limits.max_code_chars))?;

    if let Some(neighborhood) = entry.neighborhood {
        write_list(out, "Called by", &neighborhood.callers, limits.max_callers)?;
        let callees = filter_operator_callees(&neighborhood.callees);
        write_list(out, "Calls", &callees, limits.max_callees)?;
    }
    Ok(())
}

/// Assemble the prompt document.
///
/// # Errors
///
/// Only formatting errors, reported as [`crate::CpgRagError::PromptAssembly`].
pub fn assemble_prompt(
    question: &str,
    entries: &[PromptEntry<'_>],
    limits: &PromptLimits,
    inspect: bool,
) -> CpgRagResult<AssembledPrompt> {
    let kind = QuestionKind::detect(question);
    let mut out = String::new();

    writeln!(out, "{INTRO}")?;

    write_heading(&mut out, "RELEVANT CODE METHODS")?;
    if entries.is_empty() {
        writeln!(out, "(No relevant methods were found in the index.)")?;
    } else {
        writeln!(out, "(Methods are ordered by semantic relevance to the question)")?;
        for (i, entry) in entries.iter().enumerate() {
            write_entry(&mut out, i + 1, entry, limits)?;
        }
    }

    write_heading(&mut out, "QUESTION")?;
    writeln!(out, "{question}")?;

    write_heading(&mut out, "TASK")?;
    writeln!(out, "Answer the question above using the code methods and relationships provided.")?;
    writeln!(out)?;
    writeln!(out, "Rules:")?;
    for rule in TASK_RULES {
        writeln!(out, "- {rule}")?;
    }
    let with_graph = entries.iter().any(|e| e.neighborhood.is_some());
    writeln!(out, "- {}", kind.guidance(with_graph))?;
    writeln!(out)?;
    write!(out, "Answer:")?;

    let inspection = inspect.then(|| out.clone());
    Ok(AssembledPrompt {
        text: out,
        kind,
        inspection,
    })
}
