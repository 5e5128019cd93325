//! Quoted-name lookup.
//!
//! A question that quotes a method name (`"load_data"`, `'load_data'` or
//! `` `load_data` ``) almost always means that method. Embedding search can
//! still rank it below look-alikes, so quoted names are looked up in the
//! method export and the matches join the candidate pool at distance zero,
//! ahead of every vector hit.

use std::sync::OnceLock;

use cpgrag_db::MethodRecord;
use regex::Regex;

use crate::catalog::MethodCatalog;
use crate::filter::is_placeholder_name;
use crate::index::method_document;
use crate::types::Candidate;

/// More matches than this and the name is not specific enough to help.
const MAX_LITERAL_MATCHES: usize = 20;

/// Shorter quoted names only match exactly.
const MIN_SUBSTRING_CHARS: usize = 3;

struct LiteralPatterns {
    quoted: Regex,
    identifier: Regex,
}

fn literal_patterns() -> &'static LiteralPatterns {
    static PATTERNS: OnceLock<LiteralPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LiteralPatterns {
        // A single quote only opens after a non-word character, so "what's" is not a quote
        quoted: Regex::new(r#"`([^`]+)`|"([^"]+)"|(?:^|[^\w])'([^']+)'"#).expect("Invalid regex"),
        identifier: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("Invalid regex"),
    })
}

/// Identifier-like names quoted in `question`, in order of appearance.
///
/// Quoted phrases that are not identifiers are ignored; a trailing `()` is
/// dropped.
pub fn quoted_names(question: &str) -> Vec<String> {
    let patterns = literal_patterns();
    let mut names: Vec<String> = Vec::new();

    for caps in patterns.quoted.captures_iter(question) {
        let Some(quoted) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let name = quoted.as_str().trim().trim_end_matches("()");
        if patterns.identifier.is_match(name) && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

enum NameMatch {
    Exact,
    Partial,
}

/// How `record` matches one quoted `name`. A dotted name (`Trainer.fit`)
/// matches on its last segment and must appear in the full name to be exact.
fn match_name(record: &MethodRecord, name: &str) -> Option<NameMatch> {
    let method = record.method_name.to_lowercase();
    let needle = name.to_lowercase();
    let short = needle.rsplit('.').next().unwrap_or(&needle);

    if method == short && (short.len() == needle.len() || record.full_name.to_lowercase().contains(&needle)) {
        return Some(NameMatch::Exact);
    }
    if short.chars().count() >= MIN_SUBSTRING_CHARS && method.contains(short) {
        return Some(NameMatch::Partial);
    }
    None
}

fn literal_candidate(record: &MethodRecord) -> Candidate {
    let mut candidate = Candidate::new(
        format!("literal:{}:{}", record.file_path, record.method_name),
        &record.method_name,
        &record.file_path,
        0.0,
    )
    .with_document(method_document(record));
    candidate.full_name = record.full_name.clone();
    candidate.line_number = record.line_number;
    candidate.exact_match = true;
    candidate
}

/// Methods of `catalog` named by `names`: exact matches first, then
/// methods whose name contains a quoted name, in export order.
pub fn literal_candidates(catalog: &MethodCatalog, names: &[String]) -> Vec<Candidate> {
    if names.is_empty() {
        return Vec::new();
    }

    let mut exact: Vec<&MethodRecord> = Vec::new();
    let mut partial: Vec<&MethodRecord> = Vec::new();

    for record in catalog.methods() {
        if record.method_name.trim().is_empty() || is_placeholder_name(&record.method_name) {
            continue;
        }
        let best = names
            .iter()
            .filter_map(|name| match_name(record, name))
            .min_by_key(|m| matches!(m, NameMatch::Partial));
        match best {
            Some(NameMatch::Exact) => exact.push(record),
            Some(NameMatch::Partial) => partial.push(record),
            None => {}
        }
    }

    exact
        .into_iter()
        .chain(partial)
        .take(MAX_LITERAL_MATCHES)
        .map(literal_candidate)
        .collect()
}

fn same_file(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || a == b || a.ends_with(b) || b.ends_with(a)
}

/// `literal` followed by the `hits` that are not already in it.
pub fn merge_literal(literal: Vec<Candidate>, hits: Vec<Candidate>) -> Vec<Candidate> {
    if literal.is_empty() {
        return hits;
    }
    let mut pool = literal;
    let fresh: Vec<Candidate> = hits
        .into_iter()
        .filter(|hit| {
            !pool
                .iter()
                .any(|l| l.method_name == hit.method_name && same_file(&l.file_path, &hit.file_path))
        })
        .collect();
    pool.extend(fresh);
    pool
}
