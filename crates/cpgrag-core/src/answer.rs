//! Cleanup of raw LLM output.
//!
//! Small local models leak chat-template tokens, echo the instruction block
//! and sometimes degenerate into repeated characters or words. What remains
//! after cleanup is either a usable answer or nothing.

use std::collections::HashSet;

use crate::prompt::TASK_RULES;

/// Chat/special tokens removed verbatim.
const SPECIAL_TOKENS: &[&str] = &[
    "<|endoftext|>",
    "</s>",
    "[/INST]",
    "<|assistant|>",
    "<|im_end|>",
];

/// Markers after which the real answer starts when the prompt tail leaks.
const ANSWER_MARKERS: &[&str] = &["Your answer:", "YOUR ANSWER:", "Answer:"];

/// Line openings that only ever come from echoed instructions.
const ECHO_PREFIXES: &[&str] = &[
    "rules:",
    "question:",
    "answer the question above",
    "to answer this question",
    "avoid speculation",
    "do not make assumptions",
    "don't guess or assume",
];

/// Longest run of one identical non-whitespace character that is kept.
const MAX_CHAR_RUN: usize = 3;

/// Longest run of one identical word that is kept.
const MAX_WORD_RUN: usize = 3;

/// Answers with fewer distinct characters are garbage.
const MIN_DISTINCT_CHARS: usize = 5;

/// Clean raw model output. Returns `None` when nothing usable is left.
pub fn clean_answer(raw: &str) -> Option<String> {
    let mut text = raw.to_string();
    for token in SPECIAL_TOKENS {
        text = text.replace(token, "");
    }

    let text = after_last_marker(&text);
    let text = drop_echo_lines(text);
    let text = remove_char_runs(&text);
    let text = limit_word_runs(&text);
    let text = text.trim();

    let distinct: HashSet<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if distinct.len() < MIN_DISTINCT_CHARS {
        return None;
    }
    Some(text.to_string())
}

fn after_last_marker(text: &str) -> &str {
    ANSWER_MARKERS
        .iter()
        .filter_map(|marker| text.rfind(marker).map(|idx| idx + marker.len()))
        .max()
        .map(|start| &text[start..])
        .unwrap_or(text)
}

fn is_echo_line(line: &str) -> bool {
    let lower = line.trim().trim_start_matches("- ").to_lowercase();
    if lower.is_empty() {
        return false;
    }
    ECHO_PREFIXES.iter().any(|p| lower.starts_with(p))
        || TASK_RULES.iter().any(|rule| lower == rule.to_lowercase())
}

fn drop_echo_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !is_echo_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove every run of more than [`MAX_CHAR_RUN`] identical non-whitespace characters.
fn remove_char_runs(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        if c.is_whitespace() || j - i <= MAX_CHAR_RUN {
            out.extend(&chars[i..j]);
        }
        i = j;
    }
    out
}

/// Keep at most [`MAX_WORD_RUN`] consecutive identical words per line.
fn limit_word_runs(text: &str) -> String {
    text.lines()
        .map(|line| {
            let indent = &line[..line.len() - line.trim_start().len()];
            let mut kept: Vec<&str> = Vec::new();
            let mut run = 0;
            for word in line.split_whitespace() {
                if kept.last() == Some(&word) {
                    run += 1;
                } else {
                    run = 1;
                }
                if run <= MAX_WORD_RUN {
                    kept.push(word);
                }
            }
            format!("{}{}", indent, kept.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_special_tokens() {
        let cleaned = clean_answer("validate_input is called by main.<|im_end|></s>").unwrap();
        assert_eq!(cleaned, "validate_input is called by main.");
    }

    #[test]
    fn test_keeps_text_after_leaked_marker() {
        let raw = "Rules:\n- Only use information\n\nAnswer: It is called by app.main in src/app.py.";
        assert_eq!(clean_answer(raw).unwrap(), "It is called by app.main in src/app.py.");
    }

    #[test]
    fn test_drops_echoed_rules() {
        let raw = format!("- {}\nThe loader lives in data/loader.py.", TASK_RULES[0]);
        assert_eq!(clean_answer(&raw).unwrap(), "The loader lives in data/loader.py.");
    }

    #[test]
    fn test_removes_char_runs() {
        assert_eq!(remove_char_runs("okay ssssss done"), "okay  done");
        assert_eq!(remove_char_runs("a  ==="), "a  ===");
        assert_eq!(remove_char_runs("x\n\n\n\n\ny"), "x\n\n\n\n\ny");
    }

    #[test]
    fn test_limits_word_runs() {
        assert_eq!(
            limit_word_runs("the the the the the end"),
            "the the the end"
        );
        assert_eq!(limit_word_runs("    indented  line"), "    indented line");
    }

    #[test]
    fn test_degenerate_output_is_none() {
        assert_eq!(clean_answer(""), None);
        assert_eq!(clean_answer("<|endoftext|>"), None);
        assert_eq!(clean_answer("ab ab ab"), None);
        assert_eq!(clean_answer("aaaaaaaaaaaa"), None);
    }

    #[test]
    fn test_multiline_answer_preserved() {
        let raw = "Callers:\n  - app.main (src/app.py)\n  - app.run (src/app.py)";
        assert_eq!(clean_answer(raw).unwrap(), raw);
    }
}
