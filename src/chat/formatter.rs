//! Best-effort repair of code fences in assistant replies.
//!
//! Models regularly forget to fence NTSL snippets or leave a fence open. This
//! pass looks for Pascal-like program text and wraps it in a ```` ```ntsl ````
//! block. It only ever adds markers, and returns the text untouched when
//! nothing looks like code.

use std::sync::OnceLock;

use regex::Regex;

const FENCE: &str = "```";
const NTSL_TAG: &str = "ntsl";

/// Result of a formatting pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    pub repaired: bool,
}

fn fence_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*```").expect("valid regex"))
}

fn block_opener() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(input|var|const|begin)\b").expect("valid regex"))
}

fn bare_opener() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*(input|var|const|begin)\s*$").expect("valid regex"))
}

fn keyword_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*(if|then|else|begin|end|var|input|const|for|while|repeat|until|do|function|result|plot\d*|paintbar|buyatmarket|sellatmarket|sellshortatmarket|buytocoveratmarket|buylimit|selllimit|buystop|sellstop|closeposition|cancelpendingorders)\b",
        )
        .expect("valid regex")
    })
}

fn program_end() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*end\.\s*$").expect("valid regex"))
}

/// True for a line that reads like NTSL source.
pub fn is_code_like(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    keyword_line().is_match(trimmed)
        || trimmed.ends_with(';')
        || trimmed.contains(":=")
        || trimmed.starts_with("//")
}

/// At least one terminated statement, assignment, or program end.
fn has_statement(lines: &[&str]) -> bool {
    lines.iter().any(|l| {
        let t = l.trim();
        t.ends_with(';') || t.contains(":=") || program_end().is_match(t)
    })
}

fn looks_like_ntsl(lines: &[&str]) -> bool {
    let code_lines = lines.iter().filter(|l| is_code_like(l)).count();
    let has_marker = lines
        .iter()
        .any(|l| block_opener().is_match(l) || program_end().is_match(l) || l.contains(":="));
    code_lines >= 2 && has_marker
}

/// Repair code fences in `text`. Never fails; falls back to the raw text.
pub fn format_code_blocks(text: &str) -> Formatted {
    let lines: Vec<&str> = text.lines().collect();
    let has_fences = lines.iter().any(|l| fence_line().is_match(l));

    let repaired = if has_fences {
        repair_existing_fences(&lines)
    } else {
        wrap_bare_program(&lines)
    };

    match repaired {
        Some(mut out) => {
            if text.ends_with('\n') {
                out.push('\n');
            }
            Formatted {
                text: out,
                repaired: true,
            }
        }
        None => Formatted {
            text: text.to_string(),
            repaired: false,
        },
    }
}

/// Tag untagged fences around NTSL and close a dangling fence.
fn repair_existing_fences(lines: &[&str]) -> Option<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 1);
    let mut changed = false;
    let mut inside = false;

    for (i, line) in lines.iter().enumerate() {
        if !fence_line().is_match(line) {
            out.push(line.to_string());
            continue;
        }

        if inside {
            inside = false;
            out.push(line.to_string());
            continue;
        }

        inside = true;
        if line.trim() == FENCE {
            let body: Vec<&str> = lines[i + 1..]
                .iter()
                .take_while(|l| !fence_line().is_match(l))
                .copied()
                .collect();
            if looks_like_ntsl(&body) {
                let indent = &line[..line.len() - line.trim_start().len()];
                out.push(format!("{indent}{FENCE}{NTSL_TAG}"));
                changed = true;
                continue;
            }
        }
        out.push(line.to_string());
    }

    if inside {
        out.push(FENCE.to_string());
        changed = true;
    }

    changed.then(|| out.join("\n"))
}

/// A keyword alone on its line, or a statement that opens with one.
/// Sentences such as "Input values matter" do not count.
fn opens_program(line: &str) -> bool {
    let t = line.trim();
    block_opener().is_match(t) && (bare_opener().is_match(t) || t.ends_with(';') || t.contains(":="))
}

/// Last line of the program starting at `start`, if the block is real code.
fn block_end(lines: &[&str], start: usize) -> Option<usize> {
    let end = match lines[start..].iter().position(|l| program_end().is_match(l)) {
        Some(offset) => start + offset,
        None => {
            // Contiguous run of code and blank lines; stop at the first prose line
            let mut last_code = start;
            for (i, line) in lines.iter().enumerate().skip(start) {
                if is_code_like(line) {
                    last_code = i;
                } else if !line.trim().is_empty() {
                    break;
                }
            }
            last_code
        }
    };

    let block = &lines[start..=end];
    if block.iter().filter(|l| is_code_like(l)).count() < 2 || !has_statement(block) {
        return None;
    }
    Some(end)
}

/// Find an unfenced NTSL program and wrap it.
fn wrap_bare_program(lines: &[&str]) -> Option<String> {
    let (start, end) = (0..lines.len())
        .filter(|&i| opens_program(lines[i]))
        .find_map(|start| block_end(lines, start).map(|end| (start, end)))?;

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 2);
    out.extend(lines[..start].iter().map(|l| l.to_string()));
    out.push(format!("{FENCE}{NTSL_TAG}"));
    out.extend(lines[start..=end].iter().map(|l| l.to_string()));
    out.push(FENCE.to_string());
    out.extend(lines[end + 1..].iter().map(|l| l.to_string()));

    Some(out.join("\n"))
}
