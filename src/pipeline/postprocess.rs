//! Post-processing: deterministic cleanup of model-generated Markdown.
//!
//! Chat models asked for "just the Markdown" still wrap their answer in
//! ` ```markdown ... ``` ` fences now and then, answer with CRLF line endings,
//! or sprinkle zero-width characters copied from the source page. These
//! rules remove such artefacts without touching content: a bare ` ``` `
//! block is real code and stays, trailing spaces (hard line breaks) stay,
//! and nothing inside a fenced block is rewritten.
//!
//! Only successful responses are cleaned; passthrough content from a
//! degraded call is left byte-for-byte intact.
//!
//! ## Rule Order
//!
//! Line endings are normalised after fence stripping but before any
//! line-based rule, so the per-line rules see `\n` only.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest run of blank lines kept outside fenced code blocks.
const MAX_BLANK_LINES: usize = 2;

/// Apply all cleanup rules to a raw model response.
///
/// Rules (applied in order):
/// 1. Strip an outer ` ```markdown ` / ` ```md ` fence wrapping the whole answer
/// 2. Normalise line endings (CRLF → LF)
/// 3. Collapse 3+ consecutive blank lines down to 2, outside fenced blocks
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 5. Trim the whole result
pub fn clean_response(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

// Only a fence labelled as Markdown is a wrapper; an unlabelled one is code.
static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        // An inner fence means the outer pair is real code, not a wrapper.
        Some(caps) if !caps[1].contains("\n```") => caps[1].to_string(),
        _ => trimmed.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

fn is_fence_delimiter(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

fn collapse_blank_lines(input: &str) -> String {
    let mut kept = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in input.split('\n') {
        if is_fence_delimiter(line) {
            in_fence = !in_fence;
        }
        if !in_fence && line.trim().is_empty() {
            blank_run += 1;
            if blank_run > MAX_BLANK_LINES {
                continue;
            }
        } else {
            blank_run = 0;
        }
        kept.push(line);
    }

    kept.join("\n")
}

// ── Rule 4: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
