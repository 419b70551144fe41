//! Post-processing: deterministic cleanup of a raw model response before it
//! reaches the structuring engine.
//!
//! Small local models often ignore "no code fences" in the prompt, answer with
//! Windows line endings, or leak zero-width characters from the source
//! document. These rules remove that noise without touching content, so a
//! fence marker never ends up promoted to a bullet.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so fence detection sees `\n` only; the
//! outer fence is stripped before stray fence lines so a wrapped response
//! keeps its body.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model response.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Strip an outer ```` ```markdown ```` fence wrapping the whole response
/// 4. Drop stray lines that consist only of a fence marker
pub fn sanitize_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = strip_markdown_fences(&s);
    remove_fence_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 4: Drop stray fence lines ───────────────────────────────────────────

static RE_FENCE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*```[A-Za-z0-9_-]*\s*$").unwrap());

fn remove_fence_lines(input: &str) -> String {
    input
        .split('\n')
        .filter(|line| !RE_FENCE_LINE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────
