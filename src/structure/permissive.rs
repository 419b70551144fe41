//! Permissive post-processor.
//!
//! Trusts the model's own layout. Two passes only:
//!
//! 1. Drop a boilerplate lead-in line ("Here is your plan:", "Sure, …") when it
//!    is the first non-blank line.
//! 2. If no heading names a "next actions" equivalent, append the configured
//!    `## Next Steps` section with its placeholder bullets.

use super::lines::promote;
use crate::config::NoteSchema;
use regex::{Regex, RegexBuilder};

/// Clean `response` and make sure it closes with an action-items section.
///
/// Fails only when the configured synonyms cannot be compiled into a matcher.
pub fn polish(response: &str, schema: &NoteSchema) -> Result<String, regex::Error> {
    let cleaned = strip_lead_in(response, &schema.boilerplate_prefixes);
    let matcher = next_actions_matcher(&schema.next_actions_synonyms)?;

    if matcher.is_match(cleaned) {
        return Ok(cleaned.to_string());
    }
    Ok(append_next_steps(cleaned, schema))
}

/// Remove the first non-blank line if it opens with a boilerplate phrase,
/// along with the blank lines that follow it.
fn strip_lead_in<'a>(text: &'a str, prefixes: &[String]) -> &'a str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim();
        if content.is_empty() {
            offset += line.len();
            continue;
        }
        if !starts_with_phrase(content, prefixes) {
            return text;
        }
        let rest = &text[offset + line.len()..];
        return skip_blank_lines(rest);
    }
    text
}

fn skip_blank_lines(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        offset += line.len();
    }
    &text[offset..]
}

/// Case-insensitive phrase match that stops at a word boundary, so `sure`
/// matches "Sure, here…" but not "Surely…".
fn starts_with_phrase(line: &str, prefixes: &[String]) -> bool {
    let lower = line.to_lowercase();
    prefixes.iter().any(|p| {
        let p = p.trim().to_lowercase();
        if p.is_empty() || !lower.starts_with(&p) {
            return false;
        }
        lower[p.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

/// Compiled matcher budget; a synonym list that needs more is a config error.
const MATCHER_SIZE_LIMIT: usize = 1 << 20;

/// A heading (or bold line) whose text starts with one of the synonyms.
///
/// A synonym ending in a word character must end on a word boundary, so
/// `todo` does not match `## Todos`; one ending in punctuation (`To Do:`)
/// matches as written.
fn next_actions_matcher(synonyms: &[String]) -> Result<Regex, regex::Error> {
    let alternatives: Vec<String> = synonyms
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let ends_in_word = s
                .chars()
                .last()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
            if ends_in_word {
                format!(r"{}\b", regex::escape(s))
            } else {
                regex::escape(s)
            }
        })
        .collect();
    let pattern = format!(
        r"^[ \t]*(?:#{{1,6}}[ \t]*|\*\*)(?:{})",
        alternatives.join("|")
    );
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .multi_line(true)
        .size_limit(MATCHER_SIZE_LIMIT)
        .build()
}

fn append_next_steps(text: &str, schema: &NoteSchema) -> String {
    let mut section = schema.next_steps_header.clone();
    for bullet in &schema.next_steps_placeholders {
        section.push('\n');
        section.push_str(&promote(bullet));
    }

    if text.trim().is_empty() {
        return section;
    }
    let separator = if text.ends_with("\n\n") {
        ""
    } else if text.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };
    format!("{text}{separator}{section}")
}
