//! Strict section rebuilder.
//!
//! The model's own section order is ignored. Each configured section is looked
//! up in the response independently and the document is rebuilt in schema
//! order, so the output always has the same skeleton:
//!
//! ```text
//! # Project Title
//! - <title bullets | default bullet>
//!
//! ## <section 1>
//! - <content | placeholder>
//!
//! ## <section N>
//! - <content | placeholder>
//! ```
//!
//! A header that appears twice only counts once: the first occurrence opens
//! the section, a repeat of the same header inside it is skipped, and the
//! lines after the repeat are collected into the first occurrence.

use super::lines::{
    content_line, is_section_header, is_title_heading, normalize_lines, promote, title_line,
};
use crate::config::{NoteSchema, RequiredSection};

/// Rebuild `response` into a document that satisfies `schema`.
///
/// Total: every input, including the empty string, yields a valid document.
pub fn rebuild(response: &str, schema: &NoteSchema) -> String {
    let anchored = match response.find(schema.title_marker.as_str()) {
        Some(idx) => &response[idx..],
        None => response,
    };
    let lines = normalize_lines(anchored);

    let mut blocks = Vec::with_capacity(schema.sections.len() + 1);
    blocks.push(title_block(&lines, schema));
    for section in &schema.sections {
        blocks.push(section_block(&lines, schema, section));
    }
    blocks.join("\n\n")
}

/// Title marker plus every line before the first section header.
fn title_block(lines: &[&str], schema: &NoteSchema) -> String {
    let marker = schema.title_marker.trim();
    let mut body: Vec<String> = Vec::new();

    for line in lines {
        if is_title_heading(line) || *line == marker {
            continue;
        }
        if is_section_header(line, &schema.section_prefix) {
            break;
        }
        body.push(title_line(line));
    }

    if body.is_empty() {
        body.push(promote(&schema.default_title_bullet));
    }
    render_block(&schema.title_marker, &body)
}

/// Header plus the lines collected under its first occurrence.
fn section_block(lines: &[&str], schema: &NoteSchema, section: &RequiredSection) -> String {
    let header = schema.header_for(section);
    let mut content: Vec<String> = Vec::new();
    let mut open = false;

    for line in lines {
        if *line == header {
            open = true;
            continue;
        }
        if !open {
            continue;
        }
        if is_section_header(line, &schema.section_prefix) {
            break;
        }
        content.push(content_line(line));
    }

    if content.is_empty() {
        content.push(promote(&section.placeholder));
    }
    render_block(&header, &content)
}

fn render_block(header: &str, bullets: &[String]) -> String {
    let len = header.len() + bullets.iter().map(|b| b.len() + 1).sum::<usize>();
    let mut out = String::with_capacity(len);
    out.push_str(header);
    for b in bullets {
        out.push('\n');
        out.push_str(b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sections() -> NoteSchema {
        NoteSchema::with_sections([("Goals", "Define goals."), ("Tasks", "List tasks.")])
    }

    #[test]
    fn empty_response_yields_placeholders() {
        let out = rebuild("", &two_sections());
        assert_eq!(
            out,
            "# Project Title\n- Project enhancement\n\n## Goals\n- Define goals.\n\n## Tasks\n- List tasks."
        );
    }

    #[test]
    fn preamble_before_marker_is_discarded() {
        let r = "Sure! Here you go.\n# Project Title\nLaunch the site\n## Goals\n- Ship v1";
        let out = rebuild(r, &two_sections());
        assert!(!out.contains("Sure!"), "got: {out}");
        assert!(out.starts_with("# Project Title\n- Launch the site\n\n## Goals\n- Ship v1"));
    }

    #[test]
    fn missing_marker_folds_text_into_title() {
        let r = "Website relaunch\nfor Q3\n## Tasks\nwrite copy";
        let out = rebuild(r, &two_sections());
        assert!(out.starts_with("# Project Title\n- Website relaunch\n- for Q3\n\n"));
        assert!(out.ends_with("## Tasks\n- write copy"));
    }

    #[test]
    fn sections_emitted_in_schema_order() {
        let r = "# Project Title\n## Tasks\n- t1\n## Goals\n- g1";
        let out = rebuild(r, &two_sections());
        let goals = out.find("## Goals").unwrap();
        let tasks = out.find("## Tasks").unwrap();
        assert!(goals < tasks);
        assert!(out.contains("## Goals\n- g1"));
        assert!(out.contains("## Tasks\n- t1"));
    }

    #[test]
    fn ordered_items_kept_and_plain_lines_promoted() {
        let r = "## Tasks\n1. draft\n2. review\nthen publish\n* starred";
        let out = rebuild(r, &two_sections());
        assert!(out.ends_with("## Tasks\n1. draft\n2. review\n- then publish\n* starred"));
    }

    #[test]
    fn unknown_headers_close_a_section() {
        let r = "## Goals\n- g1\n## Budget\n- $10k\n## Tasks\n- t1";
        let out = rebuild(r, &two_sections());
        assert!(!out.contains("$10k"), "got: {out}");
        assert!(out.contains("## Goals\n- g1\n\n## Tasks"));
    }

    #[test]
    fn empty_interior_and_terminal_sections_get_placeholders() {
        let r = "## Goals\n## Tasks";
        let out = rebuild(r, &two_sections());
        assert!(out.contains("## Goals\n- Define goals.\n\n"));
        assert!(out.ends_with("## Tasks\n- List tasks."));
    }

    #[test]
    fn repeated_header_only_first_occurrence_counts() {
        let r = "## Goals\n- a\n## Goals\n- b\n## Tasks\n- t\n## Goals\n- c";
        let out = rebuild(r, &two_sections());
        assert!(out.contains("## Goals\n- a\n- b\n\n## Tasks"), "got: {out}");
        assert!(!out.contains("- c"), "got: {out}");
        assert_eq!(out.matches("## Goals").count(), 1);
    }

    #[test]
    fn deeper_headings_are_content() {
        let r = "## Goals\n### Stretch\nfaster builds";
        let out = rebuild(r, &two_sections());
        assert!(out.contains("## Goals\n- ### Stretch\n- faster builds"));
    }

    #[test]
    fn header_with_indentation_still_matches() {
        let r = "   ## Goals   \n   grow revenue  ";
        let out = rebuild(r, &two_sections());
        assert!(out.contains("## Goals\n- grow revenue"));
    }
}
