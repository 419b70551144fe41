//! Documents substituted when the model call never produced a response.

use super::lines::promote;
use crate::config::NoteSchema;

/// Complete schema-valid document for the strict strategy.
///
/// Each section carries its configured failure bullets, or its placeholder
/// when none are configured.
pub fn fallback_document(schema: &NoteSchema) -> String {
    let mut blocks = Vec::with_capacity(schema.sections.len() + 1);
    blocks.push(format!(
        "{}\n{}",
        schema.title_marker,
        promote(&schema.fallback_title_bullet)
    ));

    for section in &schema.sections {
        let mut block = schema.header_for(section);
        if section.fallback.is_empty() {
            block.push('\n');
            block.push_str(&promote(&section.placeholder));
        } else {
            for bullet in &section.fallback {
                block.push('\n');
                block.push_str(&promote(bullet));
            }
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

/// Short document for the permissive strategy, echoing the error.
pub fn failure_document(detail: &str) -> String {
    format!("# Enhancement Failed\n\nThe notes could not be enhanced.\n\n```\n{}\n```", detail.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RequiredSection;

    #[test]
    fn default_fallback_matches_known_layout() {
        let doc = fallback_document(&NoteSchema::default());
        assert!(doc.starts_with("# Project Title\n- AI Processing Failed\n\n## Goals / Objectives\n"));
        assert!(doc.contains("## Tasks and Steps\n- Reduce input size\n- Try simpler model"));
        assert!(doc.ends_with("## Next Actions\n- Retry with shorter input"));
    }

    #[test]
    fn placeholder_used_without_fallback_bullets() {
        let mut schema = NoteSchema::with_sections([("Goals", "Define goals.")]);
        schema.sections.push(RequiredSection::new("Risks", "None yet.").with_fallback(["Model down"]));
        let doc = fallback_document(&schema);
        assert_eq!(
            doc,
            "# Project Title\n- AI Processing Failed\n\n## Goals\n- Define goals.\n\n## Risks\n- Model down"
        );
    }

    #[test]
    fn failure_document_echoes_error() {
        let doc = failure_document("connection refused\n");
        assert!(doc.starts_with("# Enhancement Failed"));
        assert!(doc.contains("connection refused"));
    }
}
