//! Note structuring engine.
//!
//! Turns an untrusted model response into the final Markdown note. Both
//! strategies are pure `(text, schema) -> document` functions with no I/O and
//! no shared state, so they are safe to call from any number of requests at
//! once.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lines`] | trim/split, bullet and header classification |
//! | [`strict`] | rebuild the document from the configured sections |
//! | [`permissive`] | strip a lead-in, guarantee a closing next-steps section |
//! | [`fallback`] | documents used when no model response exists |

pub mod fallback;
pub mod lines;
pub mod permissive;
pub mod strict;

use crate::config::{NoteSchema, StructuringStrategy};
use tracing::warn;

pub use fallback::{failure_document, fallback_document};

impl StructuringStrategy {
    /// Shape `response` into the final document.
    ///
    /// Never fails: the strict strategy is total, and the permissive one
    /// returns [`failure_document`] if its matcher cannot be built.
    pub fn apply(&self, response: &str, schema: &NoteSchema) -> String {
        self.try_apply(response, schema).unwrap_or_else(|e| {
            warn!("Permissive structuring failed: {}", e);
            failure_document(&e.to_string())
        })
    }

    /// Like [`apply`](Self::apply), but hands back the permissive matcher
    /// error instead of substituting a document.
    pub fn try_apply(&self, response: &str, schema: &NoteSchema) -> Result<String, regex::Error> {
        match self {
            StructuringStrategy::Strict => Ok(strict::rebuild(response, schema)),
            StructuringStrategy::Permissive => permissive::polish(response, schema),
        }
    }

    /// Document to return when the model call itself failed.
    pub fn fallback(&self, schema: &NoteSchema, detail: &str) -> String {
        match self {
            StructuringStrategy::Strict => fallback_document(schema),
            StructuringStrategy::Permissive => failure_document(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_fallback_is_a_fixed_point() {
        let schema = NoteSchema::default();
        let doc = StructuringStrategy::Strict.fallback(&schema, "ignored");
        assert_eq!(StructuringStrategy::Strict.apply(&doc, &schema), doc);
    }

    #[test]
    fn permissive_fallback_carries_detail() {
        let doc = StructuringStrategy::Permissive.fallback(&NoteSchema::default(), "timed out");
        assert!(doc.contains("timed out"));
    }

    #[test]
    fn permissive_matcher_failure_surfaces() {
        let schema = NoteSchema {
            next_actions_synonyms: vec!["next step ".repeat(100_000)],
            ..NoteSchema::default()
        };
        let strategy = StructuringStrategy::Permissive;
        assert!(strategy.try_apply("# Plan", &schema).is_err());
        assert!(strategy.apply("# Plan", &schema).starts_with("# Enhancement Failed"));
        assert!(StructuringStrategy::Strict.try_apply("# Plan", &schema).is_ok());
    }

    #[test]
    fn strategies_differ_on_same_input() {
        let schema = NoteSchema::default();
        let r = "## Next Steps\n- Ship it";
        assert_eq!(StructuringStrategy::Permissive.apply(r, &schema), r);
        let strict = StructuringStrategy::Strict.apply(r, &schema);
        assert!(strict.starts_with("# Project Title\n- Project enhancement"));
        assert!(!strict.contains("Ship it"), "Next Steps is not a configured section");
    }
}
