//! Pipeline stages for turning an uploaded file into a model response.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ (encode ──▶ llm OCR) ──▶ llm structuring ──▶ postprocess
//! (by ext)    (images only)             (ollama/provider)   (sanitize)
//! ```
//!
//! 1. [`extract`]: route by extension; pdfium and zip run in `spawn_blocking`
//! 2. [`encode`]: sniff image bytes, convert to PNG when needed, base64
//! 3. [`llm`]: the text-generation collaborator; the only stage with
//!    network I/O, backed by [`ollama`] or an `edgequake_llm` provider
//! 4. [`postprocess`]: cleanup applied before the structuring engine

pub mod encode;
pub mod extract;
pub mod llm;
pub mod ollama;
pub mod postprocess;
