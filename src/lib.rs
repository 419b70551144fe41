//! # notebot
//!
//! Turn uploaded notes (text, Word, PDF, photos of whiteboards) into
//! structured Markdown project plans with a local Ollama model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Extract    txt / docx / pdf text, or vision-model OCR for images
//!  ├─ 2. Generate   one call to the text model with the structuring prompt
//!  ├─ 3. Sanitize   line endings, invisible chars, stray code fences
//!  ├─ 4. Structure  strict section rebuild, or permissive polish
//!  └─ 5. Persist    outputs/<stem>.md + per-file outcome
//! ```
//!
//! The structuring engine in [`structure`] is pure and total: any model
//! response becomes a well-formed document, and a failed model call yields the
//! strategy's fallback document instead.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notebot::{process_batch, BatchInput, NoteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NoteConfig::builder().data_dir("./data").build()?;
//!     let report = process_batch(&[BatchInput::from_path("meeting.txt")], &config).await?;
//!     for outcome in &report.outcomes {
//!         println!("{}: {:?}", outcome.filename, outcome.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `server` | on | axum upload endpoint ([`server`]) |
//! | `cli`    | on | the `notebot` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod server;
pub mod structure;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    DataPaths, NoteConfig, NoteConfigBuilder, NoteSchema, RequiredSection, StructuringStrategy,
};
pub use error::{ExtractionError, FileError, GenerationError, NoteBotError};
pub use output::{BatchReport, BatchStats, FileOutcome, FileStatus};
pub use pipeline::extract::{extract_text, is_error_marker};
pub use pipeline::llm::TextGenerator;
pub use process::{enhance_text, process_batch, process_batch_with, process_file, BatchInput};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use structure::{failure_document, fallback_document};
