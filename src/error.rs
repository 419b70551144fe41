//! Error types for the notebot library.
//!
//! Three layers of failure, from widest to narrowest:
//!
//! * [`NoteBotError`]: **Fatal** for the operation at hand. The configuration
//!   is invalid, the schema file cannot be read, the server cannot bind, a
//!   startup check failed. Returned as `Err(NoteBotError)`.
//!
//! * [`FileError`]: **Non-fatal**. One uploaded file could not be turned into
//!   notes. Stored inside [`crate::output::FileOutcome`] so a batch always
//!   finishes and reports every file independently.
//!
//! * [`ExtractionError`] / [`GenerationError`]: the two collaborator failures
//!   that feed [`FileError`]. `ExtractionError` renders as the bracketed
//!   marker strings (`[ERROR: …]`, `[UNSUPPORTED FILE TYPE: …]`) that callers
//!   of the upload API have always seen.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the notebot library.
#[derive(Debug, Error)]
pub enum NoteBotError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or schema validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A schema file was given but could not be read or parsed.
    #[error("Failed to load note schema from '{path}': {detail}")]
    SchemaLoad { path: PathBuf, detail: String },

    /// The named LLM provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Startup errors ────────────────────────────────────────────────────
    /// A data directory could not be created.
    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One of the startup checks did not pass.
    #[error("Startup check '{check}' failed: {detail}")]
    StartupCheck { check: String, detail: String },

    /// The HTTP listener could not be bound.
    #[error("Failed to bind server on '{addr}': {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Text could not be extracted from an uploaded file.
///
/// The `Display` form is the marker string understood by
/// [`crate::pipeline::extract::is_error_marker`].
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    #[error("[ERROR: Could not read TXT] {0}")]
    Txt(String),

    #[error("[ERROR: Could not read DOCX] {0}")]
    Docx(String),

    #[error("[ERROR: Could not read PDF] {0}")]
    Pdf(String),

    #[error("[ERROR: OCR failed] {0}")]
    Ocr(String),

    /// Extension not handled by any extractor. Holds the dotted, lower-cased
    /// extension (or an empty string).
    #[error("[UNSUPPORTED FILE TYPE: {0}] File not processed.")]
    Unsupported(String),
}

/// The text-generation call did not produce a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("model took longer than {secs}s to respond")]
    Timeout { secs: u64 },

    #[error("{detail}")]
    Request { detail: String },
}

/// A non-fatal error for a single file.
///
/// The batch continues regardless; the message is what the upload API
/// reports in the `error` field.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The extractor could not produce text.
    #[error("{0}")]
    Extraction(ExtractionError),

    /// Extracted text was already an error marker string.
    #[error("{0}")]
    ErrorMarker(String),

    /// The model call exceeded `api_timeout_secs`.
    #[error("AI timeout: model took longer than {secs}s to respond (increase --api-timeout?)")]
    RemoteTimeout { secs: u64 },

    /// Any other transport or protocol failure from the model call.
    #[error("Model API error: {detail}")]
    RemoteCall { detail: String },

    /// Normalisation failed internally (permissive strategy only).
    #[error("Unexpected error during AI processing: {detail}")]
    Structuring { detail: String },

    /// The uploaded bytes could not be received or saved.
    #[error("Upload failed: {detail}")]
    Upload { detail: String },

    /// The structured document could not be persisted.
    #[error("Failed to write '{path}': {detail}")]
    OutputWrite { path: PathBuf, detail: String },
}

impl From<ExtractionError> for FileError {
    fn from(e: ExtractionError) -> Self {
        FileError::Extraction(e)
    }
}

impl From<GenerationError> for FileError {
    fn from(e: GenerationError) -> Self {
        match e {
            GenerationError::Timeout { secs } => FileError::RemoteTimeout { secs },
            GenerationError::Request { detail } => FileError::RemoteCall { detail },
        }
    }
}
