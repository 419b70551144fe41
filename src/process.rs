//! Per-file and batch processing entry points.
//!
//! One file goes through:
//!
//! ```text
//! extract ──▶ marker check ──▶ model call ──▶ sanitize ──▶ strategy ──▶ outputs/<stem>.md
//! ```
//!
//! Every failure is captured in the returned [`FileOutcome`]; a batch always
//! reports every file.

use crate::config::NoteConfig;
use crate::error::{FileError, NoteBotError};
use crate::output::{BatchReport, FileOutcome, FileStatus};
use crate::pipeline::extract::{extract_text, is_error_marker};
use crate::pipeline::llm::TextGenerator;
use crate::pipeline::postprocess::sanitize_response;
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Characters of extracted text written to the debug log.
const LOG_PREVIEW_CHARS: usize = 200;

/// One file to process: where it is on disk and the name to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub path: PathBuf,
    pub filename: String,
}

impl BatchInput {
    pub fn new(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
        }
    }

    /// Report the file under its own file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, filename }
    }
}

/// Final document for some raw text, plus the model failure if there was one.
#[derive(Debug, Clone)]
pub struct Enhancement {
    pub notes: String,
    pub error: Option<FileError>,
}

/// Turn raw text into the final Markdown document.
///
/// A failed model call still yields a document: the strategy's fallback.
pub async fn enhance_text(
    raw_text: &str,
    config: &NoteConfig,
    generator: &TextGenerator,
) -> Enhancement {
    match generator.structure_notes(raw_text, config).await {
        Ok(response) => {
            info!("Model responded with {} chars", response.len());
            let cleaned = sanitize_response(&response);
            match config.strategy.try_apply(&cleaned, &config.schema) {
                Ok(notes) => Enhancement { notes, error: None },
                Err(e) => failed_enhancement(
                    FileError::Structuring {
                        detail: e.to_string(),
                    },
                    config,
                ),
            }
        }
        Err(e) => failed_enhancement(FileError::from(e), config),
    }
}

fn failed_enhancement(err: FileError, config: &NoteConfig) -> Enhancement {
    warn!("{}", err);
    Enhancement {
        notes: config.strategy.fallback(&config.schema, &err.to_string()),
        error: Some(err),
    }
}

/// Process one file end to end and persist its notes.
pub async fn process_file(
    path: &Path,
    filename: &str,
    config: &NoteConfig,
    generator: &TextGenerator,
) -> FileOutcome {
    let start = Instant::now();
    let elapsed = || start.elapsed().as_millis() as u64;

    // ── Extract ──────────────────────────────────────────────────────────
    let raw_text = match extract_text(path, config, generator).await {
        Ok(text) => text,
        Err(e) => {
            let err = FileError::from(e);
            error!("{}: {}", filename, err);
            return FileOutcome::failed(filename, &err, elapsed());
        }
    };

    if is_error_marker(&raw_text) {
        let err = FileError::ErrorMarker(raw_text);
        error!("{}: {}", filename, err);
        return FileOutcome::failed(filename, &err, elapsed());
    }
    debug!(
        "Extracted text (first {} chars): {}",
        LOG_PREVIEW_CHARS,
        preview(&raw_text, LOG_PREVIEW_CHARS)
    );

    // ── Structure ────────────────────────────────────────────────────────
    let Enhancement { notes, error } = enhance_text(&raw_text, config, generator).await;

    // ── Persist ──────────────────────────────────────────────────────────
    let output_path = output_path_for(&config.paths.outputs, filename);
    let mut error = error;
    let written = match write_atomic(&output_path, &notes).await {
        Ok(()) => {
            info!("Saved notes to {}", output_path.display());
            Some(output_path)
        }
        Err(e) => {
            let err = FileError::OutputWrite {
                path: output_path,
                detail: e.to_string(),
            };
            error!("{}", err);
            error.get_or_insert(err);
            None
        }
    };

    FileOutcome {
        filename: filename.to_string(),
        status: if error.is_none() {
            FileStatus::Success
        } else {
            FileStatus::Failed
        },
        raw_text_preview: Some(preview(&raw_text, config.preview_chars)),
        enhanced_notes: Some(notes),
        output_path: written,
        error: error.map(|e| e.to_string()),
        duration_ms: elapsed(),
    }
}

/// Process files with up to `config.concurrency` in flight.
///
/// Outcomes come back in input order. Only setup failures are fatal.
pub async fn process_batch(
    inputs: &[BatchInput],
    config: &NoteConfig,
) -> Result<BatchReport, NoteBotError> {
    let generator = TextGenerator::from_config(config)?;
    Ok(process_batch_with(inputs, config, &generator).await)
}

/// [`process_batch`] with a caller-owned generator.
pub async fn process_batch_with(
    inputs: &[BatchInput],
    config: &NoteConfig,
    generator: &TextGenerator,
) -> BatchReport {
    let start = Instant::now();
    let total = inputs.len();
    info!("Processing {} file(s), concurrency {}", total, config.concurrency);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let outcomes: Vec<FileOutcome> = stream::iter(0..inputs.len())
        .map(|i: usize| async move {
            let input = &inputs[i];
            let index = i + 1;
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(index, total, &input.filename);
            }
            let outcome = process_file(&input.path, &input.filename, config, generator).await;
            if let Some(ref cb) = config.progress_callback {
                match (&outcome.error, &outcome.enhanced_notes) {
                    (Some(e), _) => cb.on_file_error(index, total, &input.filename, e),
                    (None, notes) => cb.on_file_complete(
                        index,
                        total,
                        &input.filename,
                        notes.as_ref().map_or(0, |n| n.len()),
                    ),
                }
            }
            outcome
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let report = BatchReport::from_outcomes(outcomes, start.elapsed().as_millis() as u64);
    info!(
        "Batch complete: {}/{} succeeded in {}ms",
        report.stats.succeeded, report.stats.total, report.stats.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, report.stats.succeeded);
    }
    report
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// `outputs/<stem>.md`, where stem comes from the reported file name.
pub fn output_path_for(outputs: &Path, filename: &str) -> PathBuf {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "notes".to_string());
    outputs.join(format!("{stem}.md"))
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Write via a uniquely named sibling temp file, then persist over `path`.
///
/// Concurrent writers to the same path each get their own temp file; the
/// last one to persist wins.
async fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    tokio::fs::create_dir_all(&parent).await?;

    let path = path.to_path_buf();
    let contents = contents.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_uses_stem() {
        let out = Path::new("/data/outputs");
        assert_eq!(output_path_for(out, "meeting.docx"), out.join("meeting.md"));
        assert_eq!(output_path_for(out, "a.b.txt"), out.join("a.b.md"));
        assert_eq!(output_path_for(out, ""), out.join("notes.md"));
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        assert_eq!(preview("héllo wörld", 5), "héllo");
        assert_eq!(preview("ab", 300), "ab");
    }

    #[test]
    fn batch_input_from_path() {
        let input = BatchInput::from_path("/tmp/x/notes.txt");
        assert_eq!(input.filename, "notes.txt");
    }

    #[tokio::test]
    async fn atomic_write_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs").join("a.md");
        write_atomic(&path, "# hi").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hi");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_path_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        let bodies: Vec<String> = (0..16).map(|i| format!("# version {i}")).collect();

        let results =
            futures::future::join_all(bodies.iter().map(|b| write_atomic(&path, b))).await;
        assert!(results.iter().all(|r| r.is_ok()), "{results:?}");

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(bodies.contains(&saved), "got: {saved}");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn unsupported_file_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = NoteConfig::builder().data_dir(dir.path()).build().unwrap();
        let generator = TextGenerator::from_config(&config).unwrap();
        let outcome =
            process_file(Path::new("slides.pptx"), "slides.pptx", &config, &generator).await;
        assert_eq!(outcome.status, FileStatus::Failed);
        assert_eq!(
            outcome.error.as_deref(),
            Some("[UNSUPPORTED FILE TYPE: .pptx] File not processed.")
        );
        assert!(outcome.output_path.is_none());
        assert!(!config.paths.outputs.join("slides.md").exists());
    }
}
