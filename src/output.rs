//! Result types returned by the batch processor and the upload API.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a file produced notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Success,
    Failed,
}

/// What happened to one uploaded file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Name as presented by the client (or the CLI argument).
    pub filename: String,
    pub status: FileStatus,

    /// First `preview_chars` characters of the extracted text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text_preview: Option<String>,

    /// Final Markdown document. On a failed model call this is the
    /// strategy's fallback document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_notes: Option<String>,

    /// Where the document was written under `outputs/`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Human-readable failure, present only when `status` is `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
}

impl FileOutcome {
    pub(crate) fn failed(filename: impl Into<String>, error: &FileError, duration_ms: u64) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Failed,
            raw_text_preview: None,
            enhanced_notes: None,
            output_path: None,
            error: Some(error.to_string()),
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FileStatus::Success
    }
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// Outcomes in input order plus the batch counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub stats: BatchStats,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<FileOutcome>, duration_ms: u64) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let stats = BatchStats {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            duration_ms,
        };
        Self { outcomes, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;

    #[test]
    fn failed_outcome_serialises_without_empty_fields() {
        let err = FileError::from(ExtractionError::Unsupported(".xyz".into()));
        let outcome = FileOutcome::failed("a.xyz", &err, 3);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "[UNSUPPORTED FILE TYPE: .xyz] File not processed.");
        assert!(json.get("enhanced_notes").is_none());
        assert!(json.get("output_path").is_none());
    }

    #[test]
    fn report_counts() {
        let err = FileError::ErrorMarker("[ERROR: x]".into());
        let mut ok = FileOutcome::failed("b.txt", &err, 1);
        ok.status = FileStatus::Success;
        ok.error = None;
        let report = BatchReport::from_outcomes(
            vec![ok, FileOutcome::failed("c.txt", &err, 2)],
            9,
        );
        assert_eq!(
            report.stats,
            BatchStats {
                total: 2,
                succeeded: 1,
                failed: 1,
                duration_ms: 9
            }
        );
        assert_eq!(report.outcomes[0].filename, "b.txt");
    }
}
