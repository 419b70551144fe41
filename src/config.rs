//! Configuration types for note processing.
//!
//! Runtime knobs (model host, timeouts, concurrency) live in [`NoteConfig`],
//! built via [`NoteConfigBuilder`]. The shape of the produced document lives
//! in [`NoteSchema`]: section names, their order, placeholder bullets, the
//! title marker, boilerplate lead-ins and "next actions" synonyms are all data
//! and can be loaded from a JSON file.

use crate::error::NoteBotError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Configuration for turning uploaded files into structured notes.
///
/// Built via [`NoteConfig::builder()`] or using [`NoteConfig::default()`].
///
/// # Example
/// ```rust
/// use notebot::{NoteConfig, StructuringStrategy};
///
/// let config = NoteConfig::builder()
///     .text_model("qwen3:4b")
///     .strategy(StructuringStrategy::Permissive)
///     .api_timeout_secs(120)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct NoteConfig {
    /// Base URL of the Ollama server. Default: `http://localhost:11434`.
    pub ollama_host: String,

    /// Model used to structure raw notes. Default: `phi3:mini`.
    pub text_model: String,

    /// Vision model used to transcribe images. Default: `qwen2.5vl:7b`.
    pub vision_model: String,

    /// Sampling temperature for the structuring call. Default: 0.1.
    pub temperature: f32,

    /// Sampling temperature for image transcription. Default: 0.0.
    pub ocr_temperature: f32,

    /// Context window passed as `num_ctx`. Default: 4096.
    pub context_size: u32,

    /// Per-call timeout for every model request, in seconds. Default: 600.
    pub api_timeout_secs: u64,

    /// Which structuring algorithm shapes the model output. Default: Strict.
    pub strategy: StructuringStrategy,

    /// Section layout of the produced document.
    pub schema: NoteSchema,

    /// Where uploads, outputs and logs live.
    pub paths: DataPaths,

    /// Files processed at once in a batch. Default: 1.
    pub concurrency: usize,

    /// Maximum accepted upload body, in bytes. Default: 16 MiB.
    pub max_upload_bytes: usize,

    /// Characters of raw text echoed back in a successful outcome. Default: 300.
    pub preview_chars: usize,

    /// Pre-constructed LLM provider. When set, it replaces the built-in
    /// Ollama client for both structuring and transcription.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            ollama_host: "http://localhost:11434".to_string(),
            text_model: "phi3:mini".to_string(),
            vision_model: "qwen2.5vl:7b".to_string(),
            temperature: 0.1,
            ocr_temperature: 0.0,
            context_size: 4096,
            api_timeout_secs: 600,
            strategy: StructuringStrategy::default(),
            schema: NoteSchema::default(),
            paths: DataPaths::default(),
            concurrency: 1,
            max_upload_bytes: 16 * 1024 * 1024,
            preview_chars: 300,
            provider: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteConfig")
            .field("ollama_host", &self.ollama_host)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("temperature", &self.temperature)
            .field("context_size", &self.context_size)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("strategy", &self.strategy)
            .field("sections", &self.schema.sections.len())
            .field("paths", &self.paths)
            .field("concurrency", &self.concurrency)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl NoteConfig {
    /// Create a new builder for `NoteConfig`.
    pub fn builder() -> NoteConfigBuilder {
        NoteConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`NoteConfig`].
#[derive(Debug)]
pub struct NoteConfigBuilder {
    config: NoteConfig,
}

impl NoteConfigBuilder {
    pub fn ollama_host(mut self, host: impl Into<String>) -> Self {
        self.config.ollama_host = host.into().trim_end_matches('/').to_string();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.config.text_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn ocr_temperature(mut self, t: f32) -> Self {
        self.config.ocr_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn context_size(mut self, n: u32) -> Self {
        self.config.context_size = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn strategy(mut self, strategy: StructuringStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn schema(mut self, schema: NoteSchema) -> Self {
        self.config.schema = schema;
        self
    }

    pub fn data_dir(mut self, root: impl AsRef<Path>) -> Self {
        self.config.paths = DataPaths::under(root);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NoteConfig, NoteBotError> {
        let c = &self.config;
        if c.ollama_host.is_empty() {
            return Err(NoteBotError::InvalidConfig("Ollama host must not be empty".into()));
        }
        if c.text_model.is_empty() || c.vision_model.is_empty() {
            return Err(NoteBotError::InvalidConfig("Model names must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(NoteBotError::InvalidConfig("API timeout must be ≥ 1s".into()));
        }
        if c.context_size == 0 {
            return Err(NoteBotError::InvalidConfig("Context size must be ≥ 1".into()));
        }
        c.schema.validate()?;
        Ok(self.config)
    }
}

// ── Strategy ─────────────────────────────────────────────────────────────

/// Which structuring algorithm turns a model response into the final note.
///
/// | Strategy | Guarantee |
/// |----------|-----------|
/// | `Strict` | title block + every configured section, in order, exactly once |
/// | `Permissive` | only that a closing "next steps" section exists |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringStrategy {
    /// Rebuild the document section by section from the configured schema.
    #[default]
    Strict,
    /// Strip a boilerplate lead-in and make sure action items close the note.
    Permissive,
}

// ── Schema ───────────────────────────────────────────────────────────────

/// One fixed, ordered slot in the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredSection {
    /// Header text without the `## ` prefix, e.g. `Goals / Objectives`.
    pub name: String,
    /// Bullet text (without `- `) used when the model supplies nothing.
    pub placeholder: String,
    /// Bullets used in the fallback document when the model call fails.
    /// The placeholder is used when this is empty.
    #[serde(default)]
    pub fallback: Vec<String>,
}

impl RequiredSection {
    pub fn new(name: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placeholder: placeholder.into(),
            fallback: Vec::new(),
        }
    }

    pub fn with_fallback<I, S>(mut self, bullets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback = bullets.into_iter().map(Into::into).collect();
        self
    }
}

/// The structural contract a generated note must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteSchema {
    /// Heading line that starts every document.
    pub title_marker: String,
    /// Prefix that marks a section header line.
    pub section_prefix: String,
    /// Title bullet used when the model gives no title content.
    pub default_title_bullet: String,
    /// Required sections, in output order.
    pub sections: Vec<RequiredSection>,
    /// Title bullet of the fallback document.
    pub fallback_title_bullet: String,
    /// Lead-in phrases stripped by the permissive strategy (case-insensitive).
    pub boilerplate_prefixes: Vec<String>,
    /// Header phrasings accepted as a "next actions" section (case-insensitive).
    pub next_actions_synonyms: Vec<String>,
    /// Header appended by the permissive strategy when no synonym is present.
    pub next_steps_header: String,
    /// Bullets under the appended header.
    pub next_steps_placeholders: Vec<String>,
}

impl Default for NoteSchema {
    fn default() -> Self {
        Self {
            title_marker: "# Project Title".to_string(),
            section_prefix: "## ".to_string(),
            default_title_bullet: "Project enhancement".to_string(),
            sections: vec![
                RequiredSection::new("Goals / Objectives", "Define the main purpose and goals.")
                    .with_fallback(["Input too large or model unreachable"]),
                RequiredSection::new(
                    "Key Features or Deliverables",
                    "List expected outputs or features.",
                )
                .with_fallback(["Check Ollama and retry"]),
                RequiredSection::new("Tasks and Steps", "Break down the work into steps.")
                    .with_fallback(["Reduce input size", "Try simpler model"]),
                RequiredSection::new("Estimated Timeline / Deadlines", "Set realistic deadlines.")
                    .with_fallback(["Immediate"]),
                RequiredSection::new(
                    "Resources / Tools Needed",
                    "Identify required tools or access.",
                )
                .with_fallback(["Stable connection to Ollama"]),
                RequiredSection::new("Potential Risks / Challenges", "Note possible obstacles.")
                    .with_fallback(["Timeout or model crash"]),
                RequiredSection::new("Next Actions", "List immediate next steps.")
                    .with_fallback(["Retry with shorter input"]),
            ],
            fallback_title_bullet: "AI Processing Failed".to_string(),
            boilerplate_prefixes: vec![
                "here is".to_string(),
                "here's".to_string(),
                "below is".to_string(),
                "sure".to_string(),
                "certainly".to_string(),
            ],
            next_actions_synonyms: vec![
                "next steps".to_string(),
                "next actions".to_string(),
                "action items".to_string(),
                "to-do".to_string(),
                "todo".to_string(),
                "follow-up".to_string(),
            ],
            next_steps_header: "## Next Steps".to_string(),
            next_steps_placeholders: vec![
                "Review these notes and confirm priorities.".to_string(),
                "Assign owners and deadlines.".to_string(),
            ],
        }
    }
}

impl NoteSchema {
    /// A schema with the default markers and the given sections.
    ///
    /// `sections` are `(name, placeholder)` pairs in output order.
    pub fn with_sections<I, N, P>(sections: I) -> Self
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            sections: sections
                .into_iter()
                .map(|(n, p)| RequiredSection::new(n, p))
                .collect(),
            ..Self::default()
        }
    }

    /// Load a schema from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, NoteBotError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| NoteBotError::SchemaLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let schema: NoteSchema =
            serde_json::from_str(&raw).map_err(|e| NoteBotError::SchemaLoad {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        schema.validate()?;
        Ok(schema)
    }

    /// Full header line for a section, e.g. `## Tasks and Steps`.
    pub fn header_for(&self, section: &RequiredSection) -> String {
        format!("{}{}", self.section_prefix, section.name)
    }

    /// Check the invariants the structuring engine relies on.
    pub fn validate(&self) -> Result<(), NoteBotError> {
        if self.title_marker.trim().is_empty() {
            return Err(NoteBotError::InvalidConfig("Title marker must not be empty".into()));
        }
        if self.section_prefix.trim().is_empty() {
            return Err(NoteBotError::InvalidConfig(
                "Section prefix must not be empty".into(),
            ));
        }
        if self.sections.is_empty() {
            return Err(NoteBotError::InvalidConfig(
                "At least one required section must be configured".into(),
            ));
        }
        let multi_line = |t: &str| t.contains(['\n', '\r']);
        if multi_line(self.title_marker.as_str()) || multi_line(self.section_prefix.as_str()) {
            return Err(NoteBotError::InvalidConfig(
                "Title marker and section prefix must be single lines".into(),
            ));
        }
        check_line("Default title bullet", &self.default_title_bullet)?;
        check_line("Fallback title bullet", &self.fallback_title_bullet)?;

        let mut seen = HashSet::new();
        for s in &self.sections {
            check_line("Section name", &s.name)?;
            if !seen.insert(s.name.as_str()) {
                return Err(NoteBotError::InvalidConfig(format!(
                    "Duplicate section '{}'",
                    s.name
                )));
            }
            check_line(&format!("Placeholder of '{}'", s.name), &s.placeholder)?;
            for bullet in &s.fallback {
                check_line(&format!("Fallback bullet of '{}'", s.name), bullet)?;
            }
        }
        check_line("Next-steps header", &self.next_steps_header)?;
        for bullet in &self.next_steps_placeholders {
            check_line("Next-steps placeholder", bullet)?;
        }
        if self.next_actions_synonyms.iter().all(|s| s.trim().is_empty()) {
            return Err(NoteBotError::InvalidConfig(
                "At least one next-actions synonym must be configured".into(),
            ));
        }
        Ok(())
    }
}

/// Text emitted as one document line must be non-empty, trimmed and single-line.
fn check_line(what: &str, text: &str) -> Result<(), NoteBotError> {
    if text.trim().is_empty() {
        return Err(NoteBotError::InvalidConfig(format!("{what} must not be empty")));
    }
    if text.trim() != text {
        return Err(NoteBotError::InvalidConfig(format!(
            "{what} '{text}' has surrounding whitespace"
        )));
    }
    if text.contains(['\n', '\r']) {
        return Err(NoteBotError::InvalidConfig(format!(
            "{what} must be a single line"
        )));
    }
    Ok(())
}

// ── Paths ────────────────────────────────────────────────────────────────

/// Data directories used by the server and batch processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPaths {
    pub root: PathBuf,
    pub uploads: PathBuf,
    pub outputs: PathBuf,
    pub temp: PathBuf,
    pub logs: PathBuf,
    pub templates: PathBuf,
    pub static_files: PathBuf,
}

impl DataPaths {
    /// Lay out every directory under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            uploads: root.join("uploads"),
            outputs: root.join("outputs"),
            temp: root.join("temp"),
            logs: root.join("logs"),
            templates: root.join("templates"),
            static_files: root.join("static"),
            root,
        }
    }

    /// All directories, in creation order.
    pub fn all(&self) -> [&Path; 6] {
        [
            &self.uploads,
            &self.outputs,
            &self.temp,
            &self.logs,
            &self.static_files,
            &self.templates,
        ]
    }

    /// Path of the HTML upload page.
    pub fn index_template(&self) -> PathBuf {
        self.templates.join("index.html")
    }
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::under(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds() {
        let config = NoteConfig::builder().build().unwrap();
        assert_eq!(config.text_model, "phi3:mini");
        assert_eq!(config.api_timeout_secs, 600);
        assert_eq!(config.strategy, StructuringStrategy::Strict);
    }

    #[test]
    fn builder_trims_trailing_slash_and_clamps() {
        let config = NoteConfig::builder()
            .ollama_host("http://127.0.0.1:11434/")
            .temperature(5.0)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(config.ollama_host, "http://127.0.0.1:11434");
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = NoteConfig::builder().api_timeout_secs(0).build().unwrap_err();
        assert!(err.to_string().contains("timeout"), "got: {err}");
    }

    #[test]
    fn default_schema_has_seven_sections() {
        let schema = NoteSchema::default();
        assert_eq!(schema.sections.len(), 7);
        assert_eq!(schema.sections[0].name, "Goals / Objectives");
        assert_eq!(schema.sections[6].name, "Next Actions");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn duplicate_sections_rejected() {
        let schema = NoteSchema::with_sections([("Goals", "a"), ("Goals", "b")]);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate"), "got: {err}");
    }

    #[test]
    fn bullet_text_must_be_one_trimmed_line() {
        let padded = NoteSchema::with_sections([("Goals", " Define goals. ")]);
        assert!(padded.validate().unwrap_err().to_string().contains("whitespace"));

        let empty = NoteSchema::with_sections([("Goals", "")]);
        assert!(empty.validate().unwrap_err().to_string().contains("empty"));

        let schema = NoteSchema {
            fallback_title_bullet: "Failed\r\n## Goals".into(),
            ..NoteSchema::default()
        };
        assert!(schema.validate().unwrap_err().to_string().contains("single line"));
    }

    #[test]
    fn empty_sections_rejected() {
        let schema = NoteSchema::with_sections(Vec::<(String, String)>::new());
        assert!(schema.validate().is_err());
    }

    #[test]
    fn schema_json_partial_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        std::fs::write(
            &path,
            r#"{"sections":[{"name":"Goals","placeholder":"Define goals."}]}"#,
        )
        .unwrap();
        let schema = NoteSchema::from_json_file(&path).unwrap();
        assert_eq!(schema.title_marker, "# Project Title");
        assert_eq!(schema.sections.len(), 1);
        assert!(schema.sections[0].fallback.is_empty());
    }

    #[test]
    fn schema_json_missing_file() {
        let err = NoteSchema::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, NoteBotError::SchemaLoad { .. }));
    }

    #[test]
    fn strategy_serde_lowercase() {
        let s: StructuringStrategy = serde_json::from_str("\"permissive\"").unwrap();
        assert_eq!(s, StructuringStrategy::Permissive);
    }

    #[test]
    fn data_paths_layout() {
        let p = DataPaths::under("/srv/notebot");
        assert_eq!(p.outputs, PathBuf::from("/srv/notebot/outputs"));
        assert_eq!(p.index_template(), PathBuf::from("/srv/notebot/templates/index.html"));
    }
}
