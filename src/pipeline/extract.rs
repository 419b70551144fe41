//! Extraction dispatcher: file path → raw text.
//!
//! | Extension | Extractor |
//! |-----------|-----------|
//! | `.txt` | UTF-8 read |
//! | `.doc`, `.docx` | `word/document.xml` text runs from the zip container |
//! | `.pdf` | pdfium page text, pages joined with `\n` |
//! | `.png .jpg .jpeg .bmp .tiff .webp` | vision-model transcription |
//!
//! Parsers that block (zip, pdfium) run on `spawn_blocking`.

use crate::config::NoteConfig;
use crate::error::ExtractionError;
use crate::pipeline::encode::encode_image;
use crate::pipeline::llm::TextGenerator;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Image extensions routed to transcription.
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg", ".bmp", ".tiff", ".webp"];

/// Kind of extractor chosen for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Word,
    Pdf,
    Image,
    Unsupported(String),
}

impl FileKind {
    /// Classify by lower-cased extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = dotted_extension(path);
        match ext.as_str() {
            ".txt" => FileKind::Text,
            ".doc" | ".docx" => FileKind::Word,
            ".pdf" => FileKind::Pdf,
            e if IMAGE_EXTENSIONS.contains(&e) => FileKind::Image,
            _ => FileKind::Unsupported(ext),
        }
    }
}

/// `.ext` in lower case, or an empty string when there is no extension.
pub fn dotted_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// `true` for text that is really an extraction failure marker.
///
/// Matches the `[ERROR…` prefix and the `[UNSUPPORTED` tag anywhere.
pub fn is_error_marker(text: &str) -> bool {
    text.starts_with("[ERROR") || text.contains("[UNSUPPORTED")
}

/// Extract raw text from `path`, routing on its extension.
pub async fn extract_text(
    path: &Path,
    config: &NoteConfig,
    generator: &TextGenerator,
) -> Result<String, ExtractionError> {
    let kind = FileKind::from_path(path);
    debug!("Extracting {} as {:?}", path.display(), kind);

    match kind {
        FileKind::Text => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExtractionError::Txt(e.to_string())),
        FileKind::Word => {
            let p = path.to_path_buf();
            run_blocking(move || read_docx(&p), ExtractionError::Docx).await
        }
        FileKind::Pdf => {
            let p = path.to_path_buf();
            run_blocking(move || read_pdf(&p), ExtractionError::Pdf).await
        }
        FileKind::Image => transcribe(path, config, generator).await,
        FileKind::Unsupported(ext) => Err(ExtractionError::Unsupported(ext)),
    }
}

async fn run_blocking<F>(
    f: F,
    on_panic: fn(String) -> ExtractionError,
) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| on_panic(format!("extractor task panicked: {e}")))?
}

// ── Images ───────────────────────────────────────────────────────────────

async fn transcribe(
    path: &Path,
    config: &NoteConfig,
    generator: &TextGenerator,
) -> Result<String, ExtractionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ExtractionError::Ocr(e.to_string()))?;
    let image = encode_image(&bytes).map_err(|e| ExtractionError::Ocr(e.to_string()))?;
    info!("Transcribing {} with {}", path.display(), config.vision_model);

    generator
        .transcribe_image(&image, config)
        .await
        .map_err(|e| ExtractionError::Ocr(e.to_string()))
}

// ── Word documents ───────────────────────────────────────────────────────

static RE_DOCX_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>|<w:tab\s*/>|<w:br\s*/>|<w:cr\s*/>|</w:p>").unwrap()
});

fn read_docx(path: &Path) -> Result<String, ExtractionError> {
    let file = std::fs::File::open(path).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(e.to_string()))?;
    Ok(docx_xml_to_text(&xml))
}

/// Flatten WordprocessingML into plain text.
///
/// Paragraphs are separated by a blank line, `<w:tab/>` becomes a tab and
/// `<w:br/>` a newline. The result is trimmed.
pub fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len() / 4);
    for caps in RE_DOCX_TOKEN.captures_iter(xml) {
        if let Some(text) = caps.get(1) {
            out.push_str(&unescape_xml(text.as_str()));
            continue;
        }
        let token = &caps[0];
        if token.starts_with("<w:tab") {
            out.push('\t');
        } else if token.starts_with("</w:p") {
            out.push_str("\n\n");
        } else {
            out.push('\n');
        }
    }
    out.trim().to_string()
}

fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ── PDF ──────────────────────────────────────────────────────────────────

fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(p) if !p.is_empty() => {
            let path = PathBuf::from(&p);
            let lib = if path.is_dir() {
                Pdfium::pdfium_platform_library_name_at_path(&path)
            } else {
                path
            };
            Pdfium::bind_to_library(lib)
        }
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| ExtractionError::Pdf(format!("pdfium library unavailable: {e:?}")))?;
    Ok(Pdfium::new(bindings))
}

fn read_pdf(path: &Path) -> Result<String, ExtractionError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ExtractionError::Pdf(format!("{e:?}")))?;

    let pages: Vec<String> = document
        .pages()
        .iter()
        .map(|page| page.text().map(|t| t.all()).unwrap_or_default())
        .collect();
    debug!("Extracted text from {} PDF pages", pages.len());
    Ok(pages.join("\n"))
}
