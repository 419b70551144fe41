//! Startup routine: data directories and pre-flight checks.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. Ollama service answers `/api/tags`
//! 2. the text and vision models are installed (missing ones are pulled)
//! 3. `templates/index.html` exists (a minimal upload form is written if not)
//!
//! Checks 1 and 2 are skipped when a non-Ollama provider is configured.

use crate::config::{DataPaths, NoteConfig};
use crate::error::NoteBotError;
use crate::pipeline::ollama::OllamaClient;
use serde::Serialize;
use tracing::{info, warn};

const MINIMAL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>NoteBot</title>
    <style>
        body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }
        .container { max-width: 800px; margin: 0 auto; background: white; padding: 20px; border-radius: 10px; }
        .header { text-align: center; margin-bottom: 30px; }
        .upload-area { border: 2px dashed #ccc; padding: 40px; text-align: center; border-radius: 10px; }
        .btn { background: #007bff; color: white; padding: 10px 20px; border: none; border-radius: 5px; cursor: pointer; }
        .btn:hover { background: #0056b3; }
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>📝 NoteBot</h1>
            <p>Note Enhancement Tool</p>
        </div>
        <div class="upload-area">
            <h3>Upload Your Files</h3>
            <form action="/api/process" method="post" enctype="multipart/form-data">
                <input type="file" name="files" multiple accept="image/*,.txt,.doc,.docx,.pdf">
                <br><br>
                <button type="submit" class="btn">Process Files</button>
            </form>
        </div>
    </div>
</body>
</html>
"#;

/// What the startup checks found or did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartupReport {
    /// `false` when a provider replaced Ollama and the service was not probed.
    pub ollama_checked: bool,
    pub models_present: Vec<String>,
    pub models_pulled: Vec<String>,
    pub template_created: bool,
}

/// Create every data directory (idempotent).
pub async fn prepare_directories(paths: &DataPaths) -> Result<(), NoteBotError> {
    for dir in paths.all() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| NoteBotError::DirectoryCreate {
                path: dir.to_path_buf(),
                source: e,
            })?;
    }
    Ok(())
}

/// Models the configuration needs, vision model first, without duplicates.
pub fn required_models(config: &NoteConfig) -> Vec<String> {
    let mut models = vec![config.vision_model.clone()];
    if config.text_model != config.vision_model {
        models.push(config.text_model.clone());
    }
    models
}

/// Run the pre-flight checks. The first failure is returned as
/// [`NoteBotError::StartupCheck`].
pub async fn run_startup_checks(config: &NoteConfig) -> Result<StartupReport, NoteBotError> {
    let mut report = StartupReport::default();

    if config.provider.is_none() {
        let client = OllamaClient::new(&config.ollama_host, config.api_timeout_secs).map_err(
            |e| NoteBotError::StartupCheck {
                check: "Ollama Service".into(),
                detail: e.to_string(),
            },
        )?;

        // ── Ollama service ───────────────────────────────────────────────
        info!("Checking Ollama Service...");
        let installed = client
            .list_models()
            .await
            .map_err(|e| NoteBotError::StartupCheck {
                check: "Ollama Service".into(),
                detail: format!("{e}. Start it with: ollama serve"),
            })?;
        info!("Ollama service at {} - OK", client.host());
        report.ollama_checked = true;

        // ── Models ───────────────────────────────────────────────────────
        info!("Checking AI Models...");
        for model in required_models(config) {
            if installed.iter().any(|m| m == &model) {
                info!("Model {} - OK", model);
                report.models_present.push(model);
                continue;
            }
            warn!("Model {} not found. Installing...", model);
            client
                .pull_model(&model)
                .await
                .map_err(|e| NoteBotError::StartupCheck {
                    check: "AI Models".into(),
                    detail: format!("failed to install {model}: {e}"),
                })?;
            info!("Successfully installed {}", model);
            report.models_pulled.push(model);
        }
    } else {
        info!("Custom LLM provider configured; skipping Ollama checks");
    }

    // ── Template ─────────────────────────────────────────────────────────
    info!("Checking HTML Template...");
    report.template_created = ensure_template(&config.paths).await?;
    Ok(report)
}

/// Write the minimal upload page if none exists. Returns `true` if written.
pub async fn ensure_template(paths: &DataPaths) -> Result<bool, NoteBotError> {
    let template = paths.index_template();
    if tokio::fs::try_exists(&template).await.unwrap_or(false) {
        info!("HTML template exists - OK");
        return Ok(false);
    }

    let check_err = |e: std::io::Error| NoteBotError::StartupCheck {
        check: "HTML Template".into(),
        detail: format!("failed to create {}: {e}", template.display()),
    };
    tokio::fs::create_dir_all(&paths.templates)
        .await
        .map_err(check_err)?;
    tokio::fs::write(&template, MINIMAL_TEMPLATE)
        .await
        .map_err(check_err)?;
    info!("Created minimal HTML template");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::under(dir.path());
        prepare_directories(&paths).await.unwrap();
        for p in paths.all() {
            assert!(p.is_dir(), "{} missing", p.display());
        }
        prepare_directories(&paths).await.unwrap();
    }

    #[tokio::test]
    async fn template_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::under(dir.path());
        assert!(ensure_template(&paths).await.unwrap());
        let page = std::fs::read_to_string(paths.index_template()).unwrap();
        assert!(page.contains(r#"name="files""#));

        std::fs::write(paths.index_template(), "custom").unwrap();
        assert!(!ensure_template(&paths).await.unwrap());
        assert_eq!(std::fs::read_to_string(paths.index_template()).unwrap(), "custom");
    }

    #[test]
    fn required_models_deduplicated() {
        let config = NoteConfig::builder()
            .text_model("llava")
            .vision_model("llava")
            .build()
            .unwrap();
        assert_eq!(required_models(&config), vec!["llava".to_string()]);
        assert_eq!(
            required_models(&NoteConfig::default()),
            vec!["qwen2.5vl:7b".to_string(), "phi3:mini".to_string()]
        );
    }

    #[tokio::test]
    async fn unreachable_ollama_fails_first_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = NoteConfig::builder()
            .ollama_host("http://127.0.0.1:9")
            .data_dir(dir.path())
            .build()
            .unwrap();
        let err = run_startup_checks(&config).await.unwrap_err();
        match err {
            NoteBotError::StartupCheck { check, .. } => assert_eq!(check, "Ollama Service"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!config.paths.index_template().exists());
    }
}
