//! HTTP upload endpoint.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /` | upload page from `templates/index.html`, or a built-in page |
//! | `POST /api/process` | multipart `files` → one [`FileOutcome`] per file |
//! | `GET /health` | liveness probe |

use crate::config::NoteConfig;
use crate::error::{FileError, NoteBotError};
use crate::output::FileOutcome;
use crate::pipeline::llm::TextGenerator;
use crate::process::{process_batch_with, BatchInput};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Multipart field carrying the uploads.
const FILES_FIELD: &str = "files";

const FALLBACK_PAGE: &str = "<h1>📝 NoteBot</h1>\n\
<p>Upload support requires <code>templates/index.html</code>.</p>";

/// Shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pub config: NoteConfig,
    pub generator: TextGenerator,
}

impl AppState {
    pub fn new(config: NoteConfig) -> Result<Self, NoteBotError> {
        let generator = TextGenerator::from_config(&config)?;
        Ok(Self { config, generator })
    }
}

/// Response body of `POST /api/process`.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: &'static str,
    pub results: Vec<FileOutcome>,
}

/// JSON `{"error": …}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// Build the router with every route and layer.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/api/process", post(process_upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(config: NoteConfig, addr: &str) -> Result<(), NoteBotError> {
    let state = Arc::new(AppState::new(config)?);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NoteBotError::Bind {
            addr: addr.to_string(),
            source: e,
        })?;
    info!("NoteBot listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| NoteBotError::Internal(format!("server error: {e}")))
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// GET /: upload page.
async fn index(State(state): State<Arc<AppState>>) -> Response {
    let template = state.config.paths.index_template();
    match tokio::fs::read_to_string(&template).await {
        Ok(page) => Html(page).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Html(FALLBACK_PAGE.to_string()).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!("<h1>📝 NoteBot</h1><p>Error loading page: {e}</p>")),
        )
            .into_response(),
    }
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "NoteBot" }))
}

/// One multipart file, in arrival order.
enum Upload {
    Saved(BatchInput),
    Failed(FileOutcome),
}

/// POST /api/process: save every upload, then process them in order.
///
/// A file that cannot be received or saved gets a failed outcome in its
/// slot; the rest of the request still runs.
async fn process_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let uploads = &state.config.paths.uploads;
    tokio::fs::create_dir_all(uploads)
        .await
        .map_err(|e| ApiError::internal(format!("cannot create uploads dir: {e}")))?;

    let mut saw_files_field = false;
    let mut slots: Vec<Upload> = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) if slots.is_empty() => {
                return Err(ApiError::bad_request(format!("Malformed upload: {e}")));
            }
            Err(e) => {
                warn!("Upload stream ended early: {}", e);
                break;
            }
        };
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        saw_files_field = true;

        let filename = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                // The body stream is unusable after a read error.
                let err = FileError::Upload {
                    detail: format!("could not read '{filename}': {e}"),
                };
                warn!("{}", err);
                slots.push(Upload::Failed(FileOutcome::failed(&filename, &err, 0)));
                break;
            }
        };

        let saved = unique_upload_path(uploads, &sanitize_filename(&filename));
        match tokio::fs::write(&saved, &bytes).await {
            Ok(()) => {
                info!("Saved upload: {}", saved.display());
                slots.push(Upload::Saved(BatchInput::new(saved, filename)));
            }
            Err(e) => {
                let err = FileError::Upload {
                    detail: format!("could not save '{filename}': {e}"),
                };
                warn!("{}", err);
                slots.push(Upload::Failed(FileOutcome::failed(&filename, &err, 0)));
            }
        }
    }

    if !saw_files_field {
        return Err(ApiError::bad_request("No file part in request"));
    }
    if slots.is_empty() {
        return Err(ApiError::bad_request("No selected files"));
    }

    let inputs: Vec<BatchInput> = slots
        .iter()
        .filter_map(|slot| match slot {
            Upload::Saved(input) => Some(input.clone()),
            Upload::Failed(_) => None,
        })
        .collect();
    let report = process_batch_with(&inputs, &state.config, &state.generator).await;

    let mut processed = report.outcomes.into_iter();
    let results = slots
        .into_iter()
        .filter_map(|slot| match slot {
            Upload::Saved(_) => processed.next(),
            Upload::Failed(outcome) => Some(outcome),
        })
        .collect();
    Ok(Json(ProcessResponse {
        message: "Processing completed",
        results,
    }))
}

// ── Upload names ─────────────────────────────────────────────────────────

/// Strip directory components and traversal sequences from a client name.
pub fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], "").replace("..", "");
    Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("unnamed")
        .to_string()
}

/// `dir/name`, or `dir/stem_N.ext` with the first free `N` from 1.
pub fn unique_upload_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let suffix = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    (1..)
        .map(|n| dir.join(format!("{stem}_{n}{suffix}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
