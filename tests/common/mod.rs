//! In-process fake Ollama server shared by the integration tests.
//!
//! Binds `127.0.0.1:0`, serves `/api/generate`, `/api/tags` and `/api/pull`,
//! and records every request body it receives.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How `/api/generate` answers text (non-image) requests.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Reply(String),
    Delay(Duration),
    Fail(StatusCode),
}

#[derive(Debug)]
pub struct FakeOllama {
    pub behaviour: Behaviour,
    pub ocr_text: String,
    pub installed: Vec<String>,
    pub generate_calls: Mutex<Vec<Value>>,
    pub pulls: Mutex<Vec<String>>,
}

impl FakeOllama {
    pub fn generate_calls(&self) -> Vec<Value> {
        self.generate_calls.lock().unwrap().clone()
    }

    pub fn pulls(&self) -> Vec<String> {
        self.pulls.lock().unwrap().clone()
    }
}

/// Start a fake server; returns its base URL and the shared state.
pub async fn spawn_fake_ollama(behaviour: Behaviour) -> (String, Arc<FakeOllama>) {
    spawn_with(behaviour, vec!["phi3:mini".into(), "qwen2.5vl:7b".into()]).await
}

pub async fn spawn_with(behaviour: Behaviour, installed: Vec<String>) -> (String, Arc<FakeOllama>) {
    init_tracing();
    let state = Arc::new(FakeOllama {
        behaviour,
        ocr_text: "Whiteboard: launch on friday".into(),
        installed,
        generate_calls: Mutex::new(Vec::new()),
        pulls: Mutex::new(Vec::new()),
    });

    let app = Router::new()
        .route("/api/generate", post(generate))
        .route("/api/tags", get(tags))
        .route("/api/pull", post(pull))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

async fn generate(State(state): State<Arc<FakeOllama>>, Json(body): Json<Value>) -> Response {
    state.generate_calls.lock().unwrap().push(body.clone());

    if body.get("images").is_some() {
        return Json(json!({ "response": state.ocr_text, "done": true })).into_response();
    }

    match &state.behaviour {
        Behaviour::Reply(text) => Json(json!({ "response": text, "done": true })).into_response(),
        Behaviour::Delay(d) => {
            tokio::time::sleep(*d).await;
            Json(json!({ "response": "too late", "done": true })).into_response()
        }
        Behaviour::Fail(status) => (*status, "model exploded").into_response(),
    }
}

async fn tags(State(state): State<Arc<FakeOllama>>) -> Json<Value> {
    let models: Vec<Value> = state.installed.iter().map(|m| json!({ "name": m })).collect();
    Json(json!({ "models": models }))
}

async fn pull(State(state): State<Arc<FakeOllama>>, Json(body): Json<Value>) -> Json<Value> {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.pulls.lock().unwrap().push(name);
    Json(json!({ "status": "success" }))
}

/// Library logs in test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A 4×4 PNG for the OCR path.
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Minimal `.docx`: a zip holding only `word/document.xml`.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;
    let mut xml = String::from("<w:document><w:body>");
    for p in paragraphs {
        xml.push_str(&format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"));
    }
    xml.push_str("</w:body></w:document>");

    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buf);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buf.into_inner()
}
