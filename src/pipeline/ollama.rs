//! Minimal Ollama REST client: `/api/generate`, `/api/tags`, `/api/pull`.
//!
//! Only the non-streaming form of each endpoint is used. One request is made
//! per call; a failed or timed-out request is reported, never retried.

use crate::error::GenerationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Timeout for the lightweight `/api/tags` probe.
const TAGS_TIMEOUT_SECS: u64 = 10;
/// Timeout for `/api/pull`, which downloads gigabytes.
const PULL_TIMEOUT_SECS: u64 = 1800;

/// Sampling options sent under `options`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateOptions {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<u32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerateOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

/// HTTP client bound to one Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    host: String,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for `host` (e.g. `http://localhost:11434`).
    ///
    /// `timeout_secs` bounds every `generate` call.
    pub fn new(host: impl Into<String>, timeout_secs: u64) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Request {
                detail: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Single non-streaming completion. Returns the trimmed `response` field.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
        images: &[&str],
    ) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.host);
        let body = GenerateRequest {
            model,
            prompt,
            stream: false,
            options,
            images: (!images.is_empty()).then(|| images.to_vec()),
        };
        debug!("POST {} model={} prompt_len={}", url, model, prompt.len());

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_err(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request {
                detail: format!("HTTP {status} from {url}: {}", text.trim()),
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| self.map_err(e))?;
        Ok(parsed.response.trim().to_string())
    }

    /// Names of the installed models.
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/api/tags", self.host);
        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(TAGS_TIMEOUT_SECS))
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        if !response.status().is_success() {
            return Err(GenerationError::Request {
                detail: format!("Ollama responded with status {}", response.status()),
            });
        }

        let tags: TagsResponse = response.json().await.map_err(|e| request_error(&url, e))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Download a model and block until Ollama reports completion.
    pub async fn pull_model(&self, name: &str) -> Result<(), GenerationError> {
        let url = format!("{}/api/pull", self.host);
        info!("Pulling model {} (this can take a while)", name);

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(PULL_TIMEOUT_SECS))
            .json(&PullRequest {
                name,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| request_error(&url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Request {
                detail: format!("pull {name} failed with HTTP {status}: {}", text.trim()),
            });
        }
        Ok(())
    }

    fn map_err(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            GenerationError::Request {
                detail: e.to_string(),
            }
        }
    }
}

fn request_error(url: &str, e: reqwest::Error) -> GenerationError {
    GenerationError::Request {
        detail: format!("{url}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_shape() {
        let options = GenerateOptions {
            temperature: 0.1,
            num_ctx: Some(4096),
        };
        let body = GenerateRequest {
            model: "phi3:mini",
            prompt: "hi",
            stream: false,
            options: &options,
            images: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["options"]["num_ctx"], 4096);
        assert!(json.get("images").is_none());
    }

    #[test]
    fn ocr_request_omits_num_ctx() {
        let options = GenerateOptions {
            temperature: 0.0,
            num_ctx: None,
        };
        let body = GenerateRequest {
            model: "qwen2.5vl:7b",
            prompt: "transcribe",
            stream: false,
            options: &options,
            images: Some(vec!["aGVsbG8="]),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["options"].get("num_ctx").is_none());
        assert_eq!(json["images"][0], "aGVsbG8=");
    }

    #[test]
    fn host_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", 5).unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
    }
}
