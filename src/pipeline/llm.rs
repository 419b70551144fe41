//! Model interaction: structuring prompts and image transcription.
//!
//! Two backends sit behind [`TextGenerator`]:
//!
//! * [`TextGenerator::Ollama`]: raw `/api/generate` calls (the default).
//! * [`TextGenerator::Provider`]: any `edgequake_llm` provider, used when
//!   [`NoteConfig::provider`] is set (OpenAI, Anthropic, Gemini, …).
//!
//! All prompt text lives in [`crate::prompts`]. Exactly one request is made
//! per document; failures surface as [`GenerationError`] and the caller picks
//! the fallback document.

use crate::config::{NoteConfig, StructuringStrategy};
use crate::error::{GenerationError, NoteBotError};
use crate::pipeline::encode::EncodedImage;
use crate::pipeline::ollama::{GenerateOptions, OllamaClient};
use crate::prompts::{permissive_prompt, strict_prompt, OCR_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// The text-generation collaborator.
#[derive(Clone)]
pub enum TextGenerator {
    Ollama(OllamaClient),
    Provider {
        provider: Arc<dyn LLMProvider>,
        timeout_secs: u64,
    },
}

impl std::fmt::Debug for TextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextGenerator::Ollama(c) => f.debug_tuple("Ollama").field(&c.host()).finish(),
            TextGenerator::Provider { timeout_secs, .. } => f
                .debug_struct("Provider")
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

impl TextGenerator {
    /// Pick the backend: a configured provider wins, Ollama otherwise.
    pub fn from_config(config: &NoteConfig) -> Result<Self, NoteBotError> {
        if let Some(ref provider) = config.provider {
            return Ok(TextGenerator::Provider {
                provider: Arc::clone(provider),
                timeout_secs: config.api_timeout_secs,
            });
        }
        let client = OllamaClient::new(&config.ollama_host, config.api_timeout_secs)
            .map_err(|e| NoteBotError::Internal(e.to_string()))?;
        Ok(TextGenerator::Ollama(client))
    }

    /// Ask the text model to turn raw notes into markdown.
    ///
    /// The prompt follows `config.strategy`. The returned text is the
    /// untrusted model response; structuring happens afterwards.
    pub async fn structure_notes(
        &self,
        raw_text: &str,
        config: &NoteConfig,
    ) -> Result<String, GenerationError> {
        let prompt = match config.strategy {
            StructuringStrategy::Strict => strict_prompt(&config.schema, raw_text),
            StructuringStrategy::Permissive => permissive_prompt(raw_text),
        };
        let start = Instant::now();
        info!("Sending {} chars to {} for structuring", raw_text.len(), config.text_model);

        let result = match self {
            TextGenerator::Ollama(client) => {
                let options = GenerateOptions {
                    temperature: config.temperature,
                    num_ctx: Some(config.context_size),
                };
                client.generate(&config.text_model, &prompt, &options, &[]).await
            }
            TextGenerator::Provider {
                provider,
                timeout_secs,
            } => {
                let messages = vec![ChatMessage::user(prompt)];
                chat_with_timeout(provider, &messages, config.temperature, *timeout_secs).await
            }
        };

        debug!("Structuring call finished in {:?}", start.elapsed());
        result
    }

    /// Transcribe every visible piece of text in an image.
    pub async fn transcribe_image(
        &self,
        image: &EncodedImage,
        config: &NoteConfig,
    ) -> Result<String, GenerationError> {
        let start = Instant::now();
        let result = match self {
            TextGenerator::Ollama(client) => {
                let options = GenerateOptions {
                    temperature: config.ocr_temperature,
                    num_ctx: None,
                };
                client
                    .generate(&config.vision_model, OCR_PROMPT, &options, &[image.base64.as_str()])
                    .await
            }
            TextGenerator::Provider {
                provider,
                timeout_secs,
            } => {
                let messages = vec![ChatMessage::user_with_images(
                    OCR_PROMPT,
                    vec![image.to_image_data()],
                )];
                chat_with_timeout(provider, &messages, config.ocr_temperature, *timeout_secs).await
            }
        };
        debug!("Transcription call finished in {:?}", start.elapsed());
        result
    }
}

/// Instantiate a named `edgequake_llm` provider with the given model.
pub fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, NoteBotError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        NoteBotError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

async fn chat_with_timeout(
    provider: &Arc<dyn LLMProvider>,
    messages: &[ChatMessage],
    temperature: f32,
    timeout_secs: u64,
) -> Result<String, GenerationError> {
    let options = build_options(temperature);
    match timeout(
        Duration::from_secs(timeout_secs),
        provider.chat(messages, Some(&options)),
    )
    .await
    {
        Ok(Ok(response)) => {
            debug!(
                "{} input tokens, {} output tokens",
                response.prompt_tokens, response.completion_tokens
            );
            Ok(response.content.trim().to_string())
        }
        Ok(Err(e)) => Err(GenerationError::Request {
            detail: e.to_string(),
        }),
        Err(_) => Err(GenerationError::Timeout { secs: timeout_secs }),
    }
}

fn build_options(temperature: f32) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        ..Default::default()
    }
}
