/*!
 * Ollama client for the translation boundary.
 *
 * Sends one chat request per source text against the Ollama `/api/chat`
 * endpoint, strictly in order. There is no retry or backoff here: a
 * request failure or timeout surfaces immediately as a `ProviderError`
 * and fails the current batch.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use log::{debug, warn};
use url::Url;

use crate::errors::ProviderError;
use crate::translation::{Glossary, TranslationPromptBuilder};

use super::TranslationProvider;

/// Endpoint used when the configured one does not parse as a URL
const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Whether to stream the response
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

/// Ollama client for interacting with the Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model name used for every request
    model: String,
    /// HTTP client for making requests
    client: Client,
    /// Request timeout in seconds
    timeout_secs: u64,
}

impl Ollama {
    /// Create a new Ollama client for an endpoint and model.
    ///
    /// The endpoint may be given with or without a scheme; a bare
    /// host gets `http://` prepended.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Self {
        let endpoint = endpoint.into();
        let with_scheme = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint
        } else {
            format!("http://{}", endpoint)
        };
        let base_url = match Url::parse(&with_scheme) {
            Ok(url) => url.as_str().trim_end_matches('/').to_string(),
            Err(e) => {
                warn!(
                    "Malformed Ollama endpoint '{}' ({}), falling back to {}",
                    with_scheme, e, DEFAULT_ENDPOINT
                );
                DEFAULT_ENDPOINT.to_string()
            }
        };

        Self {
            base_url,
            model: model.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            timeout_secs,
        }
    }

    /// Send one chat request and return the assistant text
    async fn chat(&self, prompt: String) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        debug!("Ollama chat done={}", chat_response.done);
        Ok(clean_response_text(&chat_response.message.content))
    }
}

/// Strip whitespace and a single pair of wrapping quotes the model
/// sometimes adds around the translation
fn clean_response_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl TranslationProvider for Ollama {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
        glossary: Option<&Glossary>,
    ) -> Result<Vec<String>, ProviderError> {
        let mut builder = TranslationPromptBuilder::new(source_language, target_language);
        if let Some(glossary) = glossary {
            builder = builder.with_glossary(glossary.clone());
        }

        // One request per text, in order; the service is treated as a
        // single-concurrency resource
        let mut translations = Vec::with_capacity(texts.len());
        for text in texts {
            let translated = self.chat(builder.build(text)).await?;
            translations.push(translated);
        }
        Ok(translations)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError {
                status_code: response.status().as_u16(),
                message: "version endpoint returned an error".to_string(),
            })
        }
    }
}
