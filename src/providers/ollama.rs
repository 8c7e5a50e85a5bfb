use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use log::{error, warn};

use crate::errors::ProviderError;
use crate::providers::{http_client, transport_error, CompletionRequest, Provider};

/// Client for a local Ollama server
#[derive(Debug)]
pub struct Ollama {
    /// Server root, e.g. http://localhost:11434
    base_url: String,
    /// HTTP client for API requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// /api/generate request body
#[derive(Debug, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

/// Sampling options
#[derive(Debug, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum number of tokens to predict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
}

/// /api/generate response body
#[derive(Debug, Deserialize)]
pub struct GenerationResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// /api/version response body
#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            stream: false,
            options: None,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the sampling options
    pub fn options(mut self, temperature: f32, num_predict: u32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
            num_predict: Some(num_predict),
        });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client from a complete URL
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout),
            max_retries: 2,
            backoff_base_ms: 1000,
        }
    }

    /// Generate text from the Ollama API with retry logic
    ///
    /// Network and server errors are retried with exponential backoff;
    /// client errors fail immediately.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut attempt = 0;
        loop {
            let error = match self.client.post(&url).json(request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<GenerationResponse>()
                            .await
                            .map_err(|e| ProviderError::ParseError(e.to_string()));
                    }

                    let error_text = response.text().await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    error!("Ollama API error ({}): {}", status, error_text);
                    let error = ProviderError::from_status(status.as_u16(), error_text);
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(e) => transport_error(e),
            };

            attempt += 1;
            if attempt > self.max_retries {
                return Err(error);
            }

            let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1));
            warn!("Ollama request failed ({}), retry {}/{} in {} ms", error, attempt, self.max_retries, backoff_ms);
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
        }
    }

    /// Get the version of the Ollama server
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);

        let response = self.client.get(&url).send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let version = response
            .json::<VersionResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(version.version)
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut body = GenerationRequest::new(request.model, request.prompt)
            .options(request.temperature, request.max_tokens);
        if !request.system.is_empty() {
            body = body.system(request.system);
        }

        let response = self.generate(&body).await?;
        Ok(response.response)
    }

    async fn test_connection(&self, _model: &str) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }
}
