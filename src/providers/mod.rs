/*!
 * Provider implementations for the script writing services.
 *
 * This module contains client implementations for various LLM providers:
 * - Gemini: Google Generative Language API (default)
 * - Ollama: Local LLM server
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{GenerationConfig, GenerationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod gemini;
pub mod mock;
pub mod ollama;

/// Provider-neutral text completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name
    pub model: String,
    /// Instruction that frames every answer
    pub system: String,
    /// The user prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: String::new(),
            prompt: prompt.into(),
            temperature: 0.8,
            max_tokens: 8192,
        }
    }

    /// Set the system instruction
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the token limit
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the script generator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Display name used in messages
    fn name(&self) -> &str;

    /// Complete a request and return the generated text
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The generated text or an error
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the connection is successful, or an error
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError>;
}

/// Build the HTTP client used by provider implementations
pub(crate) fn http_client(timeout: Option<Duration>) -> reqwest::Client {
    let builder = reqwest::Client::builder().pool_idle_timeout(Duration::from_secs(90));
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    builder.build().unwrap_or_default()
}

/// Map a transport failure to a provider error
pub(crate) fn transport_error(error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Create the provider configured as active
pub fn from_config(config: &GenerationConfig) -> Arc<dyn Provider> {
    let timeout = config.get_timeout_secs().map(Duration::from_secs);
    let endpoint = config.get_endpoint();

    match config.provider {
        GenerationProvider::Gemini => Arc::new(gemini::Gemini::new(config.get_api_key(), endpoint, timeout)),
        GenerationProvider::Ollama => Arc::new(ollama::Ollama::new(endpoint, timeout)),
        GenerationProvider::Anthropic => {
            Arc::new(anthropic::Anthropic::new(config.get_api_key(), endpoint, timeout))
        }
    }
}
