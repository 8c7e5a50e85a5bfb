use std::sync::Arc;
use log::{debug, info};

use crate::app_config::GenerationConfig;
use crate::errors::GenerationError;
use crate::providers::{self, CompletionRequest, Provider};

// @module: Narration script writing through an LLM provider

/// Turns a topic into a long-form narration script
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    // @field: Backend doing the writing
    provider: Arc<dyn Provider>,

    // @field: Model requested from the backend
    model: String,

    // @field: Fixed narration instruction
    system_prompt: String,

    // @field: Sampling temperature
    temperature: f32,

    // @field: Token limit
    max_tokens: u32,
}

impl ScriptGenerator {
    /// Build the generator for the configured provider
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::with_provider(providers::from_config(config), config)
    }

    /// Build a generator around an existing provider
    pub fn with_provider(provider: Arc<dyn Provider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            model: config.get_model(),
            system_prompt: config.common.system_prompt.clone(),
            temperature: config.common.temperature,
            max_tokens: config.common.max_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check the provider answers before asking for a whole script
    pub async fn test_connection(&self) -> Result<(), GenerationError> {
        debug!("Testing connection to {} ({})", self.provider.name(), self.model);
        self.provider
            .test_connection(&self.model)
            .await
            .map_err(|source| GenerationError::Provider {
                provider: self.provider.name().to_string(),
                source,
            })
    }

    /// Write a script about `topic`
    ///
    /// One request per call; the reply is returned trimmed.
    pub async fn generate(&self, topic: &str) -> Result<String, GenerationError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        info!("Generating script with {} ({})", self.provider.name(), self.model);
        let request = CompletionRequest::new(&self.model, topic)
            .system(&self.system_prompt)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);

        let text = self
            .provider
            .complete(request)
            .await
            .map_err(|source| GenerationError::Provider {
                provider: self.provider.name().to_string(),
                source,
            })?;

        let script = text.trim();
        if script.is_empty() {
            return Err(GenerationError::EmptyResponse {
                provider: self.provider.name().to_string(),
            });
        }

        debug!("Script has {} word(s)", script.split_whitespace().count());
        Ok(script.to_string())
    }
}
