//! Generative-service client shared by extraction, Q&A and the VLM OCR backend.
//!
//! A [`Generator`] is a resolved provider plus the sampling options from the
//! config. Calls are single-shot: a failed call surfaces as
//! [`DashboardError::LlmApiError`] and the route turns it into a notice.

use crate::config::{DashboardConfig, DEFAULT_PROVIDER};
use crate::error::DashboardError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A ready-to-call generative provider.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("provider", &"<dyn LLMProvider>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Generator {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DashboardConfig) -> Self {
        Self {
            provider,
            model: config.model_or_default().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Resolve the provider, from most-specific to least-specific.
    ///
    /// 1. **Pre-built provider** (`config.provider`), used as-is.
    /// 2. **Named provider** (`config.provider_name`) with the configured
    ///    model; the factory reads that provider's API key variable.
    /// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
    /// 4. **Default**: Gemini with the configured model, which needs
    ///    `GEMINI_API_KEY`.
    pub fn resolve(config: &DashboardConfig) -> Result<Self, DashboardError> {
        if let Some(ref provider) = config.provider {
            return Ok(Self::new(Arc::clone(provider), config));
        }

        if let Some(ref name) = config.provider_name {
            let provider = create_provider(name, config.model_or_default())?;
            return Ok(Self::new(provider, config));
        }

        if let (Ok(prov), Ok(model)) = (
            std::env::var("EDGEQUAKE_LLM_PROVIDER"),
            std::env::var("EDGEQUAKE_MODEL"),
        ) {
            if !prov.is_empty() && !model.is_empty() {
                let provider = create_provider(&prov, &model)?;
                let mut generator = Self::new(provider, config);
                generator.model = model;
                return Ok(generator);
            }
        }

        let key_set = std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty());
        if !key_set {
            return Err(DashboardError::NotConfigured {
                service: DEFAULT_PROVIDER.to_string(),
                hint: "GEMINI_API_KEY is not set. Set it, pick another provider with \
--provider, or run with USE_MOCK=1."
                    .to_string(),
            });
        }
        let provider = create_provider(DEFAULT_PROVIDER, config.model_or_default())?;
        Ok(Self::new(provider, config))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one text prompt and return the raw response text.
    pub async fn complete(&self, prompt: &str) -> Result<String, DashboardError> {
        let messages = vec![ChatMessage::user(prompt)];
        self.chat(&messages, "completion").await
    }

    /// Ask the model to transcribe one page image under `system_prompt`.
    pub async fn transcribe(
        &self,
        system_prompt: &str,
        image: ImageData,
    ) -> Result<String, DashboardError> {
        // The image carries the content; the empty user text only opens a turn.
        let messages = vec![
            ChatMessage::system(system_prompt),
            ChatMessage::user_with_images("", vec![image]),
        ];
        self.chat(&messages, "transcription").await
    }

    async fn chat(&self, messages: &[ChatMessage], label: &str) -> Result<String, DashboardError> {
        let start = Instant::now();
        let options = build_options(self.temperature, self.max_tokens);
        let response = self
            .provider
            .chat(messages, Some(&options))
            .await
            .map_err(|e| DashboardError::LlmApiError {
                message: e.to_string(),
            })?;

        debug!(
            "{} via {}: {} input tokens, {} output tokens, {:?}",
            label,
            self.model,
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` from the configured sampling knobs.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, DashboardError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        DashboardError::NotConfigured {
            service: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_carries_sampling_knobs() {
        let opts = build_options(0.4, 1024);
        assert_eq!(opts.temperature, Some(0.4));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn build_options_defaults_from_config() {
        let config = DashboardConfig::default();
        let opts = build_options(config.temperature, config.max_tokens);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
