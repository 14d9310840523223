//! edgequake-llm backend: any vision provider (OpenAI, Anthropic, Ollama, …).
//!
//! These providers have no uniform switch for schema-constrained output, so
//! the schema is written into the system prompt and the reply goes through
//! the same normaliser as Gemini's (which also strips stray code fences).
//!
//! ## Message Layout
//!
//! 1. **System message** — extraction prompt plus the pretty-printed schema
//! 2. **User message** — every statement image as an attachment, with a short
//!    instruction text

use crate::config::AnalysisConfig;
use crate::error::StatementError;
use crate::pipeline::extractor::{ExtractionReply, TransactionExtractor};
use crate::pipeline::request::ExtractionRequest;
use crate::prompts::schema_system_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Text of the user turn that carries the images.
const USER_INSTRUCTION: &str = "Extract every transaction from these bank statement pages.";

/// Wraps an edgequake-llm provider as a [`TransactionExtractor`].
pub struct ProviderExtractor {
    provider: Arc<dyn LLMProvider>,
    label: String,
    timeout_secs: u64,
}

impl ProviderExtractor {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            provider,
            label: label.into(),
            timeout_secs,
        }
    }

    /// Wrap a provider, labelled with the provider's own name and model.
    pub fn from_provider(provider: Arc<dyn LLMProvider>, timeout_secs: u64) -> Self {
        let label = provider_label(provider.as_ref());
        Self::new(provider, label, timeout_secs)
    }

    /// Resolve the provider, from most-specific to least-specific:
    ///
    /// 1. **Pre-built provider** (`config.provider`)
    /// 2. **Named provider + model** (`config.provider_name`), API key read by
    ///    [`ProviderFactory::create_llm_provider`] from the provider's own
    ///    environment variable
    /// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`)
    /// 4. **OpenAI** when `OPENAI_API_KEY` is set, with the configured model
    /// 5. **Full auto-detection** (`ProviderFactory::from_env`)
    ///
    /// The label recorded in the stats always names the model the provider
    /// actually runs, which for step 5 is the factory's choice.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, StatementError> {
        let model = config.effective_model();
        let timeout = config.api_timeout_secs;

        if let Some(ref provider) = config.provider {
            return Ok(Self::from_provider(Arc::clone(provider), timeout));
        }

        if let Some(ref name) = config.provider_name {
            return Ok(Self::from_provider(create_named(name, model)?, timeout));
        }

        if let Some((name, env_model)) = env_pair(
            std::env::var(PROVIDER_ENV).ok(),
            std::env::var(MODEL_ENV).ok(),
        ) {
            debug!("Using {}={} / {}={}", PROVIDER_ENV, name, MODEL_ENV, env_model);
            return Ok(Self::from_provider(create_named(&name, &env_model)?, timeout));
        }

        if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
            return Ok(Self::from_provider(create_named("openai", model)?, timeout));
        }

        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| StatementError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        if config.model.is_some() && provider.model() != model {
            warn!(
                "Auto-detected provider {} runs {}; requested model {} is not used",
                provider.name(),
                provider.model(),
                model
            );
        }
        Ok(Self::from_provider(provider, timeout))
    }
}

/// Environment variable naming the provider for auto-resolution.
pub const PROVIDER_ENV: &str = "EDGEQUAKE_LLM_PROVIDER";
/// Environment variable naming the model, used together with [`PROVIDER_ENV`].
pub const MODEL_ENV: &str = "EDGEQUAKE_MODEL";

/// Both variables must be set and non-empty.
fn env_pair(provider: Option<String>, model: Option<String>) -> Option<(String, String)> {
    match (provider, model) {
        (Some(p), Some(m)) if !p.is_empty() && !m.is_empty() => Some((p, m)),
        _ => None,
    }
}

fn create_named(name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StatementError> {
    ProviderFactory::create_llm_provider(name, model).map_err(|e| {
        StatementError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn provider_label(provider: &dyn LLMProvider) -> String {
    format!("{}/{}", provider.name(), provider.model())
}

/// Build the chat messages for a request.
pub(crate) fn build_messages(request: &ExtractionRequest) -> Vec<ChatMessage> {
    let images: Vec<ImageData> = request
        .parts
        .iter()
        .map(|p| ImageData::new(p.data.clone(), p.mime_type.clone()).with_detail("high"))
        .collect();

    vec![
        ChatMessage::system(schema_system_prompt(&request.prompt, &request.schema)),
        ChatMessage::user_with_images(USER_INSTRUCTION, images),
    ]
}

#[async_trait]
impl TransactionExtractor for ProviderExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionReply, StatementError> {
        let messages = build_messages(request);
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        info!(
            "Sending {} image parts to {}",
            request.parts.len(),
            self.label
        );

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| StatementError::ApiTimeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| StatementError::LlmApiError {
                message: format!("{e}"),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(StatementError::EmptyResponse {
                model: self.label.clone(),
            });
        }

        Ok(ExtractionReply {
            text: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }

    fn name(&self) -> String {
        self.label.clone()
    }
}
