//! Configuration types for statement analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built via
//! its [`AnalysisConfigBuilder`]. Setters clamp numeric knobs into their valid
//! range; [`AnalysisConfigBuilder::build`] rejects the combinations that
//! cannot be clamped.

use crate::error::StatementError;
use crate::pipeline::extractor::TransactionExtractor;
use crate::progress::{AnalysisProgressCallback, ProgressCallback};
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Gemini model used when none is configured.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-pro-preview";

/// Default model for the edgequake-llm provider backend.
pub const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-mini";

/// Base URL of the Gemini REST API.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Configuration for a statement analysis.
///
/// # Example
/// ```rust
/// use edgequake_statements::{AnalysisConfig, ModelBackend};
///
/// let config = AnalysisConfig::builder()
///     .backend(ModelBackend::Gemini)
///     .model("gemini-2.5-pro")
///     .render_scale(2.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Zoom factor applied to each PDF page before rasterising. Range: 0.5–4.0. Default: 2.0.
    ///
    /// At 2.0 a US-letter page renders at roughly 1224 × 1584 px, enough for
    /// small statement print to stay legible to a vision model.
    pub render_scale: f32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 4000.
    ///
    /// Caps oversized pages (posters, long receipts) independently of the zoom.
    pub max_rendered_pixels: u32,

    /// JPEG quality for rasterised PDF pages. Range: 1–100. Default: 80.
    pub jpeg_quality: u8,

    /// Which model API receives the request. Default: [`ModelBackend::Gemini`].
    pub backend: ModelBackend,

    /// Model identifier. If None, uses the backend default.
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    /// Only used by [`ModelBackend::Provider`]; if None the provider is
    /// auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake-llm provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed extractor. Takes precedence over every backend setting.
    pub extractor: Option<Arc<dyn TransactionExtractor>>,

    /// Gemini API key. If None, read from `GEMINI_API_KEY`, then `API_KEY`.
    pub api_key: Option<String>,

    /// Gemini REST base URL. Default: [`DEFAULT_GEMINI_BASE_URL`].
    pub gemini_base_url: String,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 32768.
    ///
    /// A long statement can list several hundred transactions; a truncated
    /// reply is invalid JSON and fails the whole analysis.
    pub max_tokens: usize,

    /// PDF user password for encrypted statements.
    pub password: Option<String>,

    /// Custom extraction prompt. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Timeout for the single model call, in seconds. Default: 300.
    pub api_timeout_secs: u64,

    /// Optional status/progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            max_rendered_pixels: 4000,
            jpeg_quality: 80,
            backend: ModelBackend::default(),
            model: None,
            provider_name: None,
            provider: None,
            extractor: None,
            api_key: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.1,
            max_tokens: 32768,
            password: None,
            prompt: None,
            api_timeout_secs: 300,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("render_scale", &self.render_scale)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("extractor", &self.extractor.as_ref().map(|e| e.name()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_base_url", &self.gemini_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model identifier that will be used, after applying the backend default.
    pub fn effective_model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(m), _) => m,
            (None, ModelBackend::Gemini) => DEFAULT_GEMINI_MODEL,
            (None, ModelBackend::Provider) => DEFAULT_PROVIDER_MODEL,
        }
    }
}

/// Builder for [`AnalysisConfig`].
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl fmt::Debug for AnalysisConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl AnalysisConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale.clamp(0.5, 4.0);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn backend(mut self, backend: ModelBackend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TransactionExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn AnalysisProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, StatementError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(StatementError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(StatementError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if !(c.gemini_base_url.starts_with("http://") || c.gemini_base_url.starts_with("https://")) {
            return Err(StatementError::InvalidConfig(format!(
                "Gemini base URL must be http(s), got '{}'",
                c.gemini_base_url
            )));
        }
        if let Some(ref p) = c.prompt {
            if p.trim().is_empty() {
                return Err(StatementError::InvalidConfig("prompt must not be empty".into()));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Model API that receives the extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Google Gemini `generateContent` with a native response schema. (default)
    #[default]
    Gemini,
    /// Any vision provider supported by edgequake-llm; the schema is sent
    /// as part of the prompt.
    Provider,
}

impl fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelBackend::Gemini => f.write_str("gemini"),
            ModelBackend::Provider => f.write_str("provider"),
        }
    }
}
