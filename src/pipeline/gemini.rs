//! Google Gemini backend: `generateContent` with a native response schema.
//!
//! Gemini can constrain its output to a JSON schema server-side
//! (`responseMimeType` + `responseSchema`), so this backend sends the schema
//! as configuration rather than as prompt text. Images travel as
//! `inlineData` parts ahead of the instruction text.

use crate::config::AnalysisConfig;
use crate::error::StatementError;
use crate::pipeline::extractor::{ExtractionReply, TransactionExtractor};
use crate::pipeline::request::ExtractionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variables searched for the Gemini credential, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
    #[serde(default)]
    details: Vec<Value>,
}

// ── Extractor ────────────────────────────────────────────────────────────

/// Gemini REST client for one model.
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

impl GeminiExtractor {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, StatementError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StatementError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    /// Build from the analysis config, reading the credential from the
    /// environment when the config does not carry one.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, StatementError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        Self::new(
            api_key,
            config.effective_model(),
            config.gemini_base_url.clone(),
            config.api_timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TransactionExtractor for GeminiExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionReply, StatementError> {
        let body = build_body(request);
        info!(
            "Sending {} image parts to gemini/{}",
            request.parts.len(),
            self.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StatementError::ApiTimeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    StatementError::LlmApiError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, retry_after));
        }

        let data: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| StatementError::LlmApiError {
                    message: format!("Unreadable Gemini response: {e}"),
                })?;

        reply_from_response(data, &self.model)
    }

    fn name(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

/// Find the API key: explicit value first, then the environment.
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String, StatementError> {
    if let Some(key) = explicit.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }
    for var in API_KEY_ENV_VARS {
        if let Ok(key) = std::env::var(var) {
            if !key.is_empty() {
                debug!("Using Gemini credential from {}", var);
                return Ok(key);
            }
        }
    }
    Err(StatementError::ProviderNotConfigured {
        provider: "gemini".to_string(),
        hint: "API key is missing in environment variables.\n\
Set GEMINI_API_KEY (or API_KEY) to a Google AI Studio key."
            .to_string(),
    })
}

/// Translate an [`ExtractionRequest`] into the Gemini wire format.
pub(crate) fn build_body(request: &ExtractionRequest) -> GenerateContentRequest {
    let mut parts: Vec<Part> = request
        .parts
        .iter()
        .map(|p| Part::InlineData {
            inline_data: InlineData {
                mime_type: p.mime_type.clone(),
                data: p.data.clone(),
            },
        })
        .collect();
    parts.push(Part::Text {
        text: request.prompt.clone(),
    });

    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
            response_mime_type: "application/json".to_string(),
            response_schema: request.schema.clone(),
        },
    }
}

/// Extract the candidate text and token usage.
pub(crate) fn reply_from_response(
    data: GenerateContentResponse,
    model: &str,
) -> Result<ExtractionReply, StatementError> {
    if let Some(reason) = data.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(StatementError::LlmApiError {
            message: format!("Request blocked by Gemini: {reason}"),
        });
    }

    let (input_tokens, output_tokens) = data
        .usage_metadata
        .map(|u| {
            (
                u.prompt_token_count.unwrap_or(0),
                u.candidates_token_count.unwrap_or(0),
            )
        })
        .unwrap_or((0, 0));

    let candidate = data.candidates.and_then(|c| c.into_iter().next());
    if let Some(reason) = candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
        if reason != "STOP" {
            warn!("Gemini finished with reason {}; output may be truncated", reason);
        }
    }

    let text: String = candidate
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(StatementError::EmptyResponse {
            model: model.to_string(),
        });
    }

    debug!(
        "Gemini reply: {} chars, {} input tokens, {} output tokens",
        text.len(),
        input_tokens,
        output_tokens
    );

    Ok(ExtractionReply {
        text,
        input_tokens,
        output_tokens,
    })
}

/// Map a non-success HTTP status onto a [`StatementError`].
///
/// `retry_after` is the `Retry-After` header in seconds; without it a 429
/// falls back to the `google.rpc.RetryInfo` detail (`"retryDelay": "32s"`).
fn parse_error(status: u16, body: &str, retry_after: Option<u64>) -> StatementError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let retry_delay = envelope.as_ref().and_then(|env| retry_delay(&env.error.details));

    let message = envelope
        .map(|env| {
            let msg = env.error.message.unwrap_or_default();
            match env.error.status {
                Some(s) if !s.is_empty() => format!("{s}: {msg}"),
                _ => msg,
            }
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            let snippet: String = body.chars().take(200).collect();
            format!("HTTP {status}: {snippet}")
        });

    match status {
        401 | 403 => StatementError::AuthError {
            provider: "gemini".to_string(),
            detail: message,
        },
        429 => StatementError::RateLimitExceeded {
            provider: "gemini".to_string(),
            retry_after_secs: retry_after.or(retry_delay),
        },
        _ => StatementError::LlmApiError { message },
    }
}

/// Whole seconds from a `RetryInfo` detail, rounded up.
fn retry_delay(details: &[Value]) -> Option<u64> {
    details
        .iter()
        .filter(|d| {
            d.get("@type")
                .and_then(Value::as_str)
                .is_some_and(|t| t.ends_with("google.rpc.RetryInfo"))
        })
        .find_map(|d| d.get("retryDelay").and_then(Value::as_str))
        .and_then(|delay| delay.strip_suffix('s'))
        .and_then(|secs| secs.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.ceil() as u64)
}
