//! Request construction: every image plus one prompt and one schema.
//!
//! The whole statement goes out as a single request so the model sees all
//! pages together and can carry year and account context from the header
//! page to the rows on later pages.

use crate::config::AnalysisConfig;
use crate::error::StatementError;
use crate::pipeline::encode::ImagePart;
use crate::prompts::{response_schema, EXTRACTION_PROMPT};
use serde_json::Value;

/// A backend-neutral extraction request.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Images in upload order, PDF pages in page order.
    pub parts: Vec<ImagePart>,
    /// Natural-language instruction, sent after the images.
    pub prompt: String,
    /// JSON schema the reply must conform to.
    pub schema: Value,
    pub temperature: f32,
    pub max_tokens: usize,
}

/// Package the image parts with the configured prompt and the fixed schema.
pub fn build_request(
    parts: Vec<ImagePart>,
    config: &AnalysisConfig,
) -> Result<ExtractionRequest, StatementError> {
    if parts.is_empty() {
        return Err(StatementError::NoImageData);
    }
    Ok(ExtractionRequest {
        parts,
        prompt: config
            .prompt
            .clone()
            .unwrap_or_else(|| EXTRACTION_PROMPT.to_string()),
        schema: response_schema(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    })
}
