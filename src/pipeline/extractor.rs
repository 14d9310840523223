//! The seam between the pipeline and a model API.
//!
//! [`TransactionExtractor`] takes a fully built [`ExtractionRequest`] and
//! returns the model's raw text. Parsing that text is not the extractor's
//! job: every backend's reply goes through the same
//! [`crate::pipeline::normalize`] rules.

use crate::error::StatementError;
use crate::pipeline::request::ExtractionRequest;
use async_trait::async_trait;

/// Raw reply from a model call.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReply {
    /// The model's text output, expected to be a JSON object.
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Sends one extraction request to a model and returns its reply.
///
/// Implementations make exactly one call; a failure is returned as-is.
#[async_trait]
pub trait TransactionExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionReply, StatementError>;

    /// `backend/model` label for logs and stats.
    fn name(&self) -> String;
}
