//! Error type for the edgequake-statements library.
//!
//! Every failure in the pipeline is fatal: a missing credential, an unreadable
//! page, a network failure or a malformed model reply all abort the whole
//! analysis and surface as one [`StatementError`]. There is no page-level
//! error type because a statement with a missing page would silently drop
//! transactions and skew every total derived from it.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-statements library.
#[derive(Debug, Error)]
pub enum StatementError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Statement file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// None of the supplied files produced any image data.
    #[error("No valid image data could be extracted.")]
    NoImageData,

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for '{name}' page {page}: {detail}")]
    RasterisationFailed {
        name: String,
        page: usize,
        detail: String,
    },

    /// A rendered page could not be encoded as JPEG.
    #[error("Image encoding failed for '{name}' page {page}: {detail}")]
    EncodingFailed {
        name: String,
        page: usize,
        detail: String,
    },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model backend is not initialised (missing API key etc.).
    #[error("Model provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model API returned an error.
    #[error("Model API error: {message}")]
    LlmApiError { message: String },

    /// The model API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'{}", retry_hint(*retry_after_secs))]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// The model API call did not finish within the configured timeout.
    #[error("Model call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The model API rejected the credential (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The model answered with no text at all.
    #[error("No response from model '{model}'")]
    EmptyResponse { model: String },

    /// The model reply is not the JSON shape that was requested.
    #[error("Failed to parse the analysis results.")]
    MalformedResponse { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the CSV export.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialisation or parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF statements need the pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Or place libpdfium next to the working directory.\n\
  • Image statements (PNG, JPEG, …) work without pdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn retry_hint(retry_after_secs: Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!("; retry after {secs}s"),
        None => String::new(),
    }
}

impl StatementError {
    /// Detail text for errors whose display string is deliberately generic.
    ///
    /// [`StatementError::MalformedResponse`] shows one fixed message to the
    /// user; the parser's reason is only useful in debug logs.
    pub fn detail(&self) -> Option<&str> {
        match self {
            StatementError::MalformedResponse { detail } => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_response_shows_generic_message() {
        let e = StatementError::MalformedResponse {
            detail: "expected value at line 1 column 1".into(),
        };
        assert_eq!(e.to_string(), "Failed to parse the analysis results.");
        assert_eq!(e.detail(), Some("expected value at line 1 column 1"));
    }

    #[test]
    fn no_image_data_display() {
        assert_eq!(
            StatementError::NoImageData.to_string(),
            "No valid image data could be extracted."
        );
    }

    #[test]
    fn rasterisation_display_names_file_and_page() {
        let e = StatementError::RasterisationFailed {
            name: "march.pdf".into(),
            page: 3,
            detail: "bad stream".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("march.pdf"), "got: {msg}");
        assert!(msg.contains("page 3"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display() {
        let e = StatementError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: None,
        };
        assert!(e.to_string().contains("gemini"));
        assert_eq!(e.detail(), None);

        let e = StatementError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: Some(32),
        };
        assert!(e.to_string().ends_with("retry after 32s"), "got: {e}");
    }

    #[test]
    fn auth_error_display() {
        let e = StatementError::AuthError {
            provider: "gemini".into(),
            detail: "API key not valid".into(),
        };
        assert!(e.to_string().contains("API key not valid"));
    }
}
