//! Analysis entry points.
//!
//! One analysis is a strictly sequential chain: resolve the model backend,
//! convert every file to image parts, send one request, parse one reply.
//! Any failure aborts the chain and is returned as a single
//! [`StatementError`]; the progress callback sees `Error` with the same
//! display string.

use crate::config::{AnalysisConfig, ModelBackend};
use crate::error::StatementError;
use crate::output::{AnalysisResult, AnalysisStats};
use crate::pipeline::encode::{self, ImagePart};
use crate::pipeline::extractor::TransactionExtractor;
use crate::pipeline::gemini::GeminiExtractor;
use crate::pipeline::intake::{self, FileKind, StatementFile};
use crate::pipeline::provider::ProviderExtractor;
use crate::pipeline::{normalize, render, request};
use crate::progress::ProcessingStatus;
use crate::report::csv::export_csv;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Analyze statement files on disk.
///
/// Unsupported files (neither PDF nor image) are skipped; a missing or
/// unreadable file fails the analysis.
///
/// # Example
/// ```rust,no_run
/// use edgequake_statements::{analyze, AnalysisConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Reads GEMINI_API_KEY (or API_KEY) from the environment
/// let config = AnalysisConfig::default();
/// let result = analyze(&["march.pdf"], &config).await?;
/// println!("net flow: {:.2}", result.summary.net);
/// # Ok(())
/// # }
/// ```
pub async fn analyze<P: AsRef<Path>>(
    paths: &[P],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    let outcome = analyze_paths(paths, config).await;
    finish(config, outcome)
}

/// Analyze statement files already held in memory.
pub async fn analyze_files(
    files: Vec<StatementFile>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    let outcome = match resolve_extractor(config) {
        Ok(extractor) => {
            set_status(config, ProcessingStatus::Converting);
            run(extractor, files, 0, config).await
        }
        Err(e) => Err(e),
    };
    finish(config, outcome)
}

/// Synchronous wrapper around [`analyze`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync<P: AsRef<Path>>(
    paths: &[P],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StatementError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze(paths, config))
}

/// Analyze and write every transaction to a CSV file.
///
/// The file is written atomically (temp file + rename).
pub async fn analyze_to_csv<P: AsRef<Path>>(
    paths: &[P],
    csv_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    let result = analyze(paths, config).await?;
    export_csv(csv_path.as_ref(), &result.transactions)?;
    Ok(result)
}

/// Pick the extractor, from most-specific to least-specific:
///
/// 1. **Pre-built extractor** (`config.extractor`)
/// 2. **Gemini** — REST client keyed from config or environment
/// 3. **Provider** — edgequake-llm provider resolution
pub fn resolve_extractor(
    config: &AnalysisConfig,
) -> Result<Arc<dyn TransactionExtractor>, StatementError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    match config.backend {
        ModelBackend::Gemini => Ok(Arc::new(GeminiExtractor::from_config(config)?)),
        ModelBackend::Provider => Ok(Arc::new(ProviderExtractor::from_config(config)?)),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn analyze_paths<P: AsRef<Path>>(
    paths: &[P],
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    let extractor = resolve_extractor(config)?;
    set_status(config, ProcessingStatus::Converting);
    let loaded = intake::load_files(paths).await?;
    for name in &loaded.skipped {
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_skipped(name);
        }
    }
    run(extractor, loaded.files, loaded.skipped.len(), config).await
}

fn set_status(config: &AnalysisConfig, status: ProcessingStatus) {
    debug!("Status → {}", status);
    if let Some(ref cb) = config.progress_callback {
        cb.on_status(status);
    }
}

/// Report the terminal status for an outcome and pass it through.
fn finish(
    config: &AnalysisConfig,
    outcome: Result<AnalysisResult, StatementError>,
) -> Result<AnalysisResult, StatementError> {
    match &outcome {
        Ok(_) => set_status(config, ProcessingStatus::Complete),
        Err(e) => {
            match e.detail() {
                Some(detail) => error!("Analysis failed: {} ({})", e, detail),
                None => error!("Analysis failed: {}", e),
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_error(&e.to_string());
            }
            set_status(config, ProcessingStatus::Error);
        }
    }
    outcome
}

async fn run(
    extractor: Arc<dyn TransactionExtractor>,
    files: Vec<StatementFile>,
    files_skipped: usize,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, StatementError> {
    let total_start = Instant::now();
    let mut stats = AnalysisStats {
        files_skipped,
        model: extractor.name(),
        ..Default::default()
    };

    // ── Step 1: Convert files to image parts ─────────────────────────────
    let convert_start = Instant::now();
    let parts = convert_files(files, config, &mut stats).await?;
    stats.convert_duration_ms = convert_start.elapsed().as_millis() as u64;
    stats.image_parts = parts.len();
    info!(
        "Converted {} files into {} image parts in {}ms",
        stats.files_accepted, stats.image_parts, stats.convert_duration_ms
    );

    // ── Step 2: Build the request ────────────────────────────────────────
    let request = request::build_request(parts, config)?;

    // ── Step 3: One model call ───────────────────────────────────────────
    set_status(config, ProcessingStatus::Analyzing);
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_start(request.parts.len());
    }
    let model_start = Instant::now();
    let reply = extractor.extract(&request).await?;
    stats.model_duration_ms = model_start.elapsed().as_millis() as u64;
    stats.input_tokens = reply.input_tokens;
    stats.output_tokens = reply.output_tokens;

    // ── Step 4: Normalise ────────────────────────────────────────────────
    let transactions = normalize::parse_transactions(&reply.text)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(transactions.len());
    }

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Analysis complete: {} transactions, {}ms total",
        transactions.len(),
        stats.total_duration_ms
    );

    Ok(AnalysisResult::new(transactions, stats))
}

/// Convert files in order: PDFs page by page, images as-is.
async fn convert_files(
    files: Vec<StatementFile>,
    config: &AnalysisConfig,
    stats: &mut AnalysisStats,
) -> Result<Vec<ImagePart>, StatementError> {
    let mut parts = Vec::new();

    for file in files {
        let produced = match file.kind {
            FileKind::Pdf => {
                let pages = render::render_pdf(&file.name, file.bytes, config).await?;
                stats.pages_rendered += pages.len();
                let mut encoded = Vec::with_capacity(pages.len());
                for (idx, page) in pages.iter().enumerate() {
                    let part = encode::encode_page(page, config.jpeg_quality).map_err(|e| {
                        StatementError::EncodingFailed {
                            name: file.name.clone(),
                            page: idx + 1,
                            detail: e.to_string(),
                        }
                    })?;
                    encoded.push(part);
                }
                encoded
            }
            FileKind::Image => vec![encode::encode_passthrough(&file)],
        };

        debug!("{}: {} image parts", file.name, produced.len());
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_converted(&file.name, produced.len());
        }
        stats.files_accepted += 1;
        parts.extend(produced);
    }

    Ok(parts)
}
