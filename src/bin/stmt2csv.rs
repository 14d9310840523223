//! CLI binary for edgequake-statements.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig`, runs one analysis and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_statements::report::csv::{default_export_name, export_csv};
use edgequake_statements::report::format::{format_currency, render_summary, render_table};
use edgequake_statements::{
    analyze, AnalysisConfig, AnalysisProgressCallback, AnalysisResult, ChartSeries, ModelBackend,
    ProcessingStatus, ProgressCallback, TableView, TypeFilter,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per converted file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self::with_bar(bar))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_status(&self, status: ProcessingStatus) {
        match status {
            ProcessingStatus::Converting => {
                self.bar.set_prefix("Converting");
                self.bar.set_message("Reading files…");
            }
            ProcessingStatus::Analyzing => self.bar.set_prefix("Analyzing"),
            _ if !status.is_busy() => self.bar.finish_and_clear(),
            _ => {}
        }
    }

    fn on_file_converted(&self, name: &str, image_parts: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            name,
            dim(&format!("{image_parts} image(s)"))
        ));
    }

    fn on_file_skipped(&self, name: &str) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            dim("–"),
            name,
            dim("skipped (not a PDF or image)")
        ));
    }

    fn on_analysis_start(&self, image_parts: usize) {
        self.bar
            .set_message(format!("Sending {image_parts} image(s) to the model…"));
    }

    fn on_analysis_complete(&self, transactions: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("{transactions} transactions extracted"))
        ));
    }

    // main reports the error itself; only the spinner goes away here.
    fn on_error(&self, _message: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze one statement and print the summary and table
  stmt2csv march.pdf

  # Several files in one request (PDFs and photos can be mixed)
  stmt2csv page1.jpg page2.jpg april.pdf

  # Export the full table to CSV
  stmt2csv march.pdf --csv march.csv

  # Export only debits mentioning "amazon" into a directory
  # (file name defaults to statement_analysis_YYYY-MM-DD.csv)
  stmt2csv march.pdf --filter debit --search amazon --csv exports/

  # Use an edgequake-llm provider instead of Gemini
  stmt2csv --backend provider --provider openai --model gpt-4.1 march.pdf

  # Machine-readable output with chart series
  stmt2csv --json march.pdf > march.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (gemini backend)
  API_KEY                 Fallback for GEMINI_API_KEY
  OPENAI_API_KEY          OpenAI API key (provider backend)
  ANTHROPIC_API_KEY       Anthropic API key (provider backend)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. edgequake_statements=debug
"#;

/// Extract bank-statement transactions from PDFs and images using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "stmt2csv",
    version,
    about = "Extract bank-statement transactions from PDFs and images using Vision LLMs",
    long_about = "Rasterise bank statements (PDF or image), send every page to a vision model \
in a single request, and print a summary plus the extracted transactions. The table can be \
filtered, searched and exported to CSV.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Statement files: PDFs and images. Other files are skipped.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the (filtered) table to this CSV file or directory.
    #[arg(long, env = "STMT2CSV_CSV")]
    csv: Option<PathBuf>,

    /// Output structured JSON (result, chart series, filtered view) instead of text.
    #[arg(long, env = "STMT2CSV_JSON")]
    json: bool,

    /// Case-insensitive search over description and notes.
    #[arg(short, long, env = "STMT2CSV_SEARCH", default_value = "")]
    search: String,

    /// Type filter: all, credit, debit.
    #[arg(short, long, env = "STMT2CSV_FILTER", default_value = "all")]
    filter: TypeFilter,

    /// Model backend: gemini (REST, schema-constrained) or provider (edgequake-llm).
    #[arg(long, env = "STMT2CSV_BACKEND", value_enum, default_value = "gemini")]
    backend: BackendArg,

    /// Model ID (default: gemini-3-pro-preview / gpt-4.1-mini).
    #[arg(long, env = "STMT2CSV_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider name: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "STMT2CSV_PROVIDER")]
    provider: Option<String>,

    /// PDF render scale (0.5–4.0).
    #[arg(long, env = "STMT2CSV_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality for rendered pages (1–100).
    #[arg(long, env = "STMT2CSV_JPEG_QUALITY", default_value_t = 80,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// PDF user password for encrypted statements.
    #[arg(long, env = "STMT2CSV_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "STMT2CSV_PROMPT")]
    prompt: Option<PathBuf>,

    /// Max model output tokens.
    #[arg(long, env = "STMT2CSV_MAX_TOKENS", default_value_t = 32768)]
    max_tokens: usize,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "STMT2CSV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "STMT2CSV_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "STMT2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STMT2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the requested result.
    #[arg(short, long, env = "STMT2CSV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum BackendArg {
    Gemini,
    Provider,
}

impl From<BackendArg> for ModelBackend {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Gemini => ModelBackend::Gemini,
            BackendArg::Provider => ModelBackend::Provider,
        }
    }
}

/// JSON document printed by `--json`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    #[serde(flatten)]
    result: &'a AnalysisResult,
    charts: ChartSeries,
    view: JsonView<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonView<'a> {
    filter: TypeFilter,
    search: &'a str,
    count: usize,
    income: f64,
    spending: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the spinner; keep them for --no-progress.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = analyze(&cli.inputs, &config)
        .await
        .context("Analysis failed")?;

    let view = TableView::new(&result.transactions, cli.filter, &cli.search);

    if cli.json {
        let report = JsonReport {
            result: &result,
            charts: ChartSeries::from_transactions(&result.transactions),
            view: JsonView {
                filter: cli.filter,
                search: &cli.search,
                count: view.count,
                income: view.income,
                spending: view.spending,
            },
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else {
        println!("{}", render_summary(&result.summary));
        print!("{}", render_table(&view));
    }

    // ── CSV export (filtered view) ───────────────────────────────────────
    if let Some(ref target) = cli.csv {
        let path = resolve_csv_path(target);
        export_csv(&path, &view.to_owned_rows())
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{}  {} rows  →  {}",
                green("✔"),
                view.count,
                bold(&path.display().to_string())
            );
        }
    }

    if !cli.quiet && !cli.json {
        let stats = &result.stats;
        eprintln!(
            "   {}  {} file(s), {} image part(s)  {} tokens in / {} tokens out  {}ms total",
            dim(&stats.model),
            stats.files_accepted,
            stats.image_parts,
            dim(&stats.input_tokens.to_string()),
            dim(&stats.output_tokens.to_string()),
            stats.total_duration_ms,
        );
        if view.count != result.transactions.len() {
            eprintln!(
                "   showing {}/{} transactions ({} in, {} out)",
                view.count,
                result.transactions.len(),
                format_currency(view.income),
                format_currency(view.spending)
            );
        }
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .backend(cli.backend.clone().into())
        .render_scale(cli.scale)
        .jpeg_quality(cli.jpeg_quality)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// A directory target gets the dated default file name.
fn resolve_csv_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(default_export_name(chrono::Local::now().date_naive()))
    } else {
        target.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_stops_once_work_is_done() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        cb.on_status(ProcessingStatus::Converting);
        cb.on_status(ProcessingStatus::Analyzing);
        assert!(!cb.bar.is_finished());
        cb.on_status(ProcessingStatus::Complete);
        assert!(cb.bar.is_finished());
    }

    #[test]
    fn error_clears_spinner_without_printing() {
        let cb = CliProgressCallback::with_bar(ProgressBar::hidden());
        cb.on_status(ProcessingStatus::Analyzing);
        cb.on_error("Failed to parse transaction data. Please try a clearer image.");
        assert!(cb.bar.is_finished());
        assert_eq!(cb.bar.message(), "");
    }
}
