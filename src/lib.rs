//! # edgequake-statements
//!
//! Extract transactions from bank statements (PDFs and photos/scans) with a
//! Vision Language Model, then summarise, chart, filter and export them.
//!
//! Statements come in every layout imaginable, with columns, running balances,
//! carried-forward lines and multi-page tables. Rather than parse text, this
//! crate rasterises every page and asks a vision model to return the rows as
//! JSON matching a fixed schema.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Intake     read files, keep PDFs and images, skip the rest
//!  ├─ 2. Render     rasterise PDF pages via pdfium (spawn_blocking)
//!  ├─ 3. Encode     pages → JPEG, images as-is, base64
//!  ├─ 4. Request    every part + prompt + response schema, one call
//!  ├─ 5. Model      Gemini generateContent or any edgequake-llm provider
//!  ├─ 6. Normalise  JSON → Vec<Transaction> + Summary
//!  └─ 7. Report     filter/search, chart series, CSV export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_statements::{analyze, AnalysisConfig, TableView, TypeFilter};
//! use edgequake_statements::report::format::{render_summary, render_table};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY (or API_KEY)
//!     let config = AnalysisConfig::default();
//!     let result = analyze(&["statement.pdf"], &config).await?;
//!     print!("{}", render_summary(&result.summary));
//!     let view = TableView::new(&result.transactions, TypeFilter::Debit, "coffee");
//!     print!("{}", render_table(&view));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stmt2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ```toml
//! edgequake-statements = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod transaction;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_files, analyze_sync, analyze_to_csv, resolve_extractor};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ModelBackend};
pub use error::StatementError;
pub use output::{AnalysisResult, AnalysisStats, Summary};
pub use pipeline::encode::ImagePart;
pub use pipeline::extractor::{ExtractionReply, TransactionExtractor};
pub use pipeline::intake::{FileKind, StatementFile};
pub use pipeline::request::ExtractionRequest;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProcessingStatus, ProgressCallback};
pub use report::chart::{BalancePoint, ChartSeries, DailyFlow};
pub use report::filter::{TableView, TypeFilter};
pub use transaction::{Transaction, TransactionType};
