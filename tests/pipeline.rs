//! Offline integration tests: the full analysis chain with a scripted
//! extractor standing in for the model API.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use edgequake_statements::report::csv::{read_csv, to_csv_string};
use edgequake_statements::{
    analyze, analyze_files, analyze_to_csv, AnalysisConfig, AnalysisProgressCallback, ChartSeries,
    ExtractionReply, ExtractionRequest, ProcessingStatus, StatementError, StatementFile,
    TableView, TransactionExtractor, TransactionType, TypeFilter,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

const REPLY: &str = r#"{"transactions":[
  {"date":"2024-03-01","description":"Payroll ACME Corp","amount":2500.00,"type":"Credit","notes":"March salary"},
  {"date":"2024-03-02","description":"Blue Bottle Coffee","amount":-4.50,"type":"Debit"},
  {"date":"2024-03-02","description":"Amazon Marketplace","amount":-36.999,"type":"Debit","notes":"order \"112-7\""},
  {"date":"2024-03-04","description":"Refund Amazon","amount":"12.00","type":"Credit","notes":""},
  {"date":"2024-03-05","description":"Rent","amount":-1200,"type":"Debit","notes":"Flat 3B"}
]}"#;

/// Scripted model: records every request, answers with a fixed reply.
struct FakeExtractor {
    reply: Result<String, String>,
    seen: Mutex<Vec<ExtractionRequest>>,
}

impl FakeExtractor {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ExtractionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionExtractor for FakeExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionReply, StatementError> {
        self.seen.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(text) => Ok(ExtractionReply {
                text: text.clone(),
                input_tokens: 1200,
                output_tokens: 340,
            }),
            Err(message) => Err(StatementError::LlmApiError {
                message: message.clone(),
            }),
        }
    }

    fn name(&self) -> String {
        "fake/scripted".to_string()
    }
}

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<ProcessingStatus>>,
    converted: Mutex<Vec<(String, usize)>>,
    skipped: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl AnalysisProgressCallback for Recorder {
    fn on_status(&self, status: ProcessingStatus) {
        self.statuses.lock().unwrap().push(status);
    }
    fn on_file_converted(&self, name: &str, image_parts: usize) {
        self.converted.lock().unwrap().push((name.to_string(), image_parts));
    }
    fn on_file_skipped(&self, name: &str) {
        self.skipped.lock().unwrap().push(name.to_string());
    }
    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

/// Route library logs through the test harness; `RUST_LOG=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_with(extractor: Arc<FakeExtractor>, recorder: Option<Arc<Recorder>>) -> AnalysisConfig {
    init_tracing();
    let mut builder = AnalysisConfig::builder().extractor(extractor);
    if let Some(rec) = recorder {
        builder = builder.progress_callback(rec);
    }
    builder.build().unwrap()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([240, 240, 240]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// ── Full chain ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn images_are_sent_in_one_request_and_normalised() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_file(dir.path(), "page1.png", &png_bytes());
    let b = write_file(dir.path(), "page2.png", &png_bytes());

    let fake = FakeExtractor::replying(REPLY);
    let recorder = Arc::new(Recorder::default());
    let config = config_with(fake.clone(), Some(recorder.clone()));

    let result = analyze(&[a, b], &config).await.unwrap();

    let requests = fake.requests();
    assert_eq!(requests.len(), 1, "exactly one model call");
    assert_eq!(requests[0].parts.len(), 2);
    assert!(requests[0].parts.iter().all(|p| p.mime_type == "image/png"));
    assert!(requests[0].schema.get("properties").is_some());

    assert_eq!(result.transactions.len(), 5);
    assert_eq!(result.transactions[0].kind, TransactionType::Credit);
    assert_eq!(result.transactions[1].notes, "");
    assert_eq!(result.transactions[3].amount, 12.0);
    assert_eq!(result.stats.image_parts, 2);
    assert_eq!(result.stats.files_accepted, 2);
    assert_eq!(result.stats.input_tokens, 1200);
    assert_eq!(result.stats.model, "fake/scripted");

    assert_eq!(
        *recorder.statuses.lock().unwrap(),
        vec![
            ProcessingStatus::Converting,
            ProcessingStatus::Analyzing,
            ProcessingStatus::Complete
        ]
    );
    assert_eq!(recorder.converted.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn summary_invariant_holds() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let config = config_with(FakeExtractor::replying(REPLY), None);
    let result = analyze_files(files, &config).await.unwrap();

    let s = result.summary;
    let sum: f64 = result.transactions.iter().map(|t| t.amount).sum();
    assert!((s.net - sum).abs() < 1e-9);
    assert!((s.net - (s.total_income - s.total_expense)).abs() < 1e-9);
    assert!(s.total_income >= 0.0 && s.total_expense >= 0.0);
    assert!((s.total_income - 2512.0).abs() < 1e-9);
    assert!((s.total_expense - 1241.5).abs() < 1e-9);
}

#[tokio::test]
async fn unsupported_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_file(dir.path(), "scan.png", &png_bytes());
    let txt = write_file(dir.path(), "notes.txt", b"hello");

    let recorder = Arc::new(Recorder::default());
    let config = config_with(FakeExtractor::replying(REPLY), Some(recorder.clone()));
    let result = analyze(&[img, txt], &config).await.unwrap();

    assert_eq!(result.stats.files_skipped, 1);
    assert_eq!(*recorder.skipped.lock().unwrap(), vec!["notes.txt".to_string()]);
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn no_usable_files_is_no_image_data() {
    let dir = tempfile::tempdir().unwrap();
    let txt = write_file(dir.path(), "notes.txt", b"hello");

    let fake = FakeExtractor::replying(REPLY);
    let recorder = Arc::new(Recorder::default());
    let config = config_with(fake.clone(), Some(recorder.clone()));
    let err = analyze(&[txt], &config).await.unwrap_err();

    assert!(matches!(err, StatementError::NoImageData));
    assert_eq!(err.to_string(), "No valid image data could be extracted.");
    assert!(fake.requests().is_empty(), "model must not be called");
    assert_eq!(
        recorder.statuses.lock().unwrap().last(),
        Some(&ProcessingStatus::Error)
    );
    assert_eq!(
        *recorder.errors.lock().unwrap(),
        vec!["No valid image data could be extracted.".to_string()]
    );
}

#[tokio::test]
async fn missing_file_fails_before_model_call() {
    let fake = FakeExtractor::replying(REPLY);
    let config = config_with(fake.clone(), None);
    let err = analyze(&["/definitely/not/here.pdf"], &config).await.unwrap_err();
    assert!(matches!(err, StatementError::FileNotFound { .. }));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn malformed_reply_fails_whole_analysis() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let recorder = Arc::new(Recorder::default());
    let config = config_with(
        FakeExtractor::replying(r#"{"transactions": "n/a"}"#),
        Some(recorder.clone()),
    );
    let err = analyze_files(files, &config).await.unwrap_err();

    assert_eq!(err.to_string(), "Failed to parse the analysis results.");
    assert_eq!(
        *recorder.statuses.lock().unwrap(),
        vec![
            ProcessingStatus::Converting,
            ProcessingStatus::Analyzing,
            ProcessingStatus::Error
        ]
    );
}

#[tokio::test]
async fn model_error_is_surfaced() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let config = config_with(FakeExtractor::failing("RESOURCE_EXHAUSTED: quota"), None);
    let err = analyze_files(files, &config).await.unwrap_err();
    assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
}

// ── Report folds over a real result ──────────────────────────────────────────

#[tokio::test]
async fn csv_export_round_trips_filtered_table() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let config = config_with(FakeExtractor::replying(REPLY), None);
    let result = analyze_files(files, &config).await.unwrap();

    let view = TableView::new(&result.transactions, TypeFilter::All, "amazon");
    assert_eq!(view.count, 2);
    let csv = to_csv_string(view.rows.iter().copied()).unwrap();
    assert!(csv.contains(r#""order ""112-7""""#), "quotes are doubled: {csv}");

    assert!(csv.contains(",-37.00,"), "three-decimal amount rounded to cents: {csv}");

    let back = read_csv(csv.as_bytes()).unwrap();
    let expected: Vec<_> = view.rows.iter().map(|t| (*t).clone()).collect();
    assert_eq!(back, expected);
}

#[tokio::test]
async fn analyze_to_csv_writes_every_transaction() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_file(dir.path(), "scan.png", &png_bytes());
    let out = dir.path().join("out.csv");

    let config = config_with(FakeExtractor::replying(REPLY), None);
    let result = analyze_to_csv(&[img], &out, &config).await.unwrap();

    let back = read_csv(std::fs::File::open(&out).unwrap()).unwrap();
    assert_eq!(back, result.transactions);
}

#[tokio::test]
async fn filter_and_search_commute_on_result() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let config = config_with(FakeExtractor::replying(REPLY), None);
    let result = analyze_files(files, &config).await.unwrap();

    for filter in [TypeFilter::All, TypeFilter::Credit, TypeFilter::Debit] {
        for term in ["", "amazon", "COFFEE", "flat", "nothing"] {
            let filtered_first: Vec<_> = result
                .transactions
                .iter()
                .filter(|t| filter.accepts(t.kind))
                .filter(|t| edgequake_statements::report::filter::matches_search(t, term))
                .collect();
            let searched_first: Vec<_> = result
                .transactions
                .iter()
                .filter(|t| edgequake_statements::report::filter::matches_search(t, term))
                .filter(|t| filter.accepts(t.kind))
                .collect();
            assert_eq!(filtered_first, searched_first);
            assert_eq!(
                TableView::new(&result.transactions, filter, term).rows,
                filtered_first
            );
        }
    }
}

#[tokio::test]
async fn chart_buckets_match_amount_sums() {
    let files = vec![StatementFile::from_bytes("s.png", png_bytes()).unwrap()];
    let config = config_with(FakeExtractor::replying(REPLY), None);
    let result = analyze_files(files, &config).await.unwrap();

    let series = ChartSeries::from_transactions(&result.transactions);
    let dates: Vec<_> = series.daily_flow.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-04", "2024-03-05"]);

    for day in &series.daily_flow {
        let sum: f64 = result
            .transactions
            .iter()
            .filter(|t| t.date == day.date)
            .map(|t| t.amount)
            .sum();
        assert!((day.income - day.expense - sum).abs() < 1e-9);
    }
    let last = series.cumulative_balance.last().unwrap();
    assert!((last.cumulative_balance - result.summary.net).abs() < 1e-9);
}
