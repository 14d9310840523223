//! Progress-callback trait for analysis status events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to follow the
//! pipeline as it moves from converting files to waiting on the model.
//!
//! # Example
//!
//! ```rust
//! use edgequake_statements::{AnalysisConfig, AnalysisProgressCallback, ProcessingStatus};
//! use std::sync::{Arc, Mutex};
//!
//! struct StatusLog(Mutex<Vec<ProcessingStatus>>);
//!
//! impl AnalysisProgressCallback for StatusLog {
//!     fn on_status(&self, status: ProcessingStatus) {
//!         self.0.lock().unwrap().push(status);
//!     }
//! }
//!
//! let log = Arc::new(StatusLog(Mutex::new(Vec::new())));
//! let config = AnalysisConfig::builder()
//!     .progress_callback(log as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Coarse pipeline state, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    /// Reading files and rasterising PDF pages.
    Converting,
    /// Waiting on the model reply.
    Analyzing,
    Complete,
    Error,
}

impl ProcessingStatus {
    /// True while work is in flight and new input should not be accepted.
    pub fn is_busy(&self) -> bool {
        matches!(self, ProcessingStatus::Converting | ProcessingStatus::Analyzing)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessingStatus::Idle => "idle",
            ProcessingStatus::Converting => "converting",
            ProcessingStatus::Analyzing => "analyzing",
            ProcessingStatus::Complete => "complete",
            ProcessingStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Called by the analysis pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called on every status transition.
    fn on_status(&self, status: ProcessingStatus) {
        let _ = status;
    }

    /// Called after a file has been turned into image parts.
    ///
    /// # Arguments
    /// * `name`  — file name as supplied
    /// * `parts` — image parts produced (PDF page count, or 1 for images)
    fn on_file_converted(&self, name: &str, parts: usize) {
        let _ = (name, parts);
    }

    /// Called when a file is ignored because it is neither PDF nor image.
    fn on_file_skipped(&self, name: &str) {
        let _ = name;
    }

    /// Called just before the model request is sent.
    fn on_analysis_start(&self, image_parts: usize) {
        let _ = image_parts;
    }

    /// Called once the reply has been parsed.
    fn on_analysis_complete(&self, transaction_count: usize) {
        let _ = transaction_count;
    }

    /// Called with the display string of a failure, right before
    /// `on_status(ProcessingStatus::Error)`.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
