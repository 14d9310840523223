//! Result types returned by [`crate::analyze`].

use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};

/// Aggregate totals over a transaction list.
///
/// `total_income` and `total_expense` are both non-negative magnitudes;
/// `net` is the signed sum of every amount, so
/// `net == total_income - total_expense`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: f64,
    pub total_expense: f64,
    pub net: f64,
}

impl Summary {
    /// Fold a transaction list into totals.
    ///
    /// Positive amounts count as income; zero and negative amounts count
    /// towards expense by magnitude.
    pub fn from_transactions<'a>(transactions: impl IntoIterator<Item = &'a Transaction>) -> Self {
        transactions
            .into_iter()
            .fold(Summary::default(), |mut acc, tx| {
                if tx.amount > 0.0 {
                    acc.total_income += tx.amount;
                } else {
                    acc.total_expense += tx.amount.abs();
                }
                acc.net += tx.amount;
                acc
            })
    }
}

/// Timing and accounting for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Files that were converted into image parts.
    pub files_accepted: usize,
    /// Files ignored because they were neither PDF nor image.
    pub files_skipped: usize,
    /// PDF pages rasterised across all files.
    pub pages_rendered: usize,
    /// Image parts sent to the model.
    pub image_parts: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub convert_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Backend and model that produced the transactions, e.g. `gemini/gemini-3-pro-preview`.
    pub model: String,
}

/// The complete output of an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Transactions in the order the model returned them.
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
    pub stats: AnalysisStats,
}

impl AnalysisResult {
    /// Build a result from transactions, deriving the summary.
    pub fn new(transactions: Vec<Transaction>, stats: AnalysisStats) -> Self {
        let summary = Summary::from_transactions(&transactions);
        Self {
            transactions,
            summary,
            stats,
        }
    }
}
