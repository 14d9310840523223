//! The transaction record extracted from a statement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a transaction.
///
/// A credit increases the balance (positive amount), a debit decreases it
/// (negative amount). The model is asked for both the sign and the type;
/// the two are redundant and kept as the model reported them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    /// Coerce a model-supplied label into the two-valued enum.
    ///
    /// Only the exact string `"Credit"` is a credit; anything else, including
    /// `"credit"` or an empty string, is a debit.
    pub fn from_label(label: &str) -> Self {
        if label == "Credit" {
            TransactionType::Credit
        } else {
            TransactionType::Debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "Credit",
            TransactionType::Debit => "Debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One statement row as returned by the model, after normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Calendar date, normally `YYYY-MM-DD`. Kept as text because the model
    /// may return partial or unusual dates that still group correctly.
    pub date: String,
    pub description: String,
    /// Signed amount: positive for credits, negative for debits.
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub notes: String,
}

impl Transaction {
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: f64,
        kind: TransactionType,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount,
            kind,
            notes: notes.into(),
        }
    }
}
