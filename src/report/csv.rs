//! CSV export and import.
//!
//! Layout: `Date,Description,Amount,Type,Notes`, one row per transaction,
//! amounts with two decimals. Quoting and quote-doubling are left to the
//! `csv` crate.
//!
//! Amounts coming out of [`crate::pipeline::normalize`] are already rounded
//! to cents, so `read_csv(write_csv(txs)) == txs` for analysis results.
//! Hand-built transactions with finer amounts are rounded on write.

use crate::error::StatementError;
use crate::transaction::{Transaction, TransactionType};
use chrono::NaiveDate;
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

pub const CSV_HEADERS: [&str; 5] = ["Date", "Description", "Amount", "Type", "Notes"];

/// Write the header and one record per transaction.
///
/// Amounts are written with exactly two decimals (`-4.50`).
pub fn write_csv<'a, W, I>(writer: W, transactions: I) -> Result<(), StatementError>
where
    W: Write,
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for tx in transactions {
        let amount = format!("{:.2}", tx.amount);
        wtr.write_record([
            tx.date.as_str(),
            tx.description.as_str(),
            amount.as_str(),
            tx.kind.as_str(),
            tx.notes.as_str(),
        ])?;
    }
    wtr.flush().map_err(|e| StatementError::Csv(e.into()))?;
    Ok(())
}

/// Render the CSV document in memory.
pub fn to_csv_string<'a, I>(transactions: I) -> Result<String, StatementError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut buf = Vec::new();
    write_csv(&mut buf, transactions)?;
    String::from_utf8(buf).map_err(|e| StatementError::Internal(format!("CSV output is not UTF-8: {e}")))
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Notes", default)]
    notes: String,
}

/// Read a CSV written by [`write_csv`] back into transactions.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Transaction>, StatementError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        let row: CsvRow = row?;
        out.push(Transaction {
            date: row.date,
            description: row.description,
            amount: row.amount,
            kind: TransactionType::from_label(&row.kind),
            notes: row.notes,
        });
    }
    Ok(out)
}

/// Write transactions to `path` atomically (temp file in the same directory + rename).
pub fn export_csv(path: &Path, transactions: &[Transaction]) -> Result<(), StatementError> {
    let write_err = |source: std::io::Error| StatementError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    write_csv(tmp.as_file_mut(), transactions)?;
    tmp.as_file_mut().flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Wrote {} transactions to {}", transactions.len(), path.display());
    Ok(())
}

/// `statement_analysis_YYYY-MM-DD.csv`
pub fn default_export_name(date: NaiveDate) -> String {
    format!("statement_analysis_{}.csv", date.format("%Y-%m-%d"))
}
