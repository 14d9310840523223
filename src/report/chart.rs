//! Chart series: money in/out per date and the running balance.
//!
//! Only the data is produced here. Dates are grouped by their exact text and
//! ordered chronologically when they parse as a calendar date; dates that do
//! not parse keep their first-seen order after all parseable ones.

use crate::transaction::Transaction;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date formats tried, in order, when sorting buckets.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%b %d, %Y", "%d %b %Y"];

/// Money in and out on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyFlow {
    pub date: String,
    pub income: f64,
    /// Magnitude of non-positive amounts.
    pub expense: f64,
    /// Signed sum of the date's amounts (`income - expense`).
    pub balance: f64,
}

/// Running total of [`DailyFlow::balance`] up to and including `date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePoint {
    pub date: String,
    pub cumulative_balance: f64,
}

/// Parse a statement date for ordering.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Group transactions by date and order the groups chronologically.
pub fn daily_flow(transactions: &[Transaction]) -> Vec<DailyFlow> {
    let mut buckets: Vec<DailyFlow> = Vec::new();
    for tx in transactions {
        let idx = match buckets.iter().position(|b| b.date == tx.date) {
            Some(i) => i,
            None => {
                buckets.push(DailyFlow {
                    date: tx.date.clone(),
                    income: 0.0,
                    expense: 0.0,
                    balance: 0.0,
                });
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[idx];
        if tx.amount > 0.0 {
            bucket.income += tx.amount;
        } else {
            bucket.expense += tx.amount.abs();
        }
        bucket.balance += tx.amount;
    }

    // Stable sort: equal keys (and all unparseable dates) keep first-seen order.
    buckets.sort_by_key(|b| match parse_date(&b.date) {
        Some(d) => (0u8, Some(d)),
        None => (1u8, None),
    });
    buckets
}

/// Running balance across the ordered daily flow.
pub fn cumulative_balance(flow: &[DailyFlow]) -> Vec<BalancePoint> {
    flow.iter()
        .scan(0.0, |running, day| {
            *running += day.balance;
            Some(BalancePoint {
                date: day.date.clone(),
                cumulative_balance: *running,
            })
        })
        .collect()
}

/// Both chart series for one transaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub daily_flow: Vec<DailyFlow>,
    pub cumulative_balance: Vec<BalancePoint>,
}

impl ChartSeries {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let daily_flow = daily_flow(transactions);
        let cumulative_balance = cumulative_balance(&daily_flow);
        Self {
            daily_flow,
            cumulative_balance,
        }
    }
}
