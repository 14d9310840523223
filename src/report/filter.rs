//! Table filtering: a type filter and a free-text search, in either order.

use crate::transaction::{Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which transaction types the table shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeFilter {
    #[default]
    All,
    Credit,
    Debit,
}

impl TypeFilter {
    pub fn accepts(&self, kind: TransactionType) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Credit => kind == TransactionType::Credit,
            TypeFilter::Debit => kind == TransactionType::Debit,
        }
    }
}

impl fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeFilter::All => "All",
            TypeFilter::Credit => "Credit",
            TypeFilter::Debit => "Debit",
        })
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TypeFilter::All),
            "credit" | "credits" | "income" => Ok(TypeFilter::Credit),
            "debit" | "debits" | "expense" | "spending" => Ok(TypeFilter::Debit),
            other => Err(format!(
                "unknown filter '{other}' (expected all, credit or debit)"
            )),
        }
    }
}

/// Case-insensitive substring match on description or notes.
///
/// An empty term matches everything.
pub fn matches_search(tx: &Transaction, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    tx.description.to_lowercase().contains(&needle) || tx.notes.to_lowercase().contains(&needle)
}

/// Rows that pass both the type filter and the search, in input order.
pub fn filter_transactions<'a>(
    transactions: &'a [Transaction],
    filter: TypeFilter,
    term: &str,
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|tx| filter.accepts(tx.kind) && matches_search(tx, term))
        .collect()
}

/// The filtered table with totals of what is currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<'a> {
    pub rows: Vec<&'a Transaction>,
    pub count: usize,
    /// Sum of positive amounts among `rows`.
    pub income: f64,
    /// Sum of `|amount|` over non-positive amounts among `rows`.
    pub spending: f64,
}

impl<'a> TableView<'a> {
    pub fn new(transactions: &'a [Transaction], filter: TypeFilter, term: &str) -> Self {
        let rows = filter_transactions(transactions, filter, term);
        let (income, spending) = rows.iter().fold((0.0, 0.0), |(inc, sp), tx| {
            if tx.amount > 0.0 {
                (inc + tx.amount, sp)
            } else {
                (inc, sp + tx.amount.abs())
            }
        });
        Self {
            count: rows.len(),
            rows,
            income,
            spending,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Owned copies of the visible rows, e.g. for export.
    pub fn to_owned_rows(&self) -> Vec<Transaction> {
        self.rows.iter().map(|tx| (*tx).clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Transaction> {
        vec![
            Transaction::new("2024-03-01", "Payroll ACME", 2500.0, TransactionType::Credit, ""),
            Transaction::new("2024-03-02", "Coffee Shop", -4.5, TransactionType::Debit, "latte"),
            Transaction::new("2024-03-02", "Refund", 20.0, TransactionType::Credit, "coffee machine"),
            Transaction::new("2024-03-05", "Rent", -1200.0, TransactionType::Debit, "March"),
        ]
    }

    #[test]
    fn search_hits_description_or_notes() {
        let txs = sample();
        let hits: Vec<_> = filter_transactions(&txs, TypeFilter::All, "COFFEE")
            .into_iter()
            .map(|t| t.description.as_str())
            .collect();
        assert_eq!(hits, vec!["Coffee Shop", "Refund"]);
    }

    #[test]
    fn empty_term_matches_all() {
        let txs = sample();
        assert_eq!(filter_transactions(&txs, TypeFilter::All, "").len(), 4);
    }

    #[test]
    fn type_filter_and_search_combine() {
        let txs = sample();
        let rows = filter_transactions(&txs, TypeFilter::Debit, "coffee");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Coffee Shop");
    }

    #[test]
    fn filter_and_search_commute() {
        let txs = sample();
        for filter in [TypeFilter::All, TypeFilter::Credit, TypeFilter::Debit] {
            for term in ["", "coffee", "r", "zzz"] {
                let searched: Vec<Transaction> = txs
                    .iter()
                    .filter(|t| matches_search(t, term))
                    .cloned()
                    .collect();
                let a: Vec<&Transaction> = searched.iter().filter(|t| filter.accepts(t.kind)).collect();
                let b = filter_transactions(&txs, filter, term);
                assert_eq!(a, b, "filter {filter} term {term:?}");
            }
        }
    }

    #[test]
    fn table_view_totals_follow_the_view() {
        let txs = sample();
        let view = TableView::new(&txs, TypeFilter::All, "coffee");
        assert_eq!(view.count, 2);
        assert_eq!(view.income, 20.0);
        assert_eq!(view.spending, 4.5);

        let all = TableView::new(&txs, TypeFilter::All, "");
        assert_eq!(all.income, 2520.0);
        assert_eq!(all.spending, 1204.5);
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("all".parse::<TypeFilter>().unwrap(), TypeFilter::All);
        assert_eq!("Credit".parse::<TypeFilter>().unwrap(), TypeFilter::Credit);
        assert_eq!("DEBIT".parse::<TypeFilter>().unwrap(), TypeFilter::Debit);
        assert!("both".parse::<TypeFilter>().is_err());
    }
}
