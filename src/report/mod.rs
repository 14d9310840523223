//! Presentation folds over an extracted transaction list.
//!
//! Nothing here touches the network or the filesystem except
//! [`csv::export_csv`]. Every function is a pure view of
//! `&[Transaction]`, recomputed on demand.
//!
//! - [`filter`] — type filter + free-text search, with totals of the view
//! - [`chart`]  — per-date flow and running balance series
//! - [`csv`]    — export/import in the `Date,Description,Amount,Type,Notes` layout
//! - [`format`] — currency strings and terminal rendering

pub mod chart;
pub mod csv;
pub mod filter;
pub mod format;
