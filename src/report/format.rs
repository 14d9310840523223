//! Text rendering for the terminal: currency strings, summary cards, table.

use crate::output::Summary;
use crate::report::filter::TableView;
use std::fmt::Write;

/// US-dollar formatting with thousands separators: `$1,234.56`, `-$12.00`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${whole}.{:02}", cents % 100)
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Table amount: two decimals, with a leading `+` on positive values.
pub fn format_signed(amount: f64) -> String {
    if amount > 0.0 {
        format!("+{amount:.2}")
    } else {
        format!("{amount:.2}")
    }
}

/// The three summary cards on one block of lines.
pub fn render_summary(summary: &Summary) -> String {
    format!(
        "Total Income:   {}\nTotal Expenses: {}\nNet Flow:       {}\n",
        format_currency(summary.total_income),
        format_currency(summary.total_expense),
        format_currency(summary.net),
    )
}

const MAX_DESCRIPTION: usize = 40;

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut s: String = text.chars().take(width.saturating_sub(1)).collect();
        s.push('…');
        s
    }
}

/// Render a filtered table with a footer of its totals.
pub fn render_table(view: &TableView<'_>) -> String {
    let mut out = String::new();
    if view.is_empty() {
        out.push_str("No transactions found matching your criteria.\n");
        return out;
    }

    let date_w = view
        .rows
        .iter()
        .map(|t| t.date.chars().count())
        .max()
        .unwrap_or(0)
        .max(4);
    let desc_w = view
        .rows
        .iter()
        .map(|t| t.description.chars().count().min(MAX_DESCRIPTION))
        .max()
        .unwrap_or(0)
        .max(11);
    let amounts: Vec<String> = view.rows.iter().map(|t| format_signed(t.amount)).collect();
    let amount_w = amounts.iter().map(String::len).max().unwrap_or(0).max(6);

    let _ = writeln!(
        out,
        "{:<date_w$}  {:<desc_w$}  {:>amount_w$}  {:<6}  Notes",
        "Date", "Description", "Amount", "Type"
    );
    let _ = writeln!(
        out,
        "{}",
        "-".repeat(date_w + desc_w + amount_w + 6 + 13)
    );
    for (tx, amount) in view.rows.iter().zip(&amounts) {
        let _ = writeln!(
            out,
            "{:<date_w$}  {:<desc_w$}  {:>amount_w$}  {:<6}  {}",
            tx.date,
            truncate(&tx.description, MAX_DESCRIPTION),
            amount,
            tx.kind.as_str(),
            tx.notes
        );
    }
    let _ = writeln!(
        out,
        "\n{} transactions · income {} · spending {}",
        view.count,
        format_currency(view.income),
        format_currency(view.spending)
    );
    out
}
