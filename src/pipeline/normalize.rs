//! Response normalisation: model text → typed transactions.
//!
//! Even with a response schema, replies vary in small ways: providers
//! without a schema switch wrap JSON in ```` ```json ```` fences, amounts
//! arrive as strings with currency symbols, `notes` is omitted. The rules
//! here coerce those into [`Transaction`]s. Anything structurally wrong
//! (invalid JSON, no `transactions` array, a row that is not an object)
//! fails the whole reply with [`StatementError::MalformedResponse`].

use crate::error::StatementError;
use crate::transaction::{Transaction, TransactionType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Parse a model reply into transactions, in reply order.
pub fn parse_transactions(text: &str) -> Result<Vec<Transaction>, StatementError> {
    let body = strip_json_fences(text);
    let value: Value = serde_json::from_str(body.trim()).map_err(|e| malformed(format!("invalid JSON: {e}")))?;

    let rows = match value {
        Value::Object(mut obj) => match obj.remove("transactions") {
            Some(Value::Array(rows)) => rows,
            Some(other) => {
                return Err(malformed(format!(
                    "`transactions` is {}, expected an array",
                    type_name(&other)
                )))
            }
            None => return Err(malformed("missing `transactions` field".to_string())),
        },
        // Some providers return the array itself despite the schema.
        Value::Array(rows) => rows,
        other => {
            return Err(malformed(format!(
                "reply is {}, expected an object",
                type_name(&other)
            )))
        }
    };

    let transactions = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Object(fields) => Ok(coerce_row(i, &fields)),
            other => Err(malformed(format!(
                "transaction {} is {}, expected an object",
                i,
                type_name(&other)
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

fn malformed(detail: String) -> StatementError {
    warn!("Malformed model response: {}", detail);
    StatementError::MalformedResponse { detail }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Coerce one row. Missing text fields become empty strings.
fn coerce_row(index: usize, fields: &Map<String, Value>) -> Transaction {
    let amount = match fields.get("amount") {
        Some(v) => coerce_amount(v).unwrap_or_else(|| {
            warn!("Transaction {}: non-numeric amount {}, using 0", index, v);
            0.0
        }),
        None => 0.0,
    };
    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .map(TransactionType::from_label)
        .unwrap_or(TransactionType::Debit);

    Transaction {
        date: text_field(fields, "date"),
        description: text_field(fields, "description"),
        amount,
        kind,
        notes: text_field(fields, "notes"),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Cast a JSON value to an amount, rounded to cents.
///
/// Numbers pass through; `null` and `false` are 0, `true` is 1; strings are
/// parsed after removing currency symbols and spaces, with `(12.50)` read as
/// -12.50. A comma is accepted only as a thousands separator in complete
/// three-digit groups (`1,234.56`); decimal-comma text such as `12,50` is
/// ambiguous and returns `None`, as does anything else non-numeric.
pub fn coerce_amount(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_amount_text(s),
        _ => None,
    }?;
    Some(round_cents(raw))
}

/// Round to two decimals, the precision statements and CSV exports carry.
pub fn round_cents(amount: f64) -> f64 {
    let rounded = (amount * 100.0).round() / 100.0;
    // Avoid `-0.0` leaking into totals and exports.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

static RE_AMOUNT_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s$€£¥]").unwrap());

static RE_THOUSANDS_GROUPED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").unwrap());

fn parse_amount_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let (negative, inner) = match trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned = RE_AMOUNT_NOISE.replace_all(inner, "");
    let digits = if cleaned.contains(',') {
        if !RE_THOUSANDS_GROUPED.is_match(&cleaned) {
            return None;
        }
        cleaned.replace(',', "")
    } else {
        cleaned.into_owned()
    };
    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value.abs() } else { value })
}

// ── Fence stripping ──────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*)\n```\s*$").unwrap());

/// Remove an outer ```` ``` ```` / ```` ```json ```` fence if the whole reply is wrapped in one.
pub fn strip_json_fences(input: &str) -> String {
    let normalised = input.replace("\r\n", "\n");
    if let Some(caps) = RE_OUTER_FENCES.captures(normalised.trim()) {
        caps[1].to_string()
    } else {
        normalised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_schema_shaped_reply() {
        let text = r#"{"transactions":[
            {"date":"2024-03-01","description":"Payroll ACME","amount":2500.0,"type":"Credit","notes":"ref 991"},
            {"date":"2024-03-02","description":"Coffee","amount":-4.5,"type":"Debit"}
        ]}"#;
        let txs = parse_transactions(text).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, TransactionType::Credit);
        assert_eq!(txs[0].notes, "ref 991");
        assert_eq!(txs[1].amount, -4.5);
        assert_eq!(txs[1].notes, "", "missing notes default to empty");
    }

    #[test]
    fn unknown_type_label_becomes_debit() {
        let text = r#"{"transactions":[{"date":"2024-01-01","description":"x","amount":5,"type":"CREDIT"}]}"#;
        let txs = parse_transactions(text).unwrap();
        assert_eq!(txs[0].kind, TransactionType::Debit);
    }

    #[test]
    fn string_amounts_are_cast() {
        assert_eq!(coerce_amount(&json!("1,234.56")), Some(1234.56));
        assert_eq!(coerce_amount(&json!("-$12.00")), Some(-12.0));
        assert_eq!(coerce_amount(&json!("(45.10)")), Some(-45.1));
        assert_eq!(coerce_amount(&json!(" 7 ")), Some(7.0));
        assert_eq!(coerce_amount(&json!("")), Some(0.0));
        assert_eq!(coerce_amount(&json!(null)), Some(0.0));
        assert_eq!(coerce_amount(&json!("abc")), None);
        assert_eq!(coerce_amount(&json!([1])), None);
    }

    #[test]
    fn decimal_comma_amounts_are_not_misread() {
        assert_eq!(coerce_amount(&json!("12,50")), None);
        assert_eq!(coerce_amount(&json!("1.234,56")), None);
        assert_eq!(coerce_amount(&json!("-45,00 EUR")), None);
        assert_eq!(coerce_amount(&json!("1,23")), None);
        assert_eq!(coerce_amount(&json!("12,345,678.9")), Some(12345678.9));
        assert_eq!(coerce_amount(&json!("-1,000")), Some(-1000.0));

        let text = r#"{"transactions":[{"date":"d","description":"x","amount":"12,50","type":"Debit"}]}"#;
        assert_eq!(parse_transactions(text).unwrap()[0].amount, 0.0);
    }

    #[test]
    fn amounts_are_rounded_to_cents() {
        assert_eq!(coerce_amount(&json!(-36.999)), Some(-37.0));
        assert_eq!(coerce_amount(&json!(10.005001)), Some(10.01));
        assert_eq!(coerce_amount(&json!("0.004")), Some(0.0));
        assert!(coerce_amount(&json!(-0.001)).unwrap().is_sign_positive());
    }

    #[test]
    fn non_numeric_amount_falls_back_to_zero() {
        let text = r#"{"transactions":[{"date":"d","description":"x","amount":"n/a","type":"Debit"}]}"#;
        let txs = parse_transactions(text).unwrap();
        assert_eq!(txs[0].amount, 0.0);
    }

    #[test]
    fn fenced_reply_is_accepted() {
        let text = "```json\n{\"transactions\":[{\"date\":\"2024-01-05\",\"description\":\"ATM\",\"amount\":-60,\"type\":\"Debit\"}]}\n```";
        let txs = parse_transactions(text).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].description, "ATM");
    }

    #[test]
    fn bare_array_is_accepted() {
        let text = r#"[{"date":"2024-01-05","description":"ATM","amount":-60,"type":"Debit"}]"#;
        assert_eq!(parse_transactions(text).unwrap().len(), 1);
    }

    #[test]
    fn non_string_text_fields_are_stringified() {
        let text = r#"{"transactions":[{"date":20240105,"description":null,"amount":1,"type":"Credit","notes":42}]}"#;
        let txs = parse_transactions(text).unwrap();
        assert_eq!(txs[0].date, "20240105");
        assert_eq!(txs[0].description, "");
        assert_eq!(txs[0].notes, "42");
    }

    #[test]
    fn structural_errors_are_malformed() {
        for bad in [
            "not json at all",
            r#"{"rows": []}"#,
            r#"{"transactions": "none"}"#,
            r#"{"transactions": [1, 2]}"#,
            "42",
            "{\"transactions\": [",
        ] {
            let err = parse_transactions(bad).unwrap_err();
            assert!(
                matches!(err, StatementError::MalformedResponse { .. }),
                "input {bad:?} gave {err:?}"
            );
            assert_eq!(err.to_string(), "Failed to parse the analysis results.");
        }
    }

    #[test]
    fn empty_transactions_is_fine() {
        assert!(parse_transactions(r#"{"transactions": []}"#).unwrap().is_empty());
    }

    #[test]
    fn strip_fences_leaves_plain_json() {
        assert_eq!(strip_json_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```JSON\r\n{\"a\":1}\r\n```\n"), "{\"a\":1}");
    }
}
