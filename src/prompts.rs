//! Extraction prompt and response schema.
//!
//! Both are sent unchanged with every request; callers can override the
//! prompt via [`crate::config::AnalysisConfig::prompt`] but not the schema,
//! since [`crate::pipeline::normalize`] depends on its shape.

use serde_json::{json, Value};

/// Default instruction sent after the statement images.
pub const EXTRACTION_PROMPT: &str = r#"You are an expert financial data analyst.
Analyze the provided images of a bank statement.
Extract every single transaction row found in the document.

For each transaction, extract:
1. Date (YYYY-MM-DD format). If the year is missing, assume the current year or infer from context headers.
2. Description (Clean up the text, remove excessive whitespace or codes).
3. Amount (Number. Ensure withdrawals/debits are negative and deposits/credits are positive).
4. Type (Strictly "Credit" or "Debit").
5. Notes (Any extra reference numbers, categories inferred, or details).

Return ONLY a JSON object containing an array of transactions."#;

/// Response schema in the OpenAPI subset accepted by Gemini's `responseSchema`.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "transactions": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "date": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "amount": { "type": "NUMBER" },
                        "type": { "type": "STRING", "enum": ["Credit", "Debit"] },
                        "notes": { "type": "STRING" }
                    },
                    "required": ["date", "description", "amount", "type"]
                }
            }
        }
    })
}

/// System prompt for providers without a native schema switch.
///
/// The schema is pretty-printed into the prompt so the model sees the exact
/// field names and enum values it must produce.
pub fn schema_system_prompt(prompt: &str, schema: &Value) -> String {
    let schema_text =
        serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "{prompt}\n\nThe JSON object MUST conform to this schema:\n{schema_text}\n\n\
Respond with the JSON object only. Do NOT wrap it in ```json fences and do NOT add commentary."
    )
}
