//! Content payload helpers
//!
//! Entry content is an opaque string to the store. Editors usually hand us
//! a rich-text JSON tree (`{"type":"doc","content":[...]}`); for search we
//! index only the human text inside it, so structural keys like `paragraph`
//! don't match every entry.

use serde_json::Value;

/// Extract searchable text from a content payload
///
/// JSON payloads contribute every `"text"` string in document order.
/// Anything that isn't JSON is indexed as-is.
pub fn plain_text(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::String(text)) => text,
        Ok(value @ (Value::Object(_) | Value::Array(_))) => {
            let mut parts = Vec::new();
            collect_text(&value, &mut parts);
            parts.join(" ")
        }
        _ => content.to_string(),
    }
}

fn collect_text<'a>(value: &'a Value, parts: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                parts.push(text);
            }
            for (key, child) in map {
                if key != "text" {
                    collect_text(child, parts);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, parts);
            }
        }
        _ => {}
    }
}

/// Build an FTS5 query that matches all terms literally
///
/// User input is split on whitespace and each term quoted, so characters
/// like `-`, `:` or `"` never reach the FTS query parser.
pub fn fts_query(input: &str) -> Option<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .map(|term| format!("\"{}\"", term.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}
