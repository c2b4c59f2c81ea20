//! JSON parsing helpers for LLM responses
//!
//! Models asked for JSON often wrap the payload in prose or a ```json fence.
//! These helpers cut the outermost JSON value out of the text before parsing.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Truncate long responses for error messages
fn truncate_raw(raw: &str) -> String {
    if raw.len() > 200 {
        let mut end = 200;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    } else {
        raw.to_string()
    }
}

/// Extract the outermost JSON object or array from an LLM response
pub fn extract_json(response: &str) -> Result<Value> {
    let response = response.trim();

    // Whole response is already JSON (structured output mode)
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        return Ok(value);
    }

    let object = match (response.find('{'), response.rfind('}')) {
        (Some(s), Some(e)) if s < e => Some((s, e)),
        _ => None,
    };
    let array = match (response.find('['), response.rfind(']')) {
        (Some(s), Some(e)) if s < e => Some((s, e)),
        _ => None,
    };

    // Prefer whichever value starts first
    let span = match (object, array) {
        (Some(o), Some(a)) => Some(if a.0 < o.0 { a } else { o }),
        (o, a) => o.or(a),
    };

    match span {
        Some((s, e)) => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|e| {
                Error::InvalidData(format!(
                    "Invalid JSON from LLM: {} | Raw: {}",
                    e,
                    truncate_raw(json_str)
                ))
            })
        }
        None => Err(Error::InvalidData(format!(
            "No JSON found in LLM response | Raw: {}",
            truncate_raw(response)
        ))),
    }
}

/// Deserialize a structured LLM result into a typed value
pub fn parse_structured<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::InvalidData(format!("LLM response did not match schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json(r#"{"transactions": []}"#).unwrap();
        assert!(value["transactions"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_extract_json_with_text() {
        let response = r#"Claro! Aqui está:
```json
{"categories": [{"index": 0, "category": "vendas"}]}
```"#;
        let value = extract_json(response).unwrap();
        assert_eq!(value["categories"][0]["category"], "vendas");
    }

    #[test]
    fn test_extract_top_level_array() {
        let value = extract_json(r#"Result: ["aluguel", "impostos"] done"#).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_extract_no_json() {
        let err = extract_json("I could not read the statement").unwrap_err();
        assert!(err.to_string().contains("No JSON found"));
    }

    #[test]
    fn test_truncate_raw_respects_char_boundaries() {
        let raw = "ç".repeat(150);
        let truncated = truncate_raw(&raw);
        assert!(truncated.ends_with("..."));
    }
}
