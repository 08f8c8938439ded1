//! Envelope unwrapping for source responses
//!
//! The complaint API answers with a JSON array of search hits. Each hit wraps
//! the actual record in an envelope field (`_source` by default); hits
//! without that field are dropped.

use super::{FetcherError, FetcherResult};
use serde_json::Value;

/// Parse a response body and unwrap each enveloped record.
///
/// With `envelope == None`, every object in the array is kept as is.
/// Non-object entries are always dropped.
pub fn unwrap_records(body: &str, envelope: Option<&str>) -> FetcherResult<Vec<Value>> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| FetcherError::ParseError(format!("response is not valid JSON: {e}")))?;

    let hits = match parsed {
        Value::Array(hits) => hits,
        other => {
            return Err(FetcherError::ParseError(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )))
        }
    };

    let total = hits.len();
    let records: Vec<Value> = hits
        .into_iter()
        .filter_map(|hit| match hit {
            Value::Object(mut fields) => match envelope {
                Some(key) => fields.remove(key),
                None => Some(Value::Object(fields)),
            },
            _ => None,
        })
        .collect();

    if records.len() < total {
        tracing::debug!(
            total,
            kept = records.len(),
            "Discarded hits without the expected envelope"
        );
    }

    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
