//! Request decoding for the bridge routes
//!
//! Bodies are parsed into a loosely-typed JSON object first, then every field
//! is pulled out through a total projection. A missing or mistyped field never
//! fails a request; it simply becomes an empty string or an empty list.

use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Parse a request body as a JSON object.
///
/// `null` decodes to an empty object so that every field falls back to its
/// default. Arrays, scalars and malformed text are rejected.
pub fn decode_object(body: &[u8]) -> Result<Map<String, Value>, BridgeError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(BridgeError::InvalidJson(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
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

/// The string held by `value`, or `""` for anything else.
pub fn extract_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Every element of a JSON array projected through [`extract_string`].
pub fn extract_string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(|v| extract_string(Some(v))).collect(),
        _ => Vec::new(),
    }
}

/// Chaincode arguments in the form the SDK expects: one byte vector per
/// string, order preserved.
pub fn extract_args_list(value: Option<&Value>) -> Vec<Vec<u8>> {
    extract_string_list(value)
        .into_iter()
        .map(String::into_bytes)
        .collect()
}

/// Parameters for a chaincode invoke or query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationRequest {
    pub channel: String,
    pub chaincode_id: String,
    pub function: String,
    pub user: String,
    pub peers: Vec<String>,
    pub args: Vec<Vec<u8>>,
}

impl InvocationRequest {
    pub fn from_json(map: &Map<String, Value>) -> Self {
        Self {
            channel: extract_string(map.get("channel")),
            chaincode_id: extract_string(map.get("ccid")),
            function: extract_string(map.get("fn")),
            user: extract_string(map.get("user")),
            peers: extract_string_list(map.get("peers")),
            args: extract_args_list(map.get("args")),
        }
    }
}

/// Parameters for enrolling an application user with an organization's CA.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentRequest {
    pub user_id: String,
    pub secret: String,
    pub org: String,
}

impl EnrollmentRequest {
    pub fn from_json(map: &Map<String, Value>) -> Self {
        Self {
            user_id: extract_string(map.get("userId")),
            secret: extract_string(map.get("secret")),
            org: extract_string(map.get("org")),
        }
    }
}
