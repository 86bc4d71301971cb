//! Uniform response envelope for every bridge route

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Something a handler wants to send back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Output of an SDK call; embedded as JSON when it parses as JSON.
    Raw(Vec<u8>),
    /// Text composed by the dispatcher.
    Message(String),
}

impl From<&str> for Payload {
    fn from(msg: &str) -> Self {
        Payload::Message(msg.to_string())
    }
}

impl From<String> for Payload {
    fn from(msg: String) -> Self {
        Payload::Message(msg)
    }
}

impl Payload {
    fn into_value(self) -> Value {
        match self {
            Payload::Raw(bytes) => match serde_json::from_slice::<Value>(&bytes) {
                Ok(parsed) => parsed,
                Err(_) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
            },
            Payload::Message(msg) => Value::String(msg),
        }
    }
}

/// `{isSuccess, ts, payload}` body written by every route.
///
/// `is_success` is always `true`. Clients that want to know whether an
/// operation failed have to read `payload`.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseEnvelope {
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
    pub ts: DateTime<Utc>,
    pub payload: Value,
}

impl ResponseEnvelope {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            is_success: true,
            ts: Utc::now(),
            payload: payload.into().into_value(),
        }
    }
}

/// Build the HTTP response for `payload` with the given status.
pub fn render(status: StatusCode, payload: impl Into<Payload>) -> Response {
    (status, Json(ResponseEnvelope::new(payload))).into_response()
}
