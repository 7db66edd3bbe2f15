//! Catalog response envelope and validation.
//!
//! Every catalog action answers with
//! `{"success": true, "result": ...}` or `{"success": false, "error": {...}}`.
//! [`validate`] turns a raw response into the list of user-facing error
//! messages; an empty list means success.

use serde_json::{json, Map, Value};

/// Sole error when a response could not be decoded at all.
pub const SEND_FAILURE_MESSAGE: &str = "There was a problem sending the request.";

/// Error when the catalog reported a failure without a usable message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "API responded with unknown error.";

/// Undecoded response body as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Wraps a response body.
    pub fn new(body: Vec<u8>) -> Self {
        Self { body }
    }

    /// Decodes the body into a structured value.
    ///
    /// Returns `None` unless the body is a JSON object or array.
    pub fn decode(&self) -> Option<Value> {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Some(value),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for RawResponse {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}

/// Structured error of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiError {
    /// `error.message`
    pub message: Option<String>,
    /// `error.name` (validation messages for the name field)
    pub name: Vec<String>,
    /// `error.id` (validation messages for the id field)
    pub id: Vec<String>,
}

impl ApiError {
    /// Creates an error with a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn from_value(value: &Value) -> Self {
        let text_list = |key: &str| -> Vec<String> {
            match value.get(key) {
                Some(Value::Array(items)) => items.iter().map(text_of).collect(),
                _ => Vec::new(),
            }
        };
        Self {
            message: value.get("message").filter(|m| !m.is_null()).map(text_of),
            name: text_list("name"),
            id: text_list("id"),
        }
    }

    /// Returns the single message shown for this error.
    ///
    /// Precedence: `message`, first `name`, first `id`, generic message.
    pub fn display_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.name.first().cloned())
            .or_else(|| self.id.first().cloned())
            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(message) = &self.message {
            map.insert("message".into(), Value::String(message.clone()));
        }
        if !self.name.is_empty() {
            map.insert("name".into(), json!(self.name));
        }
        if !self.id.is_empty() {
            map.insert("id".into(), json!(self.id));
        }
        Value::Object(map)
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Whether the action succeeded. A missing flag reads as success.
    pub success: bool,
    /// Action result (`null` when absent).
    pub result: Value,
    /// Structured error, if any.
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Creates a successful response.
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// Creates a failed response.
    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(error),
        }
    }

    /// Interprets a decoded value as an envelope.
    pub fn from_value(value: &Value) -> Self {
        let success = value.get("success").and_then(Value::as_bool) != Some(false);
        let error = value
            .get("error")
            .filter(|e| !e.is_null())
            .map(ApiError::from_value);
        Self {
            success,
            result: value.get("result").cloned().unwrap_or(Value::Null),
            error,
        }
    }

    /// Decodes a raw response. `None` when the body is not structured.
    pub fn decode(raw: &RawResponse) -> Option<Self> {
        raw.decode().as_ref().map(Self::from_value)
    }

    /// Returns the error messages of this envelope.
    pub fn errors(&self) -> Vec<String> {
        if self.success {
            return Vec::new();
        }
        let message = self
            .error
            .as_ref()
            .map(ApiError::display_message)
            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
        vec![message]
    }

    /// Serializes the envelope.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("success".into(), Value::Bool(self.success));
        if self.success {
            map.insert("result".into(), self.result.clone());
        }
        if let Some(error) = &self.error {
            map.insert("error".into(), error.to_value());
        }
        Value::Object(map)
    }

    /// Serializes the envelope to JSON bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_value().to_string().into_bytes()
    }
}

/// Validates a raw response and returns its error messages in order.
///
/// An empty list means success. An undecodable body yields only
/// [`SEND_FAILURE_MESSAGE`].
pub fn validate(raw: &RawResponse) -> Vec<String> {
    match ApiResponse::decode(raw) {
        Some(response) => response.errors(),
        None => vec![SEND_FAILURE_MESSAGE.to_string()],
    }
}
