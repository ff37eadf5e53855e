//! Normalized view over an HTTP response body.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::error::EnvelopeError;

/// Status code reported before any status has been recorded.
pub const UNSET_STATUS: i32 = -1;

/// Parsed HTTP response: status code plus the JSON object body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// HTTP status, once known.
    status: Option<u16>,
    /// Body parsed as a JSON object.
    raw: Option<Map<String, Value>>,
    /// Last parse failure.
    #[serde(skip)]
    parse_error: Option<EnvelopeError>,
}

impl ResponseEnvelope {
    /// Empty envelope: status unset, nothing parsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Envelope carrying a status and no body yet.
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Record the HTTP status.
    pub fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    /// Parse a raw body. Only a JSON object is accepted.
    ///
    /// On failure the error is logged and kept; the envelope stays unparsed.
    pub fn parse(&mut self, body: &str) -> Result<(), EnvelopeError> {
        let err = match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => {
                self.raw = Some(map);
                self.parse_error = None;
                return Ok(());
            }
            Ok(other) => EnvelopeError::Parse(format!("expected a JSON object, got {}", kind(&other))),
            Err(e) => EnvelopeError::Parse(e.to_string()),
        };

        error!(error = %err, "Failed to parse response body");
        self.raw = None;
        self.parse_error = Some(err.clone());
        Err(err)
    }

    /// Top-level value for `key`: exact match first, then case-insensitive.
    pub fn data(&self, key: &str) -> Option<&Value> {
        let Some(raw) = &self.raw else {
            warn!(key, "Response body not parsed");
            return None;
        };
        lookup(raw, key)
    }

    /// Value for `nested` inside the object found at `key`.
    pub fn spec_data(&self, key: &str, nested: &str) -> Option<&Value> {
        match self.data(key)? {
            Value::Object(inner) => lookup(inner, nested),
            _ => None,
        }
    }

    /// Top-level value for `key` deserialized into `T`.
    pub fn data_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        decode(key, self.data(key)?)
    }

    /// Nested value for `key`/`nested` deserialized into `T`.
    pub fn spec_data_as<T: DeserializeOwned>(&self, key: &str, nested: &str) -> Option<T> {
        decode(nested, self.spec_data(key, nested)?)
    }

    /// Pretty-printed body, `null` while unparsed.
    pub fn display(&self) -> String {
        match &self.raw {
            Some(raw) => serde_json::to_string_pretty(raw).unwrap_or_default(),
            None => Value::Null.to_string(),
        }
    }

    /// HTTP status, or `-1` while unset.
    pub fn status_code(&self) -> i32 {
        self.status.map(i32::from).unwrap_or(UNSET_STATUS)
    }

    /// HTTP status, if recorded.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Parsed body.
    pub fn raw(&self) -> Option<&Map<String, Value>> {
        self.raw.as_ref()
    }

    /// Whether a JSON object has been parsed.
    pub fn is_parsed(&self) -> bool {
        self.raw.is_some()
    }

    /// Last parse failure.
    pub fn parse_error(&self) -> Option<&EnvelopeError> {
        self.parse_error.as_ref()
    }

    /// Whether the recorded status is 2xx.
    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Option<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "Response value has an unexpected type");
            None
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
