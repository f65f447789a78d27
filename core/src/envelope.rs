//! The JSON wrapper around every response body.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Error};

/// `resultCode` value that marks a successful response.
pub const RESULT_OK: &str = "OK";

/// Decoded response body.
///
/// Any JSON object decodes: missing fields take their empty values, unknown
/// fields are ignored, and `resultCode`/`code`/`message` accept any JSON
/// value, kept in text form (`500` becomes `"500"`, `null` becomes `None`).
/// Only `resultCode == "OK"` is a success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default, deserialize_with = "lenient_text")]
    pub result_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_ok(&self) -> bool {
        self.result_code.as_deref() == Some(RESULT_OK)
    }

    /// The payload on success, the envelope as an `ApiError` otherwise.
    pub fn into_payload(self) -> Result<Value, ApiError> {
        if self.is_ok() {
            return Ok(self.payload);
        }
        Err(ApiError {
            result_code: self.result_code,
            code: self.code,
            message: self.message,
            payload: self.payload,
        })
    }
}

/// Text form of a JSON value as it would appear in a query string:
/// strings unquoted, other scalars and containers as JSON, `null` as `None`.
pub(crate) fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_text(&Value::deserialize(deserializer)?))
}
