//! Envelope and message classification
//!
//! Every frame carries one JSON object. Its variant is implied by which keys
//! are present:
//!
//! | Variant      | `method` | `id` | `result` / `error` |
//! |--------------|----------|------|--------------------|
//! | Request      | yes      | yes  | no                 |
//! | Notification | yes      | no   | no                 |
//! | Response     | no       | yes  | exactly one        |

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Identifier correlating a Request with its Response
pub type RequestId = u64;

/// One JSON object on the wire
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Method name (Request / Notification)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Call arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Correlation id (Request and its Response)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// Success payload; `Some(Value::Null)` when the key is present with `null`
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,

    /// Failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Distinguishes `"result": null` from an absent `result` key
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Error object carried by a failure Response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code, if the sender supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    /// Human-readable description
    #[serde(default)]
    pub message: String,
}

impl RpcError {
    /// Create an error with a code
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "RPC error {code}: {}", self.message),
            None => write!(f, "RPC error: {}", self.message),
        }
    }
}

impl std::error::Error for RpcError {}

/// A frame body that is not a valid envelope
///
/// Only the offending frame is discarded; the connection stays up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload is not valid JSON, or a key has the wrong type
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Payload is valid JSON but not an object
    #[error("Envelope is not a JSON object")]
    NotAnObject,

    /// Neither `method` nor `result`/`error` present
    #[error("Envelope has neither method nor result/error")]
    MissingMethod,

    /// A Response without an `id`
    #[error("Response is missing its id")]
    MissingId,

    /// A Response carrying both `result` and `error`
    #[error("Response {0} carries both result and error")]
    AmbiguousResponse(RequestId),

    /// A Request/Notification carrying `result` or `error`
    #[error("Envelope for method '{0}' carries result/error")]
    MixedEnvelope(String),
}

/// A classified envelope
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// A call that expects a Response
    Request {
        /// Correlation id to echo in the Response
        id: RequestId,
        /// Method name
        method: String,
        /// Arguments; `{}` when absent
        params: Value,
    },
    /// A call that must not be answered
    Notification {
        /// Method name
        method: String,
        /// Arguments; `{}` when absent
        params: Value,
    },
    /// The answer to a Request
    Response {
        /// Id of the Request being answered
        id: RequestId,
        /// `Ok(result)` or `Err(error)`
        outcome: Result<Value, RpcError>,
    },
}

impl Message {
    /// Parse a frame payload into a classified message
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        Envelope::from_slice(payload)?.classify()
    }

    /// Method name, for Requests and Notifications
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Notification { method, .. } => Some(method),
            Self::Response { .. } => None,
        }
    }
}

impl Envelope {
    /// Build a Request envelope
    pub fn request(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Self {
            method: Some(method.into()),
            params: Some(params),
            id: Some(id),
            ..Default::default()
        }
    }

    /// Build a Notification envelope
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: Some(method.into()),
            params: Some(params),
            ..Default::default()
        }
    }

    /// Build a success Response envelope
    #[must_use]
    pub fn response_ok(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            result: Some(result),
            ..Default::default()
        }
    }

    /// Build a failure Response envelope
    #[must_use]
    pub fn response_err(id: RequestId, error: RpcError) -> Self {
        Self {
            id: Some(id),
            error: Some(error),
            ..Default::default()
        }
    }

    /// Deserialize an envelope from a frame payload
    pub fn from_slice(payload: &[u8]) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        if !value.is_object() {
            return Err(ProtocolError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidJson(e.to_string()))
    }

    /// Determine which variant this envelope is
    pub fn classify(self) -> Result<Message, ProtocolError> {
        let Self {
            method,
            params,
            id,
            result,
            error,
        } = self;

        if let Some(method) = method {
            if result.is_some() || error.is_some() {
                return Err(ProtocolError::MixedEnvelope(method));
            }
            let params = params.unwrap_or_else(|| Value::Object(Map::new()));
            return Ok(match id {
                Some(id) => Message::Request { id, method, params },
                None => Message::Notification { method, params },
            });
        }

        let outcome = match (result, error) {
            (Some(_), Some(_)) => {
                return Err(id.map_or(ProtocolError::MissingId, ProtocolError::AmbiguousResponse))
            }
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(error),
            (None, None) => return Err(ProtocolError::MissingMethod),
        };

        let id = id.ok_or(ProtocolError::MissingId)?;
        Ok(Message::Response { id, outcome })
    }
}
