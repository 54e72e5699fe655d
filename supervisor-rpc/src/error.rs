//! Error types for the supervisord client.

use thiserror::Error;

/// Errors that can occur while polling supervisord.
///
/// Every variant means the upstream is unavailable for this poll; callers
/// are expected to recover locally rather than propagate.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Could not connect to the control API.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for a response.
    #[error("Request timed out")]
    Timeout,

    /// The HTTP layer returned a non-success status.
    #[error("HTTP request failed: status {0}")]
    Http(u16),

    /// Any other transport-level failure.
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body was not a usable XML-RPC response.
    #[error("Malformed response: {0}")]
    Malformed(#[from] XmlRpcError),

    /// supervisord answered with an XML-RPC fault.
    #[error("Remote fault {code}: {message}")]
    Fault { code: i64, message: String },
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Connection(err.to_string())
        } else {
            UpstreamError::Request(err.to_string())
        }
    }
}

/// Errors from decoding an XML-RPC document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum XmlRpcError {
    /// The document is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// A tag appeared where another was required.
    #[error("expected {expected}, found {found}")]
    Unexpected { expected: String, found: String },

    /// The document ended before the response was complete.
    #[error("unexpected end of document")]
    UnexpectedEof,

    /// A scalar could not be parsed as its declared type.
    #[error("invalid {kind} value: {value:?}")]
    InvalidScalar { kind: &'static str, value: String },

    /// A `<value>` child that is not an XML-RPC type.
    #[error("unknown value type <{0}>")]
    UnknownType(String),

    /// The method returned something other than the expected shape.
    #[error("unexpected result shape: {0}")]
    Shape(String),
}
