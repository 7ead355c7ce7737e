//! Unified error types for webstash.
//!
//! Every variant renders with a stable code prefix so callers can match on the
//! text of a tool error as well as on the enum.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use serde::{Deserialize, Serialize};

/// Closed classification of failures, decided once at the failure site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Network,
    Timeout,
    UpstreamHttp,
    Internal,
}

/// Unified error types for the webstash engine and server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., page out of range).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Unknown or expired identifier.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Connection-level failure (DNS, refused, reset).
    #[error("NETWORK_ERROR: {message}")]
    Network { message: String, code: Option<String> },

    /// The request timer fired before the transfer finished.
    #[error("FETCH_TIMEOUT: {0}")]
    Timeout(String),

    /// Upstream answered with a non-success status.
    #[error("HTTP_ERROR: HTTP {status}: {message}")]
    UpstreamHttp { status: u16, message: String },

    /// A record is larger than the per-entry cap.
    #[error("ENTRY_TOO_LARGE: {size} bytes exceeds {limit}")]
    EntryTooLarge { size: usize, limit: usize },

    /// Unexpected failure inside the engine.
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::InvalidUrl(_) => ErrorKind::Validation,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Network { .. } => ErrorKind::Network,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::UpstreamHttp { .. } => ErrorKind::UpstreamHttp,
            Error::EntryTooLarge { .. } | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Short machine-readable code, the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Network { .. } => "NETWORK_ERROR",
            Error::Timeout(_) => "FETCH_TIMEOUT",
            Error::UpstreamHttp { .. } => "HTTP_ERROR",
            Error::EntryTooLarge { .. } => "ENTRY_TOO_LARGE",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The display text without its code prefix.
    pub fn message(&self) -> String {
        match self {
            Error::InvalidInput(msg)
            | Error::InvalidUrl(msg)
            | Error::NotFound(msg)
            | Error::Timeout(msg)
            | Error::Internal(msg) => msg.clone(),
            Error::Network { message, .. } => message.clone(),
            Error::UpstreamHttp { status, message } => format!("HTTP {status}: {message}"),
            Error::EntryTooLarge { size, limit } => format!("{size} bytes exceeds {limit}"),
        }
    }

    /// Transport-level code such as `ECONNREFUSED`, if the failure has one.
    pub fn transport_code(&self) -> Option<String> {
        match self {
            Error::Network { code, .. } => code.clone(),
            Error::Timeout(_) => Some("ETIMEDOUT".to_string()),
            _ => None,
        }
    }

    /// Structured `{error: true, ...}` payload for tool results.
    pub fn to_payload(&self) -> ErrorPayload {
        let detail = match self {
            Error::Network { code, .. } => code.clone(),
            Error::UpstreamHttp { status, .. } => Some(status.to_string()),
            _ => None,
        };
        ErrorPayload { error: true, kind: self.kind(), code: self.code().to_string(), message: self.to_string(), detail }
    }
}

/// Explicit error payload returned to callers instead of a crash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error: bool,
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::Network { message, .. } => (-32003, message.clone()),
            Error::Timeout(msg) => (-32006, msg.clone()),
            Error::UpstreamHttp { .. } => (-32008, err.to_string()),
            Error::EntryTooLarge { .. } => (-32007, err.to_string()),
            Error::Internal(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("abc123".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_upstream_display_matches_status_message() {
        let err = Error::UpstreamHttp { status: 404, message: "Not Found".into() };
        assert_eq!(err.to_string(), "HTTP_ERROR: HTTP 404: Not Found");
        assert_eq!(err.kind(), ErrorKind::UpstreamHttp);
        assert_eq!(err.message(), "HTTP 404: Not Found");
        assert_eq!(err.transport_code(), None);
    }

    #[test]
    fn test_transport_codes() {
        let err = Error::Network { message: "connection reset".into(), code: Some("ECONNRESET".into()) };
        assert_eq!(err.transport_code().as_deref(), Some("ECONNRESET"));
        assert_eq!(err.message(), "connection reset");

        let err = Error::Timeout("request timed out".into());
        assert_eq!(err.transport_code().as_deref(), Some("ETIMEDOUT"));
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NotFound("abc123".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);

        let mcp_err: McpError = Error::InvalidInput("page".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_payload_shape() {
        let err = Error::Network { message: "connection refused".into(), code: Some("ECONNREFUSED".into()) };
        let payload = err.to_payload();
        assert!(payload.error);
        assert_eq!(payload.kind, ErrorKind::Network);
        assert_eq!(payload.detail.as_deref(), Some("ECONNREFUSED"));

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "NETWORK_ERROR");
    }
}
