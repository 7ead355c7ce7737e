//! Tool-boundary error mapping.
//!
//! Validation failures become MCP `invalid params` errors. Everything else is
//! a tool result flagged `is_error` carrying `{error: true, code, message}`.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use webstash_core::{Error, ErrorKind};

/// Converts an engine error into the tool response.
pub fn tool_failure(err: Error) -> Result<CallToolResult, McpError> {
    if err.kind() == ErrorKind::Validation {
        return Err(err.into());
    }

    tracing::debug!(code = err.code(), error = %err, "tool call failed");
    let payload = serde_json::to_string_pretty(&err.to_payload())
        .map_err(|e| McpError::internal_error(format!("failed to serialize error: {e}"), None))?;
    Ok(CallToolResult::error(vec![Content::text(payload)]))
}

/// Pretty JSON success result.
pub fn json_success<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("failed to serialize output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Tool output for an engine result.
pub fn respond<T: Serialize>(result: Result<T, Error>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => json_success(&value),
        Err(err) => tool_failure(err),
    }
}
