//! MCP tool implementations.
//!
//! This module contains all tools exposed by the hamclub server. Each
//! `*_impl` function takes the shared state it needs and returns plain
//! JSON (plus image content where relevant).

pub mod club;
pub mod conditions;
pub mod pota;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_content<T: Serialize>(output: &T) -> Result<Content, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(Content::text(json))
}

/// A successful result carrying only the JSON output.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![json_content(output)?]))
}
