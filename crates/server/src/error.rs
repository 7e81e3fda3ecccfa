//! Structured errors raised by the command tools themselves.
//!
//! Failures from the cache, the store and the fetch client arrive as
//! `hamclub_core::Error`; these cover what the tools add on top.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Command-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The POTA API answered with an error message instead of data.
    #[error("POTA_ERROR: error while querying the pota website for {subject}: {message}")]
    Pota { subject: String, message: String },

    /// The POTA API answered with JSON in an unexpected shape.
    #[error("POTA_ERROR: unexpected response for {subject}: {reason}")]
    PotaShape { subject: String, reason: String },

    /// A fetch succeeded but the body is not an image the tool can use.
    #[error("NOT_AN_IMAGE: {url} did not return an image: {reason}")]
    NotAnImage { url: String, reason: String },

    /// The uploaded attachment could not be decoded.
    #[error("INVALID_ATTACHMENT: {0}")]
    Attachment(String),

    /// A tool result could not be serialized.
    #[error("INTERNAL: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let code = match &err {
            ToolError::Pota { .. } | ToolError::PotaShape { .. } => -32009,
            ToolError::NotAnImage { .. } => -32010,
            ToolError::Attachment(_) => -32602,
            ToolError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pota_error_message() {
        let err = ToolError::Pota { subject: "park US-0000".into(), message: "Park not found".into() };
        assert_eq!(
            err.to_string(),
            "POTA_ERROR: error while querying the pota website for park US-0000: Park not found"
        );
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32009);
    }

    #[test]
    fn test_not_an_image_error() {
        let err = ToolError::NotAnImage { url: "https://example.com/map.svg".into(), reason: "invalid SVG".into() };
        assert_eq!(err.to_string(), "NOT_AN_IMAGE: https://example.com/map.svg did not return an image: invalid SVG");
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32010);
    }

    #[test]
    fn test_attachment_error_code() {
        let mcp_err: McpError = ToolError::Attachment("bad base64".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }
}
