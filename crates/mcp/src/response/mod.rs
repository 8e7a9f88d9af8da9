//! Agent-facing tool responses.
//!
//! Every tool call resolves to an MCP [`CallToolResult`]: pretty JSON text on
//! success, or the rendered error text from [`ErrorResponseFormatter`] on
//! failure.

mod enrichment;
mod formatter;

pub use formatter::{ErrorResponseFormatter, format_error_text};

use rmcp::model::{CallToolResult, Content, RawContent};
use serde::Serialize;
use serde_json::Value;
use toolsmith_types::{OperationError, OperationResult};

/// Successful result carrying pretty-printed JSON as text content.
pub fn success_result(value: &Value) -> CallToolResult {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    CallToolResult::success(vec![Content::text(text)])
}

/// All text content of `result` joined with newlines.
pub fn response_text(result: &CallToolResult) -> String {
    result
        .content
        .iter()
        .filter_map(|content| match &content.raw {
            RawContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a tool outcome into a tool result.
pub async fn respond<T: Serialize>(result: OperationResult<T>, formatter: &ErrorResponseFormatter) -> CallToolResult {
    match result {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(value) => success_result(&value),
            Err(error) => formatter.format(&OperationError::from_failure(anyhow::Error::from(error), None)).await,
        },
        Err(error) => formatter.format(&error).await,
    }
}
