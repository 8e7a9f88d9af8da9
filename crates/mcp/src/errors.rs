//! Protocol-level error mapping.

use rmcp::model::ErrorData;
use serde_json::{Value, json};
use toolsmith_types::OperationError;

fn build_error_data(error: &OperationError) -> Value {
    let context = error
        .context()
        .and_then(|context| serde_json::to_value(context).ok())
        .unwrap_or_else(|| json!({}));
    json!({
        "error_code": error.kind().as_str(),
        "category": error.category().to_string(),
        "message": error.message(),
        "context": context,
        "retryable": error.is_retryable(),
        "suggested_action": error.suggestion(),
        "status": error.status(),
        "timestamp": error.timestamp().to_rfc3339(),
        "correlation_id": format!("operation-{}", error.timestamp().timestamp_millis()),
    })
}

/// Convert an operation error into an MCP protocol error.
///
/// The JSON-RPC code follows the transport status: 400 is invalid params,
/// 404 is resource not found, 403 and 409 are invalid requests, anything
/// else is an internal error. The structured payload travels in `data`.
pub fn error_data(error: &OperationError) -> ErrorData {
    let message = error.message().to_string();
    let data = Some(build_error_data(error));
    match error.status() {
        400 => ErrorData::invalid_params(message, data),
        404 => ErrorData::resource_not_found(message, data),
        403 | 409 => ErrorData::invalid_request(message, data),
        _ => ErrorData::internal_error(message, data),
    }
}
