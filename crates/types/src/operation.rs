//! The structured failure value returned by every tool operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    context::ErrorContext,
    kind::{ErrorCategory, ErrorKind, GENERIC_SUGGESTION},
};

/// Message used when a failure carries no usable text.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Result alias for tool operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Classified, self-describing failure.
///
/// The suggestion and status are resolved from the [`ErrorKind`] when the
/// error is built, and the timestamp is stamped exactly once. Fields are only
/// readable through accessors, so an error cannot be altered after it has been
/// handed to a caller.
///
/// ```
/// use toolsmith_types::{ErrorContext, ErrorKind, OperationError};
///
/// let err = OperationError::new(ErrorKind::ProjectNotFound, "Project 7 not found")
///     .with_context(ErrorContext::for_tool("project_manager", "get").with("projectId", 7));
/// assert_eq!(err.status(), 404);
/// assert!(!err.suggestion().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ErrorRecord")]
#[error("[{kind}] {message}")]
pub struct OperationError {
    kind: ErrorKind,
    message: String,
    suggestion: String,
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<ErrorContext>,
    timestamp: DateTime<Utc>,
}

/// Wire form of an [`OperationError`].
///
/// Errors that crossed a process boundary are rebuilt through
/// [`From<ErrorRecord>`] so a blank message or suggestion, or a status outside
/// 400..600, cannot leak into a deserialized error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorRecord {
    kind: ErrorKind,
    #[serde(default)]
    message: String,
    #[serde(default)]
    suggestion: String,
    #[serde(default)]
    status: Option<u16>,
    #[serde(default)]
    context: Option<ErrorContext>,
    #[serde(default = "Utc::now")]
    timestamp: DateTime<Utc>,
}

impl From<ErrorRecord> for OperationError {
    fn from(record: ErrorRecord) -> Self {
        let mut error = OperationError::new(record.kind, record.message);
        if !record.suggestion.trim().is_empty() {
            error.suggestion = record.suggestion;
        }
        if let Some(status) = record.status {
            error = error.preserve_status(status);
        }
        if let Some(context) = record.context {
            error = error.with_context(context);
        }
        error.timestamp = record.timestamp;
        error
    }
}

impl OperationError {
    /// Create an error of the given kind.
    ///
    /// A blank message is replaced with [`UNKNOWN_ERROR_MESSAGE`].
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNKNOWN_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            kind,
            message,
            suggestion: kind.suggestion().to_string(),
            status: kind.status(),
            context: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach diagnostic context. An empty context is dropped.
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = (!context.is_empty()).then_some(context);
        self
    }

    /// Replace the kind's default suggestion.
    ///
    /// Blank text falls back to [`GENERIC_SUGGESTION`] so the suggestion is never empty.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        let suggestion = suggestion.into();
        self.suggestion = if suggestion.trim().is_empty() {
            GENERIC_SUGGESTION.to_string()
        } else {
            suggestion
        };
        self
    }

    /// Keep a status reported by an upstream service instead of the kind's own.
    pub(crate) fn preserve_status(mut self, status: u16) -> Self {
        if (400..600).contains(&status) {
            self.status = status;
        }
        self
    }

    /// Shorthand for a missing required parameter.
    pub fn missing_param(parameter: &str, context: ErrorContext) -> Self {
        Self::new(ErrorKind::MissingRequiredParam, format!("Missing required parameter: {parameter}"))
            .with_context(context.with_parameter(parameter, Value::Null))
    }

    /// Shorthand for an invalid parameter value.
    pub fn invalid_param(parameter: &str, value: impl Serialize, reason: &str, context: ErrorContext) -> Self {
        Self::new(ErrorKind::InvalidParamValue, format!("Invalid value for parameter '{parameter}': {reason}"))
            .with_context(context.with_parameter(parameter, value).with_validation_error(parameter, reason))
    }

    /// Failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Shorthand for `self.kind().category()`.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Recovery suggestion, never empty.
    pub fn suggestion(&self) -> &str {
        &self.suggestion
    }

    /// Transport status.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Diagnostic context, if any was attached.
    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    /// Time the error was constructed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the kind is safe to retry unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Structured JSON snapshot used in protocol error payloads.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "kind": self.kind.as_str(),
                "message": self.message,
                "suggestion": self.suggestion,
                "status": self.status,
            })
        })
    }
}
