//! Total conversion from arbitrary failures into [`OperationError`].
//!
//! Heterogeneous failure shapes are first normalized into a [`RawFailure`];
//! [`OperationError::from_failure`] then classifies each variant. Free-text
//! heuristics are confined to [`classify`] so they can be retired once
//! services emit pre-classified codes.

use std::{error::Error as StdError, io};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{
    context::ErrorContext,
    kind::ErrorKind,
    operation::{OperationError, UNKNOWN_ERROR_MESSAGE},
    upstream::ApiError,
};

/// A failure of any shape, before classification.
#[derive(Debug)]
pub enum RawFailure {
    /// Already classified; passed through untouched.
    Operation(OperationError),
    /// Structured service error exposing its own code and status.
    Upstream(ApiError),
    /// A plain `{code, message}` object, typically deserialized from another process.
    Serialized {
        code: Option<String>,
        message: Option<String>,
        status: Option<u16>,
    },
    /// A native error without a structured code.
    Native { message: String, io_kind: Option<io::ErrorKind> },
    /// Anything else; the rendered value is kept for diagnostics.
    Unknown(String),
}

impl From<OperationError> for RawFailure {
    fn from(error: OperationError) -> Self {
        Self::Operation(error)
    }
}

impl From<ApiError> for RawFailure {
    fn from(error: ApiError) -> Self {
        Self::Upstream(error)
    }
}

impl From<io::Error> for RawFailure {
    fn from(error: io::Error) -> Self {
        Self::Native {
            message: error.to_string(),
            io_kind: Some(error.kind()),
        }
    }
}

impl From<anyhow::Error> for RawFailure {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<OperationError>() {
            Ok(operation) => return Self::Operation(operation),
            Err(error) => error,
        };
        let error = match error.downcast::<ApiError>() {
            Ok(upstream) => return Self::Upstream(upstream),
            Err(error) => error,
        };
        let io_kind = error.chain().find_map(|cause| cause.downcast_ref::<io::Error>()).map(io::Error::kind);
        Self::Native {
            message: format!("{error:#}"),
            io_kind,
        }
    }
}

impl From<Box<dyn StdError + Send + Sync>> for RawFailure {
    fn from(error: Box<dyn StdError + Send + Sync>) -> Self {
        let error = match error.downcast::<OperationError>() {
            Ok(operation) => return Self::Operation(*operation),
            Err(error) => error,
        };
        let error = match error.downcast::<ApiError>() {
            Ok(upstream) => return Self::Upstream(*upstream),
            Err(error) => error,
        };
        match error.downcast::<io::Error>() {
            Ok(io_error) => Self::from(*io_error),
            Err(error) => Self::Native {
                message: error.to_string(),
                io_kind: None,
            },
        }
    }
}

impl From<Value> for RawFailure {
    fn from(value: Value) -> Self {
        let Value::Object(ref fields) = value else {
            return Self::Unknown(render_unknown(&value));
        };
        if fields.contains_key("kind")
            && let Ok(operation) = serde_json::from_value::<OperationError>(value.clone())
        {
            return Self::Operation(operation);
        }
        let code = fields.get("code").and_then(value_as_text);
        let message = fields.get("message").and_then(Value::as_str).map(str::to_string);
        if code.is_none() && message.is_none() {
            return Self::Unknown(render_unknown(&value));
        }
        let status = ["status", "statusCode", "status_code"]
            .iter()
            .find_map(|key| fields.get(*key))
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok());
        Self::Serialized { code, message, status }
    }
}

impl From<String> for RawFailure {
    fn from(value: String) -> Self {
        Self::Unknown(value)
    }
}

impl From<&str> for RawFailure {
    fn from(value: &str) -> Self {
        Self::Unknown(value.to_string())
    }
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn render_unknown(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl OperationError {
    /// Classify any failure into an operation error. Never panics.
    ///
    /// Precedence: an existing [`OperationError`] is returned unchanged; a
    /// structured upstream error or serialized `{code, message}` object is
    /// mapped by code and then by message; a native error is mapped by its
    /// I/O kind and message; anything else becomes a service error carrying
    /// the original value under `originalError`.
    pub fn from_failure(raw: impl Into<RawFailure>, context: Option<ErrorContext>) -> OperationError {
        let context = context.unwrap_or_default();
        match raw.into() {
            RawFailure::Operation(error) => error,
            RawFailure::Upstream(upstream) => {
                let context = match upstream.details {
                    Some(details) => context.with("details", details),
                    None => context,
                };
                from_coded(Some(upstream.code), upstream.message, Some(upstream.status), context)
            }
            RawFailure::Serialized { code, message, status } => {
                from_coded(code, message.unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()), status, context)
            }
            RawFailure::Native { message, io_kind } => {
                let kind = io_kind
                    .and_then(classify_io_kind)
                    .or_else(|| classify(None, &message))
                    .unwrap_or(ErrorKind::ServiceError);
                OperationError::new(kind, message).with_context(context)
            }
            RawFailure::Unknown(original) => {
                OperationError::new(ErrorKind::ServiceError, UNKNOWN_ERROR_MESSAGE).with_context(context.with("originalError", original))
            }
        }
    }
}

fn from_coded(code: Option<String>, message: String, status: Option<u16>, context: ErrorContext) -> OperationError {
    let context = context.merge(identifiers_from_message(&message));
    match classify(Some(code.as_deref().unwrap_or_default()), &message) {
        Some(kind) => OperationError::new(kind, message).with_context(context),
        None => {
            let context = match code {
                Some(code) if !code.is_empty() => context.with("upstreamCode", code),
                _ => context,
            };
            let error = OperationError::new(ErrorKind::ServiceError, message).with_context(context);
            match status {
                Some(status) => error.preserve_status(status),
                None => error,
            }
        }
    }
}

fn classify_io_kind(kind: io::ErrorKind) -> Option<ErrorKind> {
    match kind {
        io::ErrorKind::NotFound => Some(ErrorKind::FileNotFound),
        io::ErrorKind::PermissionDenied => Some(ErrorKind::PermissionDenied),
        _ => None,
    }
}

/// Translate upstream wording into a kind.
///
/// `code` is `Some` for structured failures (an upstream error or a serialized
/// object) and `None` for native errors, which only match system-level
/// markers.
pub(crate) fn classify(code: Option<&str>, message: &str) -> Option<ErrorKind> {
    let Some(code) = code else {
        return classify_native_message(message);
    };
    if let Ok(kind) = code.parse::<ErrorKind>() {
        return Some(kind);
    }
    classify_upstream_code(code).or_else(|| classify_resource_message(message))
}

fn classify_upstream_code(code: &str) -> Option<ErrorKind> {
    match code {
        "VALIDATION_ERROR" | "INVALID_INPUT" | "BAD_REQUEST" | "INVALID_REQUEST" => Some(ErrorKind::InvalidParamValue),
        "MISSING_PARAMETER" | "MISSING_REQUIRED_FIELD" => Some(ErrorKind::MissingRequiredParam),
        "CONFLICT" | "DUPLICATE" | "DUPLICATE_ENTRY" => Some(ErrorKind::AlreadyExists),
        "FORBIDDEN" | "UNAUTHORIZED" => Some(ErrorKind::PermissionDenied),
        "RATE_LIMITED" | "TOO_MANY_REQUESTS" => Some(ErrorKind::RateLimitExceeded),
        "SERVICE_UNAVAILABLE" | "UPSTREAM_UNAVAILABLE" => Some(ErrorKind::DependencyFailed),
        _ => None,
    }
}

fn classify_resource_message(message: &str) -> Option<ErrorKind> {
    if message.contains("Project not found") || message.contains("Project with ID") {
        Some(ErrorKind::ProjectNotFound)
    } else if message.contains("Ticket with ID") {
        Some(ErrorKind::TicketNotFound)
    } else if message.contains("Prompt with ID") {
        Some(ErrorKind::PromptNotFound)
    } else if message.contains("Agent with ID") {
        Some(ErrorKind::AgentNotFound)
    } else {
        None
    }
}

fn classify_native_message(message: &str) -> Option<ErrorKind> {
    let lowered = message.to_lowercase();
    if message.contains("ENOENT") {
        Some(ErrorKind::FileNotFound)
    } else if message.contains("EACCES") || message.contains("EPERM") {
        Some(ErrorKind::PermissionDenied)
    } else if lowered.contains("database") || lowered.contains("sqlite") {
        Some(ErrorKind::DatabaseError)
    } else {
        None
    }
}

static RESOURCE_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(Project|Ticket|Prompt|Agent) with ID\s+([A-Za-z0-9_-]+)").expect("resource id regex should compile"));

fn identifiers_from_message(message: &str) -> ErrorContext {
    RESOURCE_ID_REGEX
        .captures_iter(message)
        .fold(ErrorContext::default(), |context, captures| {
            let key = format!("{}Id", captures[1].to_lowercase());
            context.with(key, &captures[2])
        })
}
