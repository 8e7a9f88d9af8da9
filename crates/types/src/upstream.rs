//! Error shape raised by domain services.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured failure raised by a domain service (project, ticket, prompt, hook stores).
///
/// Services report their own status and a short code such as `NOT_FOUND` or
/// `VALIDATION_ERROR`; the operation-error conversion translates these into
/// the tool taxonomy.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ApiError {
    /// Transport status the service associated with the failure.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
    /// Service-specific code.
    pub code: String,
    /// Optional structured details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Create a service error.
    pub fn new(status: u16, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// 404 with code `NOT_FOUND`.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message, "NOT_FOUND")
    }

    /// 400 with code `VALIDATION_ERROR`.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(400, message, "VALIDATION_ERROR")
    }
}
