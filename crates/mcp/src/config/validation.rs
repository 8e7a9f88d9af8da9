//! Configuration validation.

use thiserror::Error;
use tracing::debug;

use crate::config::ToolServerConfig;

/// Upper bound for `transaction.maxRetries`.
pub const MAX_TRANSACTION_RETRIES: u32 = 10;
/// Upper bound for `transaction.retryDelayMs`.
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Validate the entire configuration.
pub fn validate_config(config: &ToolServerConfig) -> Result<(), ValidationError> {
    let transaction = &config.transaction;
    if transaction.max_retries > MAX_TRANSACTION_RETRIES {
        return Err(ValidationError::OutOfRange {
            field: "transaction.maxRetries".to_string(),
            reason: format!("must be at most {MAX_TRANSACTION_RETRIES}, got {}", transaction.max_retries),
        });
    }
    if transaction.retry_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(ValidationError::OutOfRange {
            field: "transaction.retryDelayMs".to_string(),
            reason: format!("must be at most {MAX_RETRY_DELAY_MS}, got {}", transaction.retry_delay_ms),
        });
    }

    let enrichment = &config.enrichment;
    for (field, value) in [
        ("enrichment.maxAlternatives", enrichment.max_alternatives),
        ("enrichment.maxFileSuggestions", enrichment.max_file_suggestions),
    ] {
        if value == 0 {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
    }

    debug!(
        max_retries = transaction.max_retries,
        retry_delay_ms = transaction.retry_delay_ms,
        enrichment = enrichment.enabled,
        "validated tool server configuration"
    );
    Ok(())
}

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Value out of range for '{field}': {reason}")]
    OutOfRange { field: String, reason: String },
}
