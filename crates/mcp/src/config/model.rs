//! Data models for tool server configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolsmith_engine::TransactionOptions;

/// Default cap on listed alternatives in an enriched error.
pub const DEFAULT_MAX_ALTERNATIVES: usize = 10;
/// Default cap on each file suggestion group.
pub const DEFAULT_MAX_FILE_SUGGESTIONS: usize = 5;

/// Tool server configuration.
///
/// Every section is optional in the file; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolServerConfig {
    /// Defaults applied to every multi-step tool transaction.
    pub transaction: TransactionOptions,
    /// Error response enrichment.
    pub enrichment: EnrichmentSettings,
}

/// Controls live alternative listings in error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EnrichmentSettings {
    /// Whether not-found errors are enriched at all.
    pub enabled: bool,
    /// Maximum alternatives listed before the overflow note.
    pub max_alternatives: usize,
    /// Maximum entries in each file suggestion group.
    pub max_file_suggestions: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            max_file_suggestions: DEFAULT_MAX_FILE_SUGGESTIONS,
        }
    }
}

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] crate::config::ValidationError),
}
