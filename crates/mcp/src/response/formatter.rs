//! Error rendering with optional live enrichment.

use std::sync::Arc;

use rmcp::model::{CallToolResult, Content};
use toolsmith_types::OperationError;

use super::enrichment;
use crate::{config::EnrichmentSettings, lookup::ResourceLookup};

/// Render the base error text.
///
/// `Error: {message}`, a blank line, `Suggestion: {suggestion}`, and a pretty
/// JSON dump of the context when one is attached.
pub fn format_error_text(error: &OperationError) -> String {
    let mut text = format!("Error: {}\n\nSuggestion: {}", error.message(), error.suggestion());
    text.push_str(&context_section(error));
    text
}

pub(crate) fn context_section(error: &OperationError) -> String {
    error
        .context()
        .and_then(|context| serde_json::to_string_pretty(context).ok())
        .map(|json| format!("\n\nContext: {json}"))
        .unwrap_or_default()
}

/// Turns operation errors into tool responses.
///
/// Without a lookup the formatter only renders the base text. With one, known
/// not-found errors are enriched with listings of valid alternatives; a lookup
/// failure never hides the original error.
#[derive(Clone, Default)]
pub struct ErrorResponseFormatter {
    lookup: Option<Arc<dyn ResourceLookup>>,
    settings: EnrichmentSettings,
}

impl std::fmt::Debug for ErrorResponseFormatter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorResponseFormatter")
            .field("has_lookup", &self.lookup.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl ErrorResponseFormatter {
    pub fn new(settings: EnrichmentSettings) -> Self {
        Self { lookup: None, settings }
    }

    /// Enable enrichment backed by `lookup`.
    pub fn with_lookup(mut self, lookup: Arc<dyn ResourceLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn settings(&self) -> &EnrichmentSettings {
        &self.settings
    }

    /// Render `error` into an error tool result.
    pub async fn format(&self, error: &OperationError) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.render(error).await)])
    }

    /// Render `error` to text, enriched when possible.
    pub async fn render(&self, error: &OperationError) -> String {
        let Some(lookup) = self.lookup.as_deref().filter(|_| self.settings.enabled) else {
            return format_error_text(error);
        };

        match enrichment::enrich(lookup, error, &self.settings).await {
            Ok(Some(text)) => text,
            Ok(None) => format_error_text(error),
            Err(lookup_error) => {
                tracing::warn!(
                    kind = %error.kind(),
                    error = %lookup_error,
                    "enrichment lookup failed; using base error text"
                );
                format_error_text(error)
            }
        }
    }
}
