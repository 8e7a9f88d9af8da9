//! Tool-server infrastructure for Toolsmith.
//!
//! This crate turns [`OperationError`](toolsmith_types::OperationError)s into
//! agent-facing responses (optionally enriched with live alternatives),
//! maps them onto MCP protocol errors, loads server configuration, and hosts
//! the multi-step tool handlers that run on the transaction engine.

pub mod config;
pub mod errors;
pub mod lookup;
pub mod response;
pub mod tools;

pub use config::{ConfigError, EnrichmentSettings, ToolServerConfig};
pub use errors::error_data;
pub use lookup::{AgentSummary, Alternative, FileSummary, ProjectSummary, PromptSummary, ResourceLookup, TicketSummary};
pub use response::{ErrorResponseFormatter, format_error_text, respond, response_text, success_result};
pub use tools::{ToolHandlers, ToolServices};
