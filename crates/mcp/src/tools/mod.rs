//! Multi-step tool handlers built on the transaction engine.
//!
//! Each handler validates its request, runs its writes as a compensable
//! transaction and reports failures as [`OperationError`]s. [`ToolHandlers`]
//! dispatches `(tool, action)` calls and renders every outcome into a
//! [`CallToolResult`].

mod hooks;
mod projects;
mod services;
mod tickets;

use std::sync::Arc;

use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use serde_json::Value;
use toolsmith_engine::TransactionOptions;
use toolsmith_types::{ErrorContext, ErrorKind, OperationError, OperationResult};

pub use hooks::{HookUpsert, UPSERT, UpsertHookRequest, upsert_hook};
pub use projects::{ProjectSync, SYNC, SyncProjectRequest, sync_project};
pub use services::{Hook, HookDefinition, HookService, ProjectService, SyncSummary, Ticket, TicketDraft, TicketService, TicketTask};
pub use tickets::{CREATE_WITH_TASKS, CreateTicketWithTasksRequest, MAX_TASKS_PER_TICKET, TicketWithTasks, create_ticket_with_tasks};

use crate::{
    config::{ConfigError, ToolServerConfig, load_config},
    lookup::ResourceLookup,
    response::{ErrorResponseFormatter, respond},
};

pub const PROJECT_MANAGER: &str = "project_manager";
pub const TICKET_MANAGER: &str = "ticket_manager";
pub const PROMPT_MANAGER: &str = "prompt_manager";
pub const AGENT_MANAGER: &str = "agent_manager";
pub const HOOK_MANAGER: &str = "hook_manager";

/// Domain collaborators the handlers call into.
#[derive(Clone)]
pub struct ToolServices {
    pub tickets: Arc<dyn TicketService>,
    pub hooks: Arc<dyn HookService>,
    pub projects: Arc<dyn ProjectService>,
    pub lookup: Arc<dyn ResourceLookup>,
}

/// Dispatches tool calls and renders their outcomes.
pub struct ToolHandlers {
    services: ToolServices,
    options: TransactionOptions,
    formatter: ErrorResponseFormatter,
}

impl ToolHandlers {
    pub fn new(services: ToolServices, config: &ToolServerConfig) -> Self {
        let formatter = ErrorResponseFormatter::new(config.enrichment.clone()).with_lookup(Arc::clone(&services.lookup));
        Self {
            services,
            options: config.transaction.clone(),
            formatter,
        }
    }

    /// Build handlers from the configuration at [`default_config_path`](crate::config::default_config_path).
    pub fn from_default_config(services: ToolServices) -> Result<Self, ConfigError> {
        let config = load_config()?;
        Ok(Self::new(services, &config))
    }

    pub fn formatter(&self) -> &ErrorResponseFormatter {
        &self.formatter
    }

    /// Run `tool`/`action` with JSON `arguments` and render the outcome.
    pub async fn call(&self, tool: &str, action: &str, arguments: Value) -> CallToolResult {
        tracing::debug!(tool, action, "tool call");
        match (tool, action) {
            (TICKET_MANAGER, CREATE_WITH_TASKS) => respond(self.create_ticket_with_tasks(arguments).await, &self.formatter).await,
            (HOOK_MANAGER, UPSERT) => respond(self.upsert_hook(arguments).await, &self.formatter).await,
            (PROJECT_MANAGER, SYNC) => respond(self.sync_project(arguments).await, &self.formatter).await,
            _ => respond::<Value>(Err(unknown_action(tool, action)), &self.formatter).await,
        }
    }

    async fn create_ticket_with_tasks(&self, arguments: Value) -> OperationResult<TicketWithTasks> {
        let request = parse_arguments(TICKET_MANAGER, CREATE_WITH_TASKS, arguments)?;
        create_ticket_with_tasks(Arc::clone(&self.services.tickets), request, self.options.clone()).await
    }

    async fn upsert_hook(&self, arguments: Value) -> OperationResult<HookUpsert> {
        let request = parse_arguments(HOOK_MANAGER, UPSERT, arguments)?;
        upsert_hook(Arc::clone(&self.services.hooks), request, self.options.clone()).await
    }

    async fn sync_project(&self, arguments: Value) -> OperationResult<ProjectSync> {
        let request = parse_arguments(PROJECT_MANAGER, SYNC, arguments)?;
        sync_project(Arc::clone(&self.services.projects), request, self.options.clone()).await
    }
}

fn parse_arguments<T: DeserializeOwned>(tool: &str, action: &str, arguments: Value) -> OperationResult<T> {
    serde_json::from_value(arguments).map_err(|error| {
        OperationError::new(ErrorKind::InvalidParamValue, format!("Invalid arguments for {tool} '{action}': {error}"))
            .with_context(ErrorContext::for_tool(tool, action).with_validation_error("arguments", error.to_string()))
    })
}

fn unknown_action(tool: &str, action: &str) -> OperationError {
    OperationError::new(ErrorKind::InvalidParamValue, format!("Unknown action '{action}' for tool '{tool}'"))
        .with_context(ErrorContext::for_tool(tool, action).with_parameter("action", action))
}
