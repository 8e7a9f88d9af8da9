//! Domain service collaborators used by the multi-step tools.
//!
//! Implementations report failures as `anyhow::Error`, typically wrapping an
//! [`ApiError`](toolsmith_types::ApiError) so the failure can be classified.

use serde::{Deserialize, Serialize};

use crate::lookup::ProjectSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub project_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTask {
    pub id: String,
    pub ticket_id: String,
    pub content: String,
}

/// What a hook runs and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookDefinition {
    pub event: String,
    pub command: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(flatten)]
    pub definition: HookDefinition,
}

/// Outcome of a project file sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub project_id: String,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

#[async_trait::async_trait]
pub trait TicketService: Send + Sync {
    async fn create_ticket(&self, project_id: &str, draft: &TicketDraft) -> anyhow::Result<Ticket>;
    async fn delete_ticket(&self, ticket_id: &str) -> anyhow::Result<()>;
    async fn create_task(&self, ticket_id: &str, content: &str) -> anyhow::Result<TicketTask>;
    async fn delete_task(&self, ticket_id: &str, task_id: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait HookService: Send + Sync {
    /// Hook registered under `name` in the project, if any.
    async fn find_hook(&self, project_id: &str, name: &str) -> anyhow::Result<Option<Hook>>;
    async fn create_hook(&self, project_id: &str, name: &str, definition: &HookDefinition) -> anyhow::Result<Hook>;
    async fn update_hook(&self, hook_id: &str, definition: &HookDefinition) -> anyhow::Result<Hook>;
    async fn delete_hook(&self, hook_id: &str) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
pub trait ProjectService: Send + Sync {
    async fn get_project(&self, project_id: &str) -> anyhow::Result<Option<ProjectSummary>>;
    /// Reconcile tracked files with the project directory.
    async fn sync_files(&self, project_id: &str) -> anyhow::Result<SyncSummary>;
}
