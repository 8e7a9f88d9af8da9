//! Read-only listings used to suggest valid alternatives for unknown ids.

use serde::{Deserialize, Serialize};

/// Project listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub path: String,
}

/// Ticket listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    pub title: String,
    pub status: String,
}

/// Prompt listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Agent listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Project file listing entry. `path` is relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: String,
    pub path: String,
}

/// Read-only listing operations backed by the domain services.
///
/// Implementations return entries in the service's natural order and an
/// empty list when nothing exists. Failures are reported as errors; callers
/// treat them as "no suggestions".
#[async_trait::async_trait]
pub trait ResourceLookup: Send + Sync {
    /// All projects.
    async fn list_projects(&self) -> anyhow::Result<Vec<ProjectSummary>>;

    /// Tickets belonging to `project_id`.
    async fn list_tickets(&self, project_id: &str) -> anyhow::Result<Vec<TicketSummary>>;

    /// All prompts.
    async fn list_prompts(&self) -> anyhow::Result<Vec<PromptSummary>>;

    /// Agents available to `project_id`.
    async fn list_agents(&self, project_id: &str) -> anyhow::Result<Vec<AgentSummary>>;

    /// Files tracked for `project_id`.
    async fn list_project_files(&self, project_id: &str) -> anyhow::Result<Vec<FileSummary>>;
}

/// One selectable alternative rendered as `id: label (detail)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub id: String,
    pub label: String,
    pub detail: Option<String>,
}

impl Alternative {
    /// Render as a single listing line.
    pub fn render(&self) -> String {
        match &self.detail {
            Some(detail) if !detail.is_empty() => format!("{}: {} ({})", self.id, self.label, detail),
            _ => format!("{}: {}", self.id, self.label),
        }
    }
}

impl From<&ProjectSummary> for Alternative {
    fn from(project: &ProjectSummary) -> Self {
        Self {
            id: project.id.clone(),
            label: project.name.clone(),
            detail: Some(project.path.clone()),
        }
    }
}

impl From<&TicketSummary> for Alternative {
    fn from(ticket: &TicketSummary) -> Self {
        Self {
            id: ticket.id.clone(),
            label: ticket.title.clone(),
            detail: Some(ticket.status.clone()),
        }
    }
}

impl From<&PromptSummary> for Alternative {
    fn from(prompt: &PromptSummary) -> Self {
        Self {
            id: prompt.id.clone(),
            label: prompt.name.clone(),
            detail: prompt.project_id.as_ref().map(|project_id| format!("project {project_id}")),
        }
    }
}

impl From<&AgentSummary> for Alternative {
    fn from(agent: &AgentSummary) -> Self {
        Self {
            id: agent.id.clone(),
            label: agent.name.clone(),
            detail: agent.description.clone(),
        }
    }
}
