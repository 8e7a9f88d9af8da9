//! Live alternative listings for not-found errors.
//!
//! Enrichment fires only on an exact (kind, owning tool) pair so a kind raised
//! by one tool never triggers another tool's listing.

use toolsmith_types::{ErrorContext, ErrorKind, OperationError};

use super::formatter::context_section;
use crate::{
    config::EnrichmentSettings,
    lookup::{Alternative, FileSummary, ResourceLookup},
    tools::{AGENT_MANAGER, PROJECT_MANAGER, PROMPT_MANAGER, TICKET_MANAGER},
};

/// Context keys checked, in order, for the path of a missing file.
const PATH_KEYS: [&str; 3] = ["path", "filePath", "file_path"];

struct Resource {
    singular: &'static str,
    plural: &'static str,
    create_hint: &'static str,
}

const PROJECTS: Resource = Resource {
    singular: "project",
    plural: "projects",
    create_hint: "Create a project first using project_manager with action 'create', then retry with its ID.",
};

const TICKETS: Resource = Resource {
    singular: "ticket",
    plural: "tickets",
    create_hint: "Create a ticket first using ticket_manager with action 'create', then retry with its ID.",
};

const PROMPTS: Resource = Resource {
    singular: "prompt",
    plural: "prompts",
    create_hint: "Create a prompt first using prompt_manager with action 'create', then retry with its ID.",
};

const AGENTS: Resource = Resource {
    singular: "agent",
    plural: "agents",
    create_hint: "Create an agent first using agent_manager with action 'create', then retry with its ID.",
};

/// Build enriched text for `error`.
///
/// `Ok(None)` means the error is not eligible and the caller should use the
/// base text. Lookup failures are returned as errors for the caller to log.
pub(crate) async fn enrich(
    lookup: &dyn ResourceLookup,
    error: &OperationError,
    settings: &EnrichmentSettings,
) -> anyhow::Result<Option<String>> {
    let Some(context) = error.context() else {
        return Ok(None);
    };
    let limit = settings.max_alternatives;

    let text = match (error.kind(), context.tool.as_deref()) {
        (ErrorKind::ProjectNotFound, Some(PROJECT_MANAGER)) => {
            let projects = lookup.list_projects().await?;
            render_alternatives(error, &PROJECTS, projects.iter().map(Alternative::from).collect(), limit)
        }
        (ErrorKind::TicketNotFound, Some(TICKET_MANAGER)) => {
            let Some(project_id) = context.project_id() else {
                return Ok(None);
            };
            let tickets = lookup.list_tickets(&project_id).await?;
            render_alternatives(error, &TICKETS, tickets.iter().map(Alternative::from).collect(), limit)
        }
        (ErrorKind::PromptNotFound, Some(PROMPT_MANAGER)) => {
            let prompts = lookup.list_prompts().await?;
            render_alternatives(error, &PROMPTS, prompts.iter().map(Alternative::from).collect(), limit)
        }
        (ErrorKind::AgentNotFound, Some(AGENT_MANAGER)) => {
            let Some(project_id) = context.project_id() else {
                return Ok(None);
            };
            let agents = lookup.list_agents(&project_id).await?;
            render_alternatives(error, &AGENTS, agents.iter().map(Alternative::from).collect(), limit)
        }
        (ErrorKind::FileNotFound, Some(PROJECT_MANAGER)) => {
            let (Some(project_id), Some(requested)) = (context.project_id(), requested_path(context)) else {
                return Ok(None);
            };
            let files = lookup.list_project_files(&project_id).await?;
            match render_file_suggestions(error, &requested, &files, settings.max_file_suggestions) {
                Some(text) => text,
                None => return Ok(None),
            }
        }
        _ => return Ok(None),
    };

    Ok(Some(text))
}

fn render_alternatives(error: &OperationError, resource: &Resource, alternatives: Vec<Alternative>, limit: usize) -> String {
    let mut text = format!("Error: {}\n\n", error.message());

    if alternatives.is_empty() {
        text.push_str(&format!("No {} exist yet. {}", resource.plural, resource.create_hint));
    } else {
        text.push_str(&format!("Available {} ({}):\n", resource.plural, alternatives.len()));
        for alternative in alternatives.iter().take(limit) {
            text.push_str(&format!("  - {}\n", alternative.render()));
        }
        if alternatives.len() > limit {
            text.push_str(&format!("  ... and {} more\n", alternatives.len() - limit));
        }
        text.push_str(&format!("\nUse one of the {} IDs listed above.", resource.singular));
    }

    text.push_str(&context_section(error));
    text
}

fn render_file_suggestions(error: &OperationError, requested: &str, files: &[FileSummary], limit: usize) -> Option<String> {
    let (directory, name) = split_path(requested);
    let name = name.to_lowercase();

    let same_directory: Vec<&str> = files
        .iter()
        .map(|file| normalize_path(&file.path))
        .filter(|path| *path != requested && split_path(path).0 == directory)
        .take(limit)
        .collect();

    let similar_names: Vec<&str> = files
        .iter()
        .map(|file| normalize_path(&file.path))
        .filter(|path| *path != requested && !name.is_empty())
        .filter(|path| {
            let candidate = split_path(path).1.to_lowercase();
            !candidate.is_empty() && (candidate.contains(&name) || name.contains(&candidate))
        })
        .take(limit)
        .collect();

    if same_directory.is_empty() && similar_names.is_empty() {
        return None;
    }

    let mut text = format!("Error: {}\n\n", error.message());
    if !same_directory.is_empty() {
        let label = if directory.is_empty() { "the project root" } else { directory };
        text.push_str(&format!("Files in {label}:\n"));
        for path in &same_directory {
            text.push_str(&format!("  - {path}\n"));
        }
    }
    if !similar_names.is_empty() {
        text.push_str("Files with similar names:\n");
        for path in &similar_names {
            text.push_str(&format!("  - {path}\n"));
        }
    }
    text.push_str("\nUse project_manager with action 'browse_files' to explore the project structure.");
    text.push_str(&context_section(error));
    Some(text)
}

fn requested_path(context: &ErrorContext) -> Option<String> {
    PATH_KEYS
        .iter()
        .find_map(|key| context.get_str(key))
        .or_else(|| context.value.as_ref().and_then(|value| value.as_str()))
        .map(normalize_path)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
}

fn normalize_path(path: &str) -> &str {
    path.trim().trim_start_matches("./").trim_start_matches('/')
}

/// Split into (parent directory, base name); the root directory is `""`.
fn split_path(path: &str) -> (&str, &str) {
    path.rsplit_once('/').unwrap_or(("", path))
}
