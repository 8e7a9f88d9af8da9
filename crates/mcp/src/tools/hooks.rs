//! `hook_manager` / `upsert`: create a hook or replace an existing definition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toolsmith_engine::{Transaction, TransactionOptions, TransactionStep};
use toolsmith_types::{ErrorContext, ErrorKind, OperationError, OperationResult};

use super::{
    HOOK_MANAGER,
    services::{Hook, HookDefinition, HookService},
};

pub const UPSERT: &str = "upsert";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertHookRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub definition: HookDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookUpsert {
    pub hook: Hook,
    pub created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<HookDefinition>,
}

/// Create the named hook, or update it when one already exists.
///
/// The write runs as a compensable step: a created hook is deleted and an
/// updated hook gets its previous definition back if the transaction fails.
pub async fn upsert_hook(
    service: Arc<dyn HookService>,
    request: UpsertHookRequest,
    options: TransactionOptions,
) -> OperationResult<HookUpsert> {
    let context = ErrorContext::for_tool(HOOK_MANAGER, UPSERT)
        .with("projectId", &request.project_id)
        .with("hookName", &request.name);
    for (parameter, value) in [
        ("projectId", &request.project_id),
        ("name", &request.name),
        ("event", &request.definition.event),
        ("command", &request.definition.command),
    ] {
        if value.trim().is_empty() {
            return Err(OperationError::missing_param(parameter, context));
        }
    }

    let existing = service
        .find_hook(&request.project_id, &request.name)
        .await
        .map_err(|error| OperationError::from_failure(error, Some(context.clone())))?;
    let previous = existing.as_ref().map(|hook| hook.definition.clone());
    let step = match existing {
        Some(existing) => update_hook_step(&service, existing, request.definition),
        None => create_hook_step(&service, request.project_id, request.name, request.definition),
    };

    let mut transaction = Transaction::new(options);
    transaction.add_step(step)?;
    let result = transaction.execute().await?;

    if let Some((_, error)) = result.errors.into_iter().next() {
        return Err(OperationError::from_failure(error, Some(context)));
    }
    let hook = result.results.into_values().next().ok_or_else(|| {
        OperationError::new(ErrorKind::OperationFailed, "Hook write reported success without a hook").with_context(context)
    })?;

    Ok(HookUpsert {
        hook,
        created: previous.is_none(),
        previous,
    })
}

fn create_hook_step(service: &Arc<dyn HookService>, project_id: String, name: String, definition: HookDefinition) -> TransactionStep<Hook> {
    let create_service = Arc::clone(service);
    let rollback_service = Arc::clone(service);

    TransactionStep::new("create-hook", move || {
        let service = Arc::clone(&create_service);
        let (project_id, name, definition) = (project_id.clone(), name.clone(), definition.clone());
        async move { service.create_hook(&project_id, &name, &definition).await }
    })
    .with_rollback(move |hook: Hook| {
        let service = Arc::clone(&rollback_service);
        async move { service.delete_hook(&hook.id).await }
    })
}

fn update_hook_step(service: &Arc<dyn HookService>, existing: Hook, definition: HookDefinition) -> TransactionStep<Hook> {
    let update_service = Arc::clone(service);
    let restore_service = Arc::clone(service);
    let hook_id = existing.id.clone();

    TransactionStep::new("update-hook", move || {
        let service = Arc::clone(&update_service);
        let (hook_id, definition) = (hook_id.clone(), definition.clone());
        async move { service.update_hook(&hook_id, &definition).await }
    })
    .with_rollback(move |_updated: Hook| {
        let service = Arc::clone(&restore_service);
        let previous = existing.clone();
        async move {
            service.update_hook(&previous.id, &previous.definition).await?;
            anyhow::Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use toolsmith_types::ApiError;

    #[derive(Default)]
    struct MemoryHooks {
        hooks: Mutex<Vec<Hook>>,
        reject_writes: bool,
    }

    #[async_trait::async_trait]
    impl HookService for MemoryHooks {
        async fn find_hook(&self, project_id: &str, name: &str) -> anyhow::Result<Option<Hook>> {
            let hooks = self.hooks.lock().unwrap();
            Ok(hooks.iter().find(|hook| hook.project_id == project_id && hook.name == name).cloned())
        }

        async fn create_hook(&self, project_id: &str, name: &str, definition: &HookDefinition) -> anyhow::Result<Hook> {
            if self.reject_writes {
                return Err(ApiError::new(409, "Hook already registered", "DUPLICATE").into());
            }
            let mut hooks = self.hooks.lock().unwrap();
            let hook = Hook {
                id: format!("h-{}", hooks.len() + 1),
                project_id: project_id.into(),
                name: name.into(),
                definition: definition.clone(),
            };
            hooks.push(hook.clone());
            Ok(hook)
        }

        async fn update_hook(&self, hook_id: &str, definition: &HookDefinition) -> anyhow::Result<Hook> {
            let mut hooks = self.hooks.lock().unwrap();
            let hook = hooks
                .iter_mut()
                .find(|hook| hook.id == hook_id)
                .ok_or_else(|| ApiError::not_found(format!("Hook {hook_id} not found")))?;
            hook.definition = definition.clone();
            Ok(hook.clone())
        }

        async fn delete_hook(&self, hook_id: &str) -> anyhow::Result<()> {
            self.hooks.lock().unwrap().retain(|hook| hook.id != hook_id);
            Ok(())
        }
    }

    fn definition(command: &str) -> HookDefinition {
        HookDefinition {
            event: "post_commit".into(),
            command: command.into(),
            enabled: true,
        }
    }

    fn request(command: &str) -> UpsertHookRequest {
        UpsertHookRequest {
            project_id: "p-1".into(),
            name: "lint".into(),
            definition: definition(command),
        }
    }

    #[tokio::test]
    async fn creates_missing_hook() {
        let service = Arc::new(MemoryHooks::default());
        let outcome = upsert_hook(service.clone(), request("cargo clippy"), TransactionOptions::default()).await.unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.previous, None);
        assert_eq!(outcome.hook.definition.command, "cargo clippy");
        assert_eq!(service.hooks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn updates_existing_hook_and_reports_previous_definition() {
        let service = Arc::new(MemoryHooks::default());
        upsert_hook(service.clone(), request("cargo clippy"), TransactionOptions::default()).await.unwrap();

        let outcome = upsert_hook(service.clone(), request("cargo fmt --check"), TransactionOptions::default()).await.unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.previous, Some(definition("cargo clippy")));
        assert_eq!(outcome.hook.id, "h-1");
        assert_eq!(service.hooks.lock().unwrap()[0].definition.command, "cargo fmt --check");
    }

    #[tokio::test]
    async fn write_failures_are_classified() {
        let service = Arc::new(MemoryHooks {
            reject_writes: true,
            ..Default::default()
        });
        let error = upsert_hook(service, request("cargo clippy"), TransactionOptions::default()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AlreadyExists);
        assert!(error.context().unwrap().is_tool(HOOK_MANAGER));
        assert_eq!(error.context().unwrap().get_str("hookName"), Some("lint"));
    }

    #[tokio::test]
    async fn blank_command_is_rejected() {
        let service = Arc::new(MemoryHooks::default());
        let error = upsert_hook(service, request(" "), TransactionOptions::default()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingRequiredParam);
        assert_eq!(error.context().unwrap().parameter.as_deref(), Some("command"));
    }
}
