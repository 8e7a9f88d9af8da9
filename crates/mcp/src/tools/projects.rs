//! `project_manager` / `sync`: verify a project, then reconcile its files.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use toolsmith_engine::{Transaction, TransactionOptions, TransactionStep};
use toolsmith_types::{ErrorContext, ErrorKind, OperationError, OperationResult};

use super::{
    PROJECT_MANAGER,
    services::{ProjectService, SyncSummary},
};
use crate::lookup::ProjectSummary;

pub const SYNC: &str = "sync";

const VERIFY_PROJECT: &str = "verify-project";
const SYNC_FILES: &str = "sync-files";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProjectRequest {
    #[serde(default)]
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSync {
    pub project: ProjectSummary,
    pub summary: SyncSummary,
}

#[derive(Debug, Clone)]
enum Synced {
    Project(ProjectSummary),
    Files(SyncSummary),
}

/// Sync a project's tracked files.
///
/// An unknown project fails with `ProjectNotFound`. The file sync is retried
/// with the transaction's retry settings and, once exhausted, reported as
/// `SyncFailed`.
pub async fn sync_project(
    service: Arc<dyn ProjectService>,
    request: SyncProjectRequest,
    options: TransactionOptions,
) -> OperationResult<ProjectSync> {
    let project_id = request.project_id.trim().to_string();
    let context = ErrorContext::for_tool(PROJECT_MANAGER, SYNC).with("projectId", &project_id);
    if project_id.is_empty() {
        return Err(OperationError::missing_param("projectId", context));
    }

    let mut transaction = Transaction::new(options);
    transaction
        .add_step(verify_project_step(&service, &project_id, &context))?
        .add_step(sync_files_step(&service, &project_id))?;
    let result = transaction.execute().await?;

    if let Some((step, error)) = result.errors.into_iter().next() {
        if step == VERIFY_PROJECT {
            return Err(OperationError::from_failure(error, Some(context)));
        }
        let cause = OperationError::from_failure(error, None);
        return Err(OperationError::new(ErrorKind::SyncFailed, format!("Failed to sync project {project_id}: {}", cause.message()))
            .with_context(context.with("failedStep", step).with("causeKind", cause.kind())));
    }

    let mut project = None;
    let mut summary = None;
    for synced in result.results.into_values() {
        match synced {
            Synced::Project(found) => project = Some(found),
            Synced::Files(files) => summary = Some(files),
        }
    }
    match (project, summary) {
        (Some(project), Some(summary)) => Ok(ProjectSync { project, summary }),
        _ => Err(OperationError::new(ErrorKind::OperationFailed, "Project sync reported success without a summary").with_context(context)),
    }
}

fn verify_project_step(service: &Arc<dyn ProjectService>, project_id: &str, context: &ErrorContext) -> TransactionStep<Synced> {
    let service = Arc::clone(service);
    let project_id = project_id.to_string();
    let context = context.clone();

    TransactionStep::new(VERIFY_PROJECT, move || {
        let service = Arc::clone(&service);
        let project_id = project_id.clone();
        let context = context.clone();
        async move {
            match service.get_project(&project_id).await? {
                Some(project) => anyhow::Ok(Synced::Project(project)),
                None => Err(OperationError::new(ErrorKind::ProjectNotFound, format!("Project with ID {project_id} not found"))
                    .with_context(context)
                    .into()),
            }
        }
    })
}

fn sync_files_step(service: &Arc<dyn ProjectService>, project_id: &str) -> TransactionStep<Synced> {
    let service = Arc::clone(service);
    let project_id = project_id.to_string();

    TransactionStep::new(SYNC_FILES, move || {
        let service = Arc::clone(&service);
        let project_id = project_id.clone();
        async move { anyhow::Ok(Synced::Files(service.sync_files(&project_id).await?)) }
    })
    .retryable(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProjects {
        known: bool,
        failures_before_success: u32,
        sync_calls: AtomicU32,
    }

    impl FlakyProjects {
        fn new(known: bool, failures_before_success: u32) -> Self {
            Self {
                known,
                failures_before_success,
                sync_calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl ProjectService for FlakyProjects {
        async fn get_project(&self, project_id: &str) -> anyhow::Result<Option<ProjectSummary>> {
            Ok(self.known.then(|| ProjectSummary {
                id: project_id.into(),
                name: "Core".into(),
                path: "/src/core".into(),
            }))
        }

        async fn sync_files(&self, project_id: &str) -> anyhow::Result<SyncSummary> {
            let call = self.sync_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                anyhow::bail!("EACCES: permission denied, scandir '/src/core'");
            }
            Ok(SyncSummary {
                project_id: project_id.into(),
                added: 2,
                updated: 1,
                removed: 0,
            })
        }
    }

    fn request() -> SyncProjectRequest {
        SyncProjectRequest { project_id: "p-1".into() }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_sync_failures_are_retried() {
        let service = Arc::new(FlakyProjects::new(true, 2));
        let synced = sync_project(service.clone(), request(), TransactionOptions::default()).await.unwrap();

        assert_eq!(synced.project.name, "Core");
        assert_eq!(synced.summary.added, 2);
        assert_eq!(service.sync_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_report_sync_failed() {
        let service = Arc::new(FlakyProjects::new(true, u32::MAX));
        let error = sync_project(service.clone(), request(), TransactionOptions::default()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::SyncFailed);
        assert_eq!(service.sync_calls.load(Ordering::SeqCst), TransactionOptions::default().max_retries + 1);
        let context = error.context().unwrap();
        assert_eq!(context.get_str("failedStep"), Some(SYNC_FILES));
        assert_eq!(context.get_str("causeKind"), Some("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn unknown_project_is_not_found_for_project_manager() {
        let service = Arc::new(FlakyProjects::new(false, 0));
        let error = sync_project(service.clone(), request(), TransactionOptions::default()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::ProjectNotFound);
        assert!(error.context().unwrap().is_tool(PROJECT_MANAGER));
        assert_eq!(error.context().unwrap().project_id().as_deref(), Some("p-1"));
        assert_eq!(service.sync_calls.load(Ordering::SeqCst), 0);
    }
}
