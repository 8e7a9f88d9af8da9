//! `ticket_manager` / `create_with_tasks`: a ticket and its tasks as one unit.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use toolsmith_engine::{Transaction, TransactionOptions, TransactionStep};
use toolsmith_types::{ErrorContext, ErrorKind, OperationError, OperationResult};

use super::{
    TICKET_MANAGER,
    services::{Ticket, TicketDraft, TicketService, TicketTask},
};

pub const CREATE_WITH_TASKS: &str = "create_with_tasks";

/// Upper bound on tasks created alongside one ticket.
pub const MAX_TASKS_PER_TICKET: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketWithTasksRequest {
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketWithTasks {
    pub ticket: Ticket,
    pub tasks: Vec<TicketTask>,
}

#[derive(Debug, Clone)]
enum Created {
    Ticket(Ticket),
    Task(TicketTask),
}

/// Create a ticket followed by its tasks.
///
/// A failure in any step deletes whatever was already created, newest first,
/// and reports a `TransactionFailed` error listing the completed and failed
/// steps.
pub async fn create_ticket_with_tasks(
    service: Arc<dyn TicketService>,
    request: CreateTicketWithTasksRequest,
    options: TransactionOptions,
) -> OperationResult<TicketWithTasks> {
    let context = ErrorContext::for_tool(TICKET_MANAGER, CREATE_WITH_TASKS).with("projectId", &request.project_id);
    validate(&request, &context)?;

    let ticket_id: Arc<OnceLock<String>> = Arc::default();
    let mut transaction = Transaction::new(options);
    transaction.add_step(create_ticket_step(&service, &request, &ticket_id))?;
    for (index, content) in request.tasks.iter().enumerate() {
        transaction.add_step(create_task_step(&service, index + 1, content, &ticket_id))?;
    }

    let result = transaction.execute().await?;
    if !result.success {
        return Err(result.to_operation_error(context));
    }

    let mut ticket = None;
    let mut tasks = Vec::with_capacity(request.tasks.len());
    for created in result.results.into_values() {
        match created {
            Created::Ticket(created) => ticket = Some(created),
            Created::Task(task) => tasks.push(task),
        }
    }
    let ticket = ticket.ok_or_else(|| {
        OperationError::new(ErrorKind::OperationFailed, "Ticket creation reported success without a ticket").with_context(context)
    })?;
    Ok(TicketWithTasks { ticket, tasks })
}

fn validate(request: &CreateTicketWithTasksRequest, context: &ErrorContext) -> OperationResult<()> {
    if request.project_id.trim().is_empty() {
        return Err(OperationError::missing_param("projectId", context.clone()));
    }
    if request.title.trim().is_empty() {
        return Err(OperationError::missing_param("title", context.clone()));
    }
    if request.tasks.len() > MAX_TASKS_PER_TICKET {
        return Err(OperationError::new(
            ErrorKind::BatchSizeExceeded,
            format!("Cannot create {} tasks at once; the limit is {MAX_TASKS_PER_TICKET}", request.tasks.len()),
        )
        .with_context(context.clone().with_parameter("tasks", request.tasks.len()).with("maxTasks", MAX_TASKS_PER_TICKET)));
    }
    if let Some(index) = request.tasks.iter().position(|task| task.trim().is_empty()) {
        return Err(OperationError::invalid_param("tasks", index, "task content must not be empty", context.clone()));
    }
    Ok(())
}

fn create_ticket_step(
    service: &Arc<dyn TicketService>,
    request: &CreateTicketWithTasksRequest,
    ticket_id: &Arc<OnceLock<String>>,
) -> TransactionStep<Created> {
    let draft = TicketDraft {
        title: request.title.clone(),
        description: request.description.clone(),
    };
    let project_id = request.project_id.clone();
    let create_service = Arc::clone(service);
    let rollback_service = Arc::clone(service);
    let ticket_id = Arc::clone(ticket_id);

    TransactionStep::new("create-ticket", move || {
        let service = Arc::clone(&create_service);
        let ticket_id = Arc::clone(&ticket_id);
        let project_id = project_id.clone();
        let draft = draft.clone();
        async move {
            let ticket = service.create_ticket(&project_id, &draft).await?;
            let _ = ticket_id.set(ticket.id.clone());
            anyhow::Ok(Created::Ticket(ticket))
        }
    })
    .with_rollback(move |created| {
        let service = Arc::clone(&rollback_service);
        async move {
            if let Created::Ticket(ticket) = created {
                service.delete_ticket(&ticket.id).await?;
            }
            anyhow::Ok(())
        }
    })
}

fn create_task_step(
    service: &Arc<dyn TicketService>,
    position: usize,
    content: &str,
    ticket_id: &Arc<OnceLock<String>>,
) -> TransactionStep<Created> {
    let create_service = Arc::clone(service);
    let rollback_service = Arc::clone(service);
    let ticket_id = Arc::clone(ticket_id);
    let content = content.to_string();

    TransactionStep::new(format!("create-task-{position}"), move || {
        let service = Arc::clone(&create_service);
        let ticket_id = ticket_id.get().cloned();
        let content = content.clone();
        async move {
            let ticket_id = ticket_id.ok_or_else(|| anyhow::anyhow!("ticket id unavailable; create-ticket has not completed"))?;
            let task = service.create_task(&ticket_id, &content).await?;
            anyhow::Ok(Created::Task(task))
        }
    })
    .with_rollback(move |created| {
        let service = Arc::clone(&rollback_service);
        async move {
            if let Created::Task(task) = created {
                service.delete_task(&task.ticket_id, &task.id).await?;
            }
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
    struct RecordingTickets {
        fail_task: Option<String>,
        log: Mutex<Vec<String>>,
    }

    impl RecordingTickets {
        fn failing_on(task: &str) -> Self {
            Self {
                fail_task: Some(task.to_string()),
                ..Default::default()
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn push(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    #[async_trait::async_trait]
    impl TicketService for RecordingTickets {
        async fn create_ticket(&self, project_id: &str, draft: &TicketDraft) -> anyhow::Result<Ticket> {
            self.push(format!("create-ticket:{}", draft.title));
            Ok(Ticket {
                id: "t-1".into(),
                project_id: project_id.into(),
                title: draft.title.clone(),
            })
        }

        async fn delete_ticket(&self, ticket_id: &str) -> anyhow::Result<()> {
            self.push(format!("delete-ticket:{ticket_id}"));
            Ok(())
        }

        async fn create_task(&self, ticket_id: &str, content: &str) -> anyhow::Result<TicketTask> {
            if self.fail_task.as_deref() == Some(content) {
                return Err(ApiError::new(503, "task store offline", "SERVICE_UNAVAILABLE").into());
            }
            self.push(format!("create-task:{content}"));
            Ok(TicketTask {
                id: format!("task-{content}"),
                ticket_id: ticket_id.into(),
                content: content.into(),
            })
        }

        async fn delete_task(&self, ticket_id: &str, task_id: &str) -> anyhow::Result<()> {
            self.push(format!("delete-task:{ticket_id}/{task_id}"));
            Ok(())
        }
    }

    fn request(tasks: &[&str]) -> CreateTicketWithTasksRequest {
        CreateTicketWithTasksRequest {
            project_id: "p-1".into(),
            title: "Release".into(),
            description: None,
            tasks: tasks.iter().map(|task| task.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn creates_ticket_then_tasks_with_shared_id() {
        let service = Arc::new(RecordingTickets::default());
        let created = create_ticket_with_tasks(service.clone(), request(&["build", "tag"]), TransactionOptions::default())
            .await
            .unwrap();

        assert_eq!(created.ticket.id, "t-1");
        assert_eq!(created.tasks.len(), 2);
        assert!(created.tasks.iter().all(|task| task.ticket_id == "t-1"));
        assert_eq!(service.log(), vec!["create-ticket:Release", "create-task:build", "create-task:tag"]);
    }

    #[tokio::test]
    async fn failed_task_rolls_back_tasks_then_ticket() {
        let service = Arc::new(RecordingTickets::failing_on("publish"));
        let error = create_ticket_with_tasks(service.clone(), request(&["build", "tag", "publish"]), TransactionOptions::default())
            .await
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::TransactionFailed);
        assert!(error.message().contains("create-task-3: task store offline"));
        let context = error.context().unwrap();
        assert!(context.is_tool(TICKET_MANAGER));
        assert_eq!(context.action.as_deref(), Some(CREATE_WITH_TASKS));
        assert_eq!(context.get("rolledBack"), Some(&serde_json::json!(true)));
        assert_eq!(
            service.log(),
            vec![
                "create-ticket:Release",
                "create-task:build",
                "create-task:tag",
                "delete-task:t-1/task-tag",
                "delete-task:t-1/task-build",
                "delete-ticket:t-1",
            ]
        );
    }

    #[tokio::test]
    async fn rejects_missing_title_before_running() {
        let service = Arc::new(RecordingTickets::default());
        let mut invalid = request(&[]);
        invalid.title = " ".into();

        let error = create_ticket_with_tasks(service.clone(), invalid, TransactionOptions::default()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingRequiredParam);
        assert_eq!(error.context().unwrap().parameter.as_deref(), Some("title"));
        assert!(service.log().is_empty());
    }

    #[tokio::test]
    async fn rejects_oversized_batches() {
        let service = Arc::new(RecordingTickets::default());
        let tasks: Vec<String> = (0..=MAX_TASKS_PER_TICKET).map(|n| format!("task {n}")).collect();
        let oversized = CreateTicketWithTasksRequest {
            tasks,
            ..request(&[])
        };

        let error = create_ticket_with_tasks(service.clone(), oversized, TransactionOptions::default()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::BatchSizeExceeded);
        assert_eq!(error.context().unwrap().get("maxTasks"), Some(&serde_json::json!(MAX_TASKS_PER_TICKET)));
        assert!(service.log().is_empty());
    }

    #[tokio::test]
    async fn rejects_blank_task_content() {
        let service = Arc::new(RecordingTickets::default());
        let error = create_ticket_with_tasks(service, request(&["build", ""]), TransactionOptions::default()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidParamValue);
        assert_eq!(error.context().unwrap().value, Some(serde_json::json!(1)));
    }
}
