pub mod config;
pub mod delete;
pub mod show;
pub mod status;

use std::sync::Arc;

use anyhow::Context;
use orderdesk_client::HttpOrderApi;
use orderdesk_core::audit::{AuditContext, TracingAuditSink};
use orderdesk_core::cache::OrderCollectionCache;
use orderdesk_core::config::AppConfig;
use orderdesk_core::domain::order::OrderId;
use orderdesk_core::errors::WorkflowError;
use orderdesk_core::ports::{Notification, OrderApi, OrderCollectionSource, RecordingPresenter};
use orderdesk_core::workflow::{OrderWorkflow, WorkflowCollaborators};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_VALIDATION: u8 = 5;
pub const EXIT_API: u8 = 6;
pub const EXIT_CONFLICT: u8 = 7;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    notifications: Vec<Notification>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None, Vec::new())
    }

    pub fn success_with(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
        notifications: Vec<Notification>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
            notifications,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with(command, error_class, message, exit_code, Vec::new())
    }

    pub fn failure_with(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        notifications: Vec<Notification>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
            notifications,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Failure result for a workflow error, classified by what went wrong.
    pub fn from_workflow_error(
        command: &str,
        error: &WorkflowError,
        notifications: Vec<Notification>,
    ) -> Self {
        let (error_class, exit_code) = match error {
            WorkflowError::NotFound(_) => ("not_found", EXIT_NOT_FOUND),
            WorkflowError::Validation(_) => ("validation", EXIT_VALIDATION),
            WorkflowError::Network { .. } => ("api_error", EXIT_API),
            WorkflowError::NoOrderLoaded | WorkflowError::Busy | WorkflowError::Gate(_) => {
                ("conflict", EXIT_CONFLICT)
            }
        };
        Self::failure_with(command, error_class, error.user_message(), exit_code, notifications)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"notifications\":[]}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// One detail workflow wired to `api`, reporting through an in-memory
/// presenter whose signals end up in the command output.
pub struct Session {
    pub workflow: OrderWorkflow,
    pub presenter: RecordingPresenter,
}

impl Session {
    pub fn new<A>(api: Arc<A>) -> Self
    where
        A: OrderApi + OrderCollectionSource + 'static,
    {
        let presenter = RecordingPresenter::default();
        let cache = Arc::new(OrderCollectionCache::new(api.clone()));
        let workflow = OrderWorkflow::new(WorkflowCollaborators {
            api,
            cache,
            navigator: Arc::new(presenter.clone()),
            notifier: Arc::new(presenter.clone()),
            audit: Arc::new(TracingAuditSink),
        })
        .with_audit_context(AuditContext {
            actor: "orderdesk-cli".to_string(),
            ..AuditContext::default()
        });
        Self { workflow, presenter }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.presenter.notifications()
    }

    pub async fn load(&self, command: &str, id: &str) -> Result<(), CommandResult> {
        match self.workflow.activate(OrderId::new(id)).await {
            Ok(_) => Ok(()),
            Err(error) => Err(CommandResult::from_workflow_error(
                command,
                &error,
                self.notifications(),
            )),
        }
    }
}

/// Current-thread runtime plus an HTTP client for the configured API.
pub fn connect(config: &AppConfig) -> anyhow::Result<(Runtime, Arc<HttpOrderApi>)> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to initialize async runtime")?;
    let api = HttpOrderApi::from_config(&config.api).context("failed to build http client")?;
    Ok((runtime, Arc::new(api)))
}

pub(crate) fn runtime_failure(command: &str, error: anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "runtime_init", format!("{error:#}"), EXIT_RUNTIME)
}
