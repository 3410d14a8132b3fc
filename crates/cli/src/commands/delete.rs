use std::sync::Arc;

use orderdesk_core::config::AppConfig;
use orderdesk_core::ports::{OrderApi, OrderCollectionSource};
use orderdesk_core::workflow::DeleteOutcome;
use serde_json::json;

use crate::commands::{connect, runtime_failure, CommandResult, Session, EXIT_CONFLICT};

pub fn run(config: &AppConfig, id: &str) -> CommandResult {
    let (runtime, api) = match connect(config) {
        Ok(connected) => connected,
        Err(error) => return runtime_failure("delete", error),
    };
    runtime.block_on(execute(api, id))
}

/// Running the command is the operator's confirmation.
pub async fn execute<A>(api: Arc<A>, id: &str) -> CommandResult
where
    A: OrderApi + OrderCollectionSource + 'static,
{
    let session = Session::new(api);
    if let Err(failure) = session.load("delete", id).await {
        return failure;
    }

    if let Err(error) = session.workflow.request_delete() {
        return CommandResult::from_workflow_error("delete", &error, session.notifications());
    }

    match session.workflow.confirm_delete().await {
        Ok(DeleteOutcome::Deleted) => CommandResult::success_with(
            "delete",
            format!("order {id} deleted"),
            Some(json!({ "id": id, "navigate_to": session.presenter.last_path() })),
            session.notifications(),
        ),
        Ok(DeleteOutcome::Skipped(reason)) => CommandResult::failure_with(
            "delete",
            "conflict",
            format!("deletion skipped: {reason:?}"),
            EXIT_CONFLICT,
            session.notifications(),
        ),
        Err(error) => {
            CommandResult::from_workflow_error("delete", &error, session.notifications())
        }
    }
}
