use std::sync::Arc;

use orderdesk_core::config::AppConfig;
use orderdesk_core::domain::order::{DeliveryTimeSlot, OrderStatus};
use orderdesk_core::ports::{OrderApi, OrderCollectionSource};
use orderdesk_core::workflow::{MutationOutcome, SideData, TransitionRequirement};
use serde_json::json;

use crate::commands::{connect, runtime_failure, CommandResult, Session, EXIT_CONFLICT};

pub fn run(
    config: &AppConfig,
    id: &str,
    target: OrderStatus,
    slot: Option<DeliveryTimeSlot>,
    reason: Option<String>,
) -> CommandResult {
    let (runtime, api) = match connect(config) {
        Ok(connected) => connected,
        Err(error) => return runtime_failure("status", error),
    };
    let side_data = SideData { rejection_reason: reason, delivery_time_slot: slot };
    runtime.block_on(execute(api, id, target, side_data))
}

/// Loads the order, selects `target` and confirms it at once with the
/// supplied side data.
pub async fn execute<A>(
    api: Arc<A>,
    id: &str,
    target: OrderStatus,
    side_data: SideData,
) -> CommandResult
where
    A: OrderApi + OrderCollectionSource + 'static,
{
    let session = Session::new(api);
    if let Err(failure) = session.load("status", id).await {
        return failure;
    }

    let requirement = match session.workflow.request_transition(target) {
        Ok(requirement) => requirement,
        Err(error) => {
            return CommandResult::from_workflow_error("status", &error, session.notifications())
        }
    };
    if requirement == TransitionRequirement::Ignore {
        return CommandResult::success_with(
            "status",
            format!("order is already {target}; nothing to change"),
            Some(json!({ "order": session.workflow.order() })),
            session.notifications(),
        );
    }

    match session.workflow.confirm(side_data).await {
        Ok(MutationOutcome::Applied(order)) => CommandResult::success_with(
            "status",
            format!("order #{} is now {}", order.short_id(), order.status),
            Some(json!({ "order": order, "requirement": requirement })),
            session.notifications(),
        ),
        Ok(MutationOutcome::Skipped(reason)) => CommandResult::failure_with(
            "status",
            "conflict",
            format!("status change skipped: {reason:?}"),
            EXIT_CONFLICT,
            session.notifications(),
        ),
        Err(error) => {
            CommandResult::from_workflow_error("status", &error, session.notifications())
        }
    }
}
