use std::sync::Arc;

use orderdesk_client::receipt_url;
use orderdesk_core::config::AppConfig;
use orderdesk_core::ports::{OrderApi, OrderCollectionSource};
use serde_json::json;

use crate::commands::{connect, runtime_failure, CommandResult, Session, EXIT_CONFLICT};

pub fn run(config: &AppConfig, id: &str) -> CommandResult {
    let (runtime, api) = match connect(config) {
        Ok(connected) => connected,
        Err(error) => return runtime_failure("show", error),
    };
    runtime.block_on(execute(api, &config.api.base_url, id))
}

pub async fn execute<A>(api: Arc<A>, api_base_url: &str, id: &str) -> CommandResult
where
    A: OrderApi + OrderCollectionSource + 'static,
{
    let session = Session::new(api);
    if let Err(failure) = session.load("show", id).await {
        return failure;
    }
    let Some(order) = session.workflow.order() else {
        return CommandResult::failure(
            "show",
            "conflict",
            "order was not retained",
            EXIT_CONFLICT,
        );
    };

    let receipt =
        if order.has_receipt() { receipt_url(api_base_url, &order.id) } else { None };
    let data = json!({
        "order": &order,
        "short_id": order.short_id(),
        "customer_chat_link": order.customer_chat_link(),
        "receipt_url": receipt,
    });

    CommandResult::success_with(
        "show",
        format!("order #{} is {}", order.short_id(), order.status),
        Some(data),
        session.notifications(),
    )
}
