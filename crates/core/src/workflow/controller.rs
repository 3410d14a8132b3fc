use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::errors::{
    WorkflowError, GENERIC_DELETE_FAILURE, GENERIC_LOAD_FAILURE, GENERIC_UPDATE_FAILURE,
};
use crate::ports::{CacheInvalidator, Navigator, Notifier, OrderApi, Severity};
use crate::workflow::gate::{ConfirmationGate, GateError};
use crate::workflow::selector::TransitionRequirement;
use crate::workflow::states::{DeleteState, DialogVisibility, SideData, WorkflowSnapshot};

pub const ORDER_COLLECTION_PATH: &str = "/admin/orders";

pub const STATUS_UPDATED_MESSAGE: &str = "Order status updated";
pub const ORDER_DELETED_MESSAGE: &str = "Order deleted";

pub struct WorkflowCollaborators {
    pub api: Arc<dyn OrderApi>,
    pub cache: Arc<dyn CacheInvalidator>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub audit: Arc<dyn AuditSink>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum LoadOutcome {
    Loaded(Order),
    /// The workflow moved on (re-activated or torn down) before the fetch settled.
    Discarded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoOrderLoaded,
    NoPendingTransition,
    NoPendingDeletion,
    UpdateInFlight,
    Abandoned,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MutationOutcome {
    Applied(Order),
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteOutcome {
    Deleted,
    Skipped(SkipReason),
}

#[derive(Debug, Default)]
struct WorkflowInner {
    generation: u64,
    torn_down: bool,
    loading: bool,
    order: Option<Order>,
    gate: ConfirmationGate,
    delete: DeleteState,
}

impl WorkflowInner {
    fn updating(&self) -> bool {
        self.gate.is_mutating() || self.delete == DeleteState::Deleting
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }
}

/// Detail-view controller for one admin order: loads it, walks status
/// changes through the confirmation gate, and runs the deletion sub-flow.
///
/// State sits behind a mutex that is never held across an `.await`, so a
/// second action arriving while a request is in flight observes `Mutating`
/// or `Deleting` and is turned away.
pub struct OrderWorkflow {
    api: Arc<dyn OrderApi>,
    cache: Arc<dyn CacheInvalidator>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
    audit_context: AuditContext,
    inner: Mutex<WorkflowInner>,
}

impl OrderWorkflow {
    pub fn new(collaborators: WorkflowCollaborators) -> Self {
        let WorkflowCollaborators { api, cache, navigator, notifier, audit } = collaborators;
        Self {
            api,
            cache,
            navigator,
            notifier,
            audit,
            audit_context: AuditContext::default(),
            inner: Mutex::new(WorkflowInner::default()),
        }
    }

    pub fn with_audit_context(mut self, audit_context: AuditContext) -> Self {
        self.audit_context = audit_context;
        self
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowInner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let inner = self.lock();
        let state = inner.gate.state().clone();
        WorkflowSnapshot {
            order: inner.order.clone(),
            loading: inner.loading,
            updating: inner.updating(),
            dialogs: DialogVisibility::derive(&state, inner.delete),
            delete_state: inner.delete,
            state,
        }
    }

    pub fn order(&self) -> Option<Order> {
        self.lock().order.clone()
    }

    /// Fetches `order_id` and makes it the workflow's order. Any earlier
    /// activation still in flight loses its claim on the state. Refused with
    /// `Busy` while a status change or deletion is on the wire, since only the
    /// settling request may clear the in-flight guard.
    pub async fn activate(&self, order_id: OrderId) -> Result<LoadOutcome, WorkflowError> {
        let generation = {
            let mut inner = self.lock();
            if inner.torn_down {
                return Ok(LoadOutcome::Discarded);
            }
            if inner.updating() {
                return Err(WorkflowError::Busy);
            }
            inner.generation += 1;
            inner.loading = true;
            inner.order = None;
            inner.gate.reset();
            inner.delete = DeleteState::Idle;
            inner.generation
        };
        debug!(event_name = "order.workflow.load_started", order_id = %order_id, "loading order");

        let result = self.api.fetch_order(&order_id).await;

        {
            let mut inner = self.lock();
            if !inner.is_current(generation) {
                debug!(
                    event_name = "order.workflow.load_discarded",
                    order_id = %order_id,
                    "discarding order fetched for an abandoned activation"
                );
                return Ok(LoadOutcome::Discarded);
            }
            inner.loading = false;
            inner.order = result.as_ref().ok().cloned();
        }

        match result {
            Ok(order) => {
                info!(
                    event_name = "order.workflow.loaded",
                    order_id = %order.id,
                    status = %order.status,
                    "order loaded"
                );
                Ok(LoadOutcome::Loaded(order))
            }
            Err(error) => {
                warn!(
                    event_name = "order.workflow.load_failed",
                    order_id = %order_id,
                    error = %error,
                    "order could not be loaded"
                );
                self.emit(
                    AuditEvent::new(
                        Some(order_id),
                        &self.audit_context,
                        "order.load_failed",
                        AuditCategory::Load,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                self.notifier.notify(GENERIC_LOAD_FAILURE, Severity::Error);
                self.navigator.navigate(ORDER_COLLECTION_PATH);
                Err(WorkflowError::from_load(&error))
            }
        }
    }

    /// Relinquishes the order; results that arrive afterwards are dropped.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        inner.torn_down = true;
        inner.generation += 1;
        inner.loading = false;
        inner.order = None;
        inner.gate.reset();
        inner.delete = DeleteState::Idle;
    }

    pub fn request_transition(
        &self,
        target: OrderStatus,
    ) -> Result<TransitionRequirement, WorkflowError> {
        let mut inner = self.lock();
        let current = inner.order.as_ref().map(|order| order.status);
        let Some(current) = current else {
            return Err(WorkflowError::NoOrderLoaded);
        };
        if inner.updating() || inner.delete == DeleteState::ConfirmingDelete {
            return Err(WorkflowError::Busy);
        }

        let requirement = inner.gate.select(current, target)?;
        debug!(
            event_name = "order.workflow.transition_requested",
            from = %current,
            to = %target,
            requirement = ?requirement,
            "status change requested"
        );
        Ok(requirement)
    }

    /// Confirms the pending transition with the collected side data and sends
    /// it. Validation and network failures are notified here; the returned
    /// error only informs the caller.
    pub async fn confirm(&self, side_data: SideData) -> Result<MutationOutcome, WorkflowError> {
        let (generation, order_id, previous, update) = {
            let mut inner = self.lock();
            let Some((order_id, previous)) =
                inner.order.as_ref().map(|order| (order.id.clone(), order.status))
            else {
                return Ok(MutationOutcome::Skipped(SkipReason::NoOrderLoaded));
            };
            if inner.delete == DeleteState::Deleting {
                return Ok(MutationOutcome::Skipped(SkipReason::UpdateInFlight));
            }

            match inner.gate.begin(side_data) {
                Ok(update) => (inner.generation, order_id, previous, update),
                Err(GateError::MutationInFlight) => {
                    return Ok(MutationOutcome::Skipped(SkipReason::UpdateInFlight));
                }
                Err(GateError::NoPendingTransition) => {
                    return Ok(MutationOutcome::Skipped(SkipReason::NoPendingTransition));
                }
                Err(GateError::Validation(error)) => {
                    let target = inner.gate.state().pending().map(|pending| pending.target);
                    drop(inner);
                    let mut event = AuditEvent::new(
                        Some(order_id),
                        &self.audit_context,
                        "order.status_update_rejected",
                        AuditCategory::Transition,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason", error.to_string());
                    if let Some(target) = target {
                        event = event.with_metadata("to", target.as_str());
                    }
                    self.emit(event);
                    self.notifier.notify(&error.to_string(), Severity::Error);
                    return Err(error.into());
                }
                Err(other) => return Err(other.into()),
            }
        };

        info!(
            event_name = "order.workflow.status_update_started",
            order_id = %order_id,
            from = %previous,
            to = %update.status,
            "submitting status change"
        );
        let result = self.api.update_order_status(&order_id, &update).await;

        match result {
            Ok(order) => {
                let applied = {
                    let mut inner = self.lock();
                    if inner.is_current(generation) {
                        let _ = inner.gate.complete();
                        inner.order = Some(order.clone());
                        true
                    } else {
                        false
                    }
                };

                // The server changed either way, so the list is stale even if
                // this instance was abandoned.
                self.cache.invalidate_order_collection().await;
                self.emit(
                    AuditEvent::new(
                        Some(order_id.clone()),
                        &self.audit_context,
                        "order.status_updated",
                        AuditCategory::Transition,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", previous.as_str())
                    .with_metadata("to", order.status.as_str()),
                );

                if !applied {
                    return Ok(MutationOutcome::Skipped(SkipReason::Abandoned));
                }
                info!(
                    event_name = "order.workflow.status_updated",
                    order_id = %order_id,
                    status = %order.status,
                    "order status updated"
                );
                self.notifier.notify(STATUS_UPDATED_MESSAGE, Severity::Success);
                Ok(MutationOutcome::Applied(order))
            }
            Err(error) => {
                let failure = WorkflowError::from_api(&error, GENERIC_UPDATE_FAILURE);
                let message = failure.user_message();
                let current = {
                    let mut inner = self.lock();
                    let current = inner.is_current(generation);
                    if current {
                        let _ = inner.gate.fail(message.clone());
                    }
                    current
                };

                warn!(
                    event_name = "order.workflow.status_update_failed",
                    order_id = %order_id,
                    error = %error,
                    "status change failed"
                );
                self.emit(
                    AuditEvent::new(
                        Some(order_id),
                        &self.audit_context,
                        "order.status_update_failed",
                        AuditCategory::Transition,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("to", update.status.as_str())
                    .with_metadata("error", error.to_string()),
                );
                if current {
                    self.notifier.notify(&message, Severity::Error);
                }
                Err(failure)
            }
        }
    }

    /// Drops the pending transition unless it is being submitted.
    pub fn cancel(&self) -> bool {
        matches!(self.lock().gate.cancel(), Ok(Some(_)))
    }

    pub fn request_delete(&self) -> Result<(), WorkflowError> {
        let mut inner = self.lock();
        if inner.order.is_none() {
            return Err(WorkflowError::NoOrderLoaded);
        }
        if inner.updating() || inner.gate.state().pending().is_some() {
            return Err(WorkflowError::Busy);
        }
        inner.delete = DeleteState::ConfirmingDelete;
        Ok(())
    }

    pub fn cancel_delete(&self) -> bool {
        let mut inner = self.lock();
        if inner.delete == DeleteState::ConfirmingDelete {
            inner.delete = DeleteState::Idle;
            return true;
        }
        false
    }

    pub async fn confirm_delete(&self) -> Result<DeleteOutcome, WorkflowError> {
        let (generation, order_id) = {
            let mut inner = self.lock();
            let Some(order_id) = inner.order.as_ref().map(|order| order.id.clone()) else {
                return Ok(DeleteOutcome::Skipped(SkipReason::NoOrderLoaded));
            };
            if inner.updating() {
                return Ok(DeleteOutcome::Skipped(SkipReason::UpdateInFlight));
            }
            if inner.delete != DeleteState::ConfirmingDelete {
                return Ok(DeleteOutcome::Skipped(SkipReason::NoPendingDeletion));
            }
            inner.delete = DeleteState::Deleting;
            (inner.generation, order_id)
        };

        info!(event_name = "order.workflow.delete_started", order_id = %order_id, "deleting order");
        let result = self.api.delete_order(&order_id).await;

        match result {
            Ok(()) => {
                let current = {
                    let mut inner = self.lock();
                    let current = inner.is_current(generation);
                    if current {
                        inner.delete = DeleteState::Removed;
                        inner.order = None;
                    }
                    current
                };

                self.cache.invalidate_order_collection().await;
                self.emit(AuditEvent::new(
                    Some(order_id.clone()),
                    &self.audit_context,
                    "order.deleted",
                    AuditCategory::Deletion,
                    AuditOutcome::Success,
                ));

                if !current {
                    return Ok(DeleteOutcome::Skipped(SkipReason::Abandoned));
                }
                info!(event_name = "order.workflow.deleted", order_id = %order_id, "order deleted");
                self.notifier.notify(ORDER_DELETED_MESSAGE, Severity::Success);
                self.navigator.navigate(ORDER_COLLECTION_PATH);
                Ok(DeleteOutcome::Deleted)
            }
            Err(error) => {
                let failure = WorkflowError::from_api(&error, GENERIC_DELETE_FAILURE);
                let current = {
                    let mut inner = self.lock();
                    let current = inner.is_current(generation);
                    if current {
                        inner.delete = DeleteState::Idle;
                    }
                    current
                };

                warn!(
                    event_name = "order.workflow.delete_failed",
                    order_id = %order_id,
                    error = %error,
                    "order deletion failed"
                );
                self.emit(
                    AuditEvent::new(
                        Some(order_id),
                        &self.audit_context,
                        "order.delete_failed",
                        AuditCategory::Deletion,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                if current {
                    self.notifier.notify(&failure.user_message(), Severity::Error);
                }
                Err(failure)
            }
        }
    }

    fn emit(&self, event: AuditEvent) {
        self.audit.emit(event);
    }
}
