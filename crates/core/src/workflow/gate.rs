use std::mem;

use thiserror::Error;

use crate::domain::order::{OrderStatus, StatusUpdate};
use crate::errors::ValidationError;
use crate::workflow::selector::{classify, TransitionRequirement};
use crate::workflow::states::{PendingTransition, SideData, WorkflowState};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("no status change is awaiting confirmation")]
    NoPendingTransition,
    #[error("a status change is already being submitted")]
    MutationInFlight,
    #[error("no status change is being submitted")]
    NotMutating,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Holds at most one pending transition and serializes its confirmation with
/// the network mutation. Pure state, no I/O.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfirmationGate {
    state: WorkflowState,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_mutating(&self) -> bool {
        self.state.is_mutating()
    }

    pub fn select(
        &mut self,
        current: OrderStatus,
        target: OrderStatus,
    ) -> Result<TransitionRequirement, GateError> {
        if self.state.is_mutating() {
            return Err(GateError::MutationInFlight);
        }

        let requirement = classify(current, target);
        if requirement == TransitionRequirement::Ignore {
            return Ok(requirement);
        }

        let mut pending = PendingTransition::new(target, requirement);
        if target == OrderStatus::Rejected {
            pending.side_data.rejection_reason = self
                .state
                .pending()
                .filter(|previous| previous.target == OrderStatus::Rejected)
                .and_then(|previous| previous.side_data.rejection_reason.clone());
        }

        self.state = WorkflowState::AwaitingConfirmation(pending);
        Ok(requirement)
    }

    /// Validates side data and moves to `Mutating`, returning the request to
    /// send. Validation failures keep whatever the user typed.
    pub fn begin(&mut self, side_data: SideData) -> Result<StatusUpdate, GateError> {
        let pending = match &mut self.state {
            WorkflowState::Idle => return Err(GateError::NoPendingTransition),
            WorkflowState::Mutating(_) => return Err(GateError::MutationInFlight),
            WorkflowState::AwaitingConfirmation(pending) => pending,
        };

        let mut update = StatusUpdate::new(pending.target);
        match pending.requirement {
            TransitionRequirement::RequireReason => {
                let typed = side_data
                    .rejection_reason
                    .or_else(|| pending.side_data.rejection_reason.clone())
                    .unwrap_or_default();
                let trimmed = typed.trim().to_owned();
                if trimmed.is_empty() {
                    let error = ValidationError::MissingRejectionReason;
                    pending.side_data.rejection_reason = Some(typed);
                    pending.last_error = Some(error.to_string());
                    return Err(error.into());
                }
                pending.side_data.rejection_reason = Some(trimmed.clone());
                update.rejection_reason = Some(trimmed);
            }
            TransitionRequirement::RequireTimeSlot => {
                let Some(slot) =
                    side_data.delivery_time_slot.or(pending.side_data.delivery_time_slot)
                else {
                    let error = ValidationError::MissingDeliveryTimeSlot;
                    pending.last_error = Some(error.to_string());
                    return Err(error.into());
                };
                pending.side_data.delivery_time_slot = Some(slot);
                update.delivery_time_slot = Some(slot);
            }
            TransitionRequirement::RequireSimpleConfirm | TransitionRequirement::Ignore => {}
        }

        pending.last_error = None;
        let pending = mem::take(&mut self.state);
        if let WorkflowState::AwaitingConfirmation(pending) = pending {
            self.state = WorkflowState::Mutating(pending);
        }
        Ok(update)
    }

    pub fn complete(&mut self) -> Result<PendingTransition, GateError> {
        match mem::take(&mut self.state) {
            WorkflowState::Mutating(pending) => Ok(pending),
            other => {
                self.state = other;
                Err(GateError::NotMutating)
            }
        }
    }

    /// Falls back to `AwaitingConfirmation` with the side data intact.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), GateError> {
        match mem::take(&mut self.state) {
            WorkflowState::Mutating(mut pending) => {
                pending.last_error = Some(message.into());
                self.state = WorkflowState::AwaitingConfirmation(pending);
                Ok(())
            }
            other => {
                self.state = other;
                Err(GateError::NotMutating)
            }
        }
    }

    pub fn cancel(&mut self) -> Result<Option<PendingTransition>, GateError> {
        match mem::take(&mut self.state) {
            WorkflowState::Idle => Ok(None),
            WorkflowState::AwaitingConfirmation(pending) => Ok(Some(pending)),
            mutating @ WorkflowState::Mutating(_) => {
                self.state = mutating;
                Err(GateError::MutationInFlight)
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = WorkflowState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::order::{DeliveryTimeSlot, OrderStatus};
    use crate::errors::ValidationError;
    use crate::workflow::selector::TransitionRequirement;
    use crate::workflow::states::{SideData, WorkflowState};

    use super::{ConfirmationGate, GateError};

    #[test]
    fn ignored_selection_leaves_gate_idle() {
        let mut gate = ConfirmationGate::new();
        let requirement =
            gate.select(OrderStatus::New, OrderStatus::New).expect("select should not fail");

        assert_eq!(requirement, TransitionRequirement::Ignore);
        assert_eq!(gate.state(), &WorkflowState::Idle);
    }

    #[test]
    fn accept_happy_path_reaches_idle() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::New, OrderStatus::Accepted).expect("select accepted");

        let update = gate
            .begin(SideData::time_slot(DeliveryTimeSlot::From14To15))
            .expect("slot supplied");
        assert_eq!(update.status, OrderStatus::Accepted);
        assert_eq!(update.delivery_time_slot, Some(DeliveryTimeSlot::From14To15));
        assert!(update.rejection_reason.is_none());
        assert!(gate.is_mutating());

        let pending = gate.complete().expect("complete mutating");
        assert_eq!(pending.target, OrderStatus::Accepted);
        assert_eq!(gate.state(), &WorkflowState::Idle);
    }

    #[test]
    fn blank_reason_is_rejected_locally() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::New, OrderStatus::Rejected).expect("select rejected");

        let error = gate.begin(SideData::reason("   ")).expect_err("blank reason must fail");
        assert_eq!(error, GateError::Validation(ValidationError::MissingRejectionReason));

        let WorkflowState::AwaitingConfirmation(pending) = gate.state() else {
            panic!("gate should still await confirmation");
        };
        assert_eq!(pending.last_error.as_deref(), Some("Rejection reason is required"));
    }

    #[test]
    fn missing_slot_is_rejected_locally() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::Accepted, OrderStatus::Accepted).expect("re-accept");

        let error = gate.begin(SideData::none()).expect_err("slot is required");
        assert_eq!(error, GateError::Validation(ValidationError::MissingDeliveryTimeSlot));
        assert!(!gate.is_mutating());
    }

    #[test]
    fn reason_is_trimmed_and_survives_failure() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::New, OrderStatus::Rejected).expect("select rejected");

        let update = gate.begin(SideData::reason("  too far ")).expect("reason supplied");
        assert_eq!(update.rejection_reason.as_deref(), Some("too far"));

        gate.fail("Gateway timeout").expect("fail while mutating");
        let WorkflowState::AwaitingConfirmation(pending) = gate.state() else {
            panic!("gate should fall back to awaiting confirmation");
        };
        assert_eq!(pending.side_data.rejection_reason.as_deref(), Some("too far"));
        assert_eq!(pending.last_error.as_deref(), Some("Gateway timeout"));

        let retry = gate.begin(SideData::none()).expect("saved reason is reused");
        assert_eq!(retry.rejection_reason.as_deref(), Some("too far"));
    }

    #[test]
    fn nothing_is_accepted_while_mutating() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::Accepted, OrderStatus::New).expect("select new");
        gate.begin(SideData::none()).expect("simple confirm");

        assert_eq!(gate.begin(SideData::none()), Err(GateError::MutationInFlight));
        assert_eq!(
            gate.select(OrderStatus::Accepted, OrderStatus::Rejected),
            Err(GateError::MutationInFlight)
        );
        assert_eq!(gate.cancel(), Err(GateError::MutationInFlight));
        assert!(gate.is_mutating());
    }

    #[test]
    fn switching_target_clears_typed_reason() {
        let mut gate = ConfirmationGate::new();
        gate.select(OrderStatus::New, OrderStatus::Rejected).expect("select rejected");
        let _ = gate.begin(SideData::reason(" "));

        gate.select(OrderStatus::New, OrderStatus::Accepted).expect("switch to accepted");
        let pending = gate.state().pending().expect("pending transition");
        assert!(pending.side_data.rejection_reason.is_none());
        assert_eq!(pending.requirement, TransitionRequirement::RequireTimeSlot);
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut gate = ConfirmationGate::new();
        assert_eq!(gate.cancel(), Ok(None));

        gate.select(OrderStatus::Rejected, OrderStatus::New).expect("select new");
        let cancelled = gate.cancel().expect("cancel awaiting");
        assert_eq!(cancelled.map(|pending| pending.target), Some(OrderStatus::New));
        assert_eq!(gate.state(), &WorkflowState::Idle);
        assert_eq!(gate.begin(SideData::none()), Err(GateError::NoPendingTransition));
    }

    #[test]
    fn complete_and_fail_require_mutation() {
        let mut gate = ConfirmationGate::new();
        assert_eq!(gate.complete(), Err(GateError::NotMutating));
        assert_eq!(gate.fail("boom"), Err(GateError::NotMutating));
    }
}
