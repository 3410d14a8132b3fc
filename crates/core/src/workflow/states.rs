use serde::{Deserialize, Serialize};

use crate::domain::order::{DeliveryTimeSlot, Order, OrderStatus};
use crate::workflow::selector::TransitionRequirement;

/// Input collected by a confirmation dialog.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideData {
    pub rejection_reason: Option<String>,
    pub delivery_time_slot: Option<DeliveryTimeSlot>,
}

impl SideData {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self { rejection_reason: Some(reason.into()), delivery_time_slot: None }
    }

    pub fn time_slot(slot: DeliveryTimeSlot) -> Self {
        Self { rejection_reason: None, delivery_time_slot: Some(slot) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransition {
    pub target: OrderStatus,
    pub requirement: TransitionRequirement,
    pub side_data: SideData,
    pub last_error: Option<String>,
}

impl PendingTransition {
    pub fn new(target: OrderStatus, requirement: TransitionRequirement) -> Self {
        Self { target, requirement, side_data: SideData::default(), last_error: None }
    }

    pub fn dialog(&self) -> DialogKind {
        match self.requirement {
            TransitionRequirement::RequireTimeSlot => DialogKind::DeliveryTime,
            _ => DialogKind::StatusConfirm,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingConfirmation(PendingTransition),
    Mutating(PendingTransition),
}

impl WorkflowState {
    pub fn pending(&self) -> Option<&PendingTransition> {
        match self {
            Self::Idle => None,
            Self::AwaitingConfirmation(pending) | Self::Mutating(pending) => Some(pending),
        }
    }

    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::Mutating(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogKind {
    StatusConfirm,
    DeliveryTime,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteState {
    #[default]
    Idle,
    ConfirmingDelete,
    Deleting,
    Removed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogVisibility {
    pub status: bool,
    pub delivery_time: bool,
    pub delete: bool,
}

impl DialogVisibility {
    pub fn derive(state: &WorkflowState, delete: DeleteState) -> Self {
        let open = state.pending().map(PendingTransition::dialog);
        Self {
            status: open == Some(DialogKind::StatusConfirm),
            delivery_time: open == Some(DialogKind::DeliveryTime),
            delete: delete == DeleteState::ConfirmingDelete,
        }
    }

    pub fn any_open(&self) -> bool {
        self.status || self.delivery_time || self.delete
    }
}

/// Everything the surrounding view needs to render the detail page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub order: Option<Order>,
    pub loading: bool,
    pub updating: bool,
    pub state: WorkflowState,
    pub delete_state: DeleteState,
    pub dialogs: DialogVisibility,
}
