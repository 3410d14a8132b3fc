pub mod controller;
pub mod gate;
pub mod selector;
pub mod states;

pub use controller::{
    DeleteOutcome, LoadOutcome, MutationOutcome, OrderWorkflow, SkipReason,
    WorkflowCollaborators, ORDER_COLLECTION_PATH,
};
pub use gate::{ConfirmationGate, GateError};
pub use selector::{classify, TransitionRequirement};
pub use states::{
    DeleteState, DialogKind, DialogVisibility, PendingTransition, SideData, WorkflowSnapshot,
    WorkflowState,
};
