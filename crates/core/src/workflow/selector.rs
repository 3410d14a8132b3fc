use serde::{Deserialize, Serialize};

use crate::domain::order::OrderStatus;

/// What the confirmation step must collect before a status change may be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionRequirement {
    Ignore,
    RequireTimeSlot,
    RequireReason,
    RequireSimpleConfirm,
}

/// Side data requirements follow the target status. Re-selecting `accepted`
/// is the one same-status request that still opens a confirmation, so the
/// delivery slot can be changed.
pub fn classify(current: OrderStatus, requested: OrderStatus) -> TransitionRequirement {
    match (current, requested) {
        (_, OrderStatus::Accepted) => TransitionRequirement::RequireTimeSlot,
        (current, requested) if current == requested => TransitionRequirement::Ignore,
        (_, OrderStatus::Rejected) => TransitionRequirement::RequireReason,
        _ => TransitionRequirement::RequireSimpleConfirm,
    }
}
