use thiserror::Error;

use crate::domain::order::OrderId;
use crate::workflow::gate::GateError;

pub const GENERIC_LOAD_FAILURE: &str = "Failed to load order";
pub const GENERIC_UPDATE_FAILURE: &str = "Failed to update order status";
pub const GENERIC_DELETE_FAILURE: &str = "Failed to delete order";

/// Input problems caught before anything reaches the network.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Rejection reason is required")]
    MissingRejectionReason,
    #[error("Delivery time slot is required")]
    MissingDeliveryTimeSlot,
    #[error("unknown order status `{0}` (expected new|accepted|rejected)")]
    UnknownStatus(String),
    #[error("unknown delivery time slot `{0}`")]
    UnknownDeliveryTimeSlot(String),
}

/// Failures reported by the remote order API.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrderApiError {
    #[error("order `{0}` was not found")]
    NotFound(OrderId),
    #[error("request rejected with status {status_code}: {message}")]
    Rejected { status_code: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl OrderApiError {
    /// Message supplied by the server, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("order `{0}` could not be loaded")]
    NotFound(OrderId),
    #[error("{message}")]
    Network { message: String },
    #[error("no order is loaded")]
    NoOrderLoaded,
    #[error("another order update is in progress")]
    Busy,
    #[error(transparent)]
    Gate(#[from] GateError),
}

impl WorkflowError {
    /// Maps a mutation failure into the user-visible form, preferring the
    /// server's own wording over `fallback`.
    pub fn from_api(error: &OrderApiError, fallback: &str) -> Self {
        Self::Network { message: error.server_message().unwrap_or(fallback).to_owned() }
    }

    pub fn from_load(error: &OrderApiError) -> Self {
        match error {
            OrderApiError::NotFound(id) => Self::NotFound(id.clone()),
            other => Self::from_api(other, GENERIC_LOAD_FAILURE),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(error) => error.to_string(),
            Self::NotFound(_) => GENERIC_LOAD_FAILURE.to_owned(),
            Self::Network { message } => message.clone(),
            Self::NoOrderLoaded => "The order is not loaded yet.".to_owned(),
            Self::Busy => "Please wait for the current update to finish.".to_owned(),
            Self::Gate(error) => error.to_string(),
        }
    }
}
